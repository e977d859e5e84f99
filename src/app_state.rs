use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::models::workflow::WorkflowSnapshot;
use crate::services::{
    camera::CameraDevice, dashboard::DashboardClient, workflow::WorkflowController,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Held for the whole verification pipeline; mutating handlers use
    /// `try_lock` and answer 409 while a run is in progress.
    pub workflow: Arc<Mutex<WorkflowController>>,
    pub snapshots: watch::Receiver<WorkflowSnapshot>,
    pub dashboard: Arc<DashboardClient>,
    /// Opened only from blocking tasks.
    pub camera: Option<Arc<std::sync::Mutex<Box<dyn CameraDevice>>>>,
    /// Directory that multi-file evidence imports read from.
    pub import_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(workflow: WorkflowController, dashboard: DashboardClient) -> Self {
        let snapshots = workflow.subscribe();
        Self {
            workflow: Arc::new(Mutex::new(workflow)),
            snapshots,
            dashboard: Arc::new(dashboard),
            camera: None,
            import_dir: None,
        }
    }

    pub fn with_camera(mut self, camera: Box<dyn CameraDevice>) -> Self {
        self.camera = Some(Arc::new(std::sync::Mutex::new(camera)));
        self
    }

    pub fn with_import_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.import_dir = Some(Arc::new(dir.into()));
        self
    }
}
