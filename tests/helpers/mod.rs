//! Test helper utilities: the service under test plus in-process stand-ins
//! for Gemini, the storage webhook and the dashboard backend.

#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::multipart;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use return_audit_hw::app_state::AppState;
use return_audit_hw::routes;
use return_audit_hw::services::{
    camera::SnapshotFileCamera,
    dashboard::DashboardClient,
    gemini::GeminiClient,
    storage::WebhookUploader,
    workflow::{WorkflowController, WorkflowDelays},
};

use crate::fixtures;

pub const EXTRACTION_MODEL: &str = "extract-model";
pub const VERIFICATION_MODEL: &str = "audit-model";
pub const API_KEY: &str = "test-key";

/// One request received by the fake Gemini endpoint.
#[derive(Debug, Clone)]
pub struct AiCall {
    pub model: String,
    pub api_key: Option<String>,
    pub body: Value,
}

/// Behaviour of the external services for one test.
#[derive(Clone)]
pub struct Upstreams {
    pub extraction: Value,
    /// `None` makes the verification call fail with 500.
    pub verdict: Option<Value>,
    pub verify_delay: Duration,
    pub webhook_status: StatusCode,
    pub dashboard_status: StatusCode,
    pub dashboard_payload: Value,
    /// Still file served as the camera; `None` leaves capture unconfigured.
    pub camera_still: Option<PathBuf>,
    pub import_dir: Option<PathBuf>,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            extraction: fixtures::extraction_json(true),
            verdict: Some(fixtures::verdict_json("OK")),
            verify_delay: Duration::ZERO,
            webhook_status: StatusCode::OK,
            dashboard_status: StatusCode::OK,
            dashboard_payload: fixtures::dashboard_records(),
            camera_still: None,
            import_dir: None,
        }
    }
}

#[derive(Clone)]
struct FakeState {
    upstreams: Upstreams,
    ai_calls: Arc<Mutex<Vec<AiCall>>>,
    uploads: Arc<Mutex<Vec<Value>>>,
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub ai_calls: Arc<Mutex<Vec<AiCall>>>,
    pub uploads: Arc<Mutex<Vec<Value>>>,
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

fn candidate(payload: &Value) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": payload.to_string() }] } }] })
}

async fn fake_generate(
    State(fake): State<FakeState>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let model = call.split(':').next().unwrap_or_default().to_string();
    fake.ai_calls.lock().unwrap().push(AiCall {
        model: model.clone(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if model == EXTRACTION_MODEL {
        return Json(candidate(&fake.upstreams.extraction)).into_response();
    }

    sleep(fake.upstreams.verify_delay).await;
    match &fake.upstreams.verdict {
        Some(verdict) => Json(candidate(verdict)).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response(),
    }
}

async fn fake_upload(State(fake): State<FakeState>, Json(body): Json<Value>) -> StatusCode {
    fake.uploads.lock().unwrap().push(body);
    fake.upstreams.webhook_status
}

async fn fake_records(State(fake): State<FakeState>) -> Response {
    (
        fake.upstreams.dashboard_status,
        Json(fake.upstreams.dashboard_payload.clone()),
    )
        .into_response()
}

/// Start the fakes and the service wired to them, with no workflow delays.
pub async fn spawn_app(upstreams: Upstreams) -> TestApp {
    let camera_still = upstreams.camera_still.clone();
    let import_dir = upstreams.import_dir.clone();
    let fake = FakeState {
        upstreams,
        ai_calls: Arc::new(Mutex::new(Vec::new())),
        uploads: Arc::new(Mutex::new(Vec::new())),
    };
    let ai_calls = fake.ai_calls.clone();
    let uploads = fake.uploads.clone();

    let fakes = serve(
        Router::new()
            .route("/v1beta/models/{call}", post(fake_generate))
            .route("/upload", post(fake_upload))
            .route("/records", get(fake_records))
            .layer(DefaultBodyLimit::disable())
            .with_state(fake),
    )
    .await;

    let ai = GeminiClient::new(
        format!("{fakes}/v1beta"),
        API_KEY,
        EXTRACTION_MODEL,
        VERIFICATION_MODEL,
        "English",
    );
    let workflow = WorkflowController::new(
        Arc::new(ai),
        Arc::new(WebhookUploader::new(format!("{fakes}/upload"))),
        WorkflowDelays {
            success: Duration::ZERO,
            failure: Duration::ZERO,
        },
    );
    let mut state = AppState::new(workflow, DashboardClient::new(format!("{fakes}/records")));
    if let Some(still) = camera_still {
        state = state.with_camera(Box::new(SnapshotFileCamera::new(still)));
    }
    if let Some(dir) = import_dir {
        state = state.with_import_dir(dir);
    }

    let prometheus = Arc::new(PrometheusBuilder::new().build_recorder().handle());
    let base_url = serve(routes::router(state, Some(prometheus), 2 * 1024 * 1024)).await;

    TestApp {
        base_url,
        client: reqwest::Client::new(),
        ai_calls,
        uploads,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a multipart body with one `image` field per entry.
    pub async fn upload(&self, path: &str, images: Vec<Vec<u8>>) -> reqwest::Response {
        let mut form = multipart::Form::new();
        for (i, bytes) in images.into_iter().enumerate() {
            form = form.part(
                "image",
                multipart::Part::bytes(bytes).file_name(format!("photo-{i}.bin")),
            );
        }
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("multipart upload")
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("post request")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("json post request")
    }

    pub async fn snapshot(&self) -> Value {
        self.client
            .get(self.url("/api/v1/audit"))
            .send()
            .await
            .expect("snapshot request")
            .json()
            .await
            .expect("snapshot body")
    }

    /// Poll the snapshot until the workflow reaches `step`.
    pub async fn wait_for_step(&self, step: &str) -> Value {
        for _ in 0..250 {
            let snapshot = self.snapshot().await;
            if snapshot["step"] == step {
                return snapshot;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!("workflow did not reach step {step}");
    }

    /// Capture and validate the label, advance, then add `evidence` photos.
    pub async fn ready_for_verification(&self, evidence: usize) -> Value {
        let response = self
            .upload("/api/v1/audit/reference", vec![fixtures::label_png()])
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = self.post("/api/v1/audit/advance").await;
        assert_eq!(response.status(), StatusCode::OK);

        if evidence == 0 {
            return self.snapshot().await;
        }

        let photos = (0..evidence)
            .map(|i| fixtures::garment_jpeg((i as u8).wrapping_mul(40)))
            .collect();
        let response = self.upload("/api/v1/audit/evidence", photos).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.expect("evidence body");
        body["snapshot"].clone()
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("return-audit-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
