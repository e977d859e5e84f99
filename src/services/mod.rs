pub mod acquisition;
pub mod camera;
pub mod dashboard;
pub mod gemini;
pub mod report;
pub mod storage;
pub mod workflow;
