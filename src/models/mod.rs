pub mod dashboard;
pub mod image;
pub mod label;
pub mod report;
pub mod verification;
pub mod workflow;
