//! Garment return audit service
//!
//! Drives a warehouse operator through a four-step return audit: capture
//! the shipping label, capture evidence of the returned garment, let a
//! Gemini model compare the two, then render and upload a PDF report.
//! A read-only dashboard lists past audits.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod test_support;
