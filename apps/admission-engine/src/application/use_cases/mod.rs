//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod evaluate_signal;
mod resume_admission;

pub use evaluate_signal::{AdmissionDecision, AdmissionError, AdmissionOrchestrator, AdmissionPolicy};
pub use resume_admission::{OrderFlowManager, ResumePolicy};
