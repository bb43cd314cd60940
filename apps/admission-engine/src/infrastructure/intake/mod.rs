//! Signal Intake
//!
//! Driver adapter feeding buy requests from the principal into admission.

mod signal_reader;

pub use signal_reader::{BuyRequest, IntakeError, IntakeStats, SignalIntake, parse_line};
