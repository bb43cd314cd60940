//! Dispatch Bounded Context
//!
//! Orders bound for the broker, the capital held against them while in
//! flight, and the step-down policy applied after margin rejections.

mod errors;
mod order;
mod recovery;
mod reservation;

pub use errors::DispatchError;
pub use order::{OrderKind, OrderOrigin, OrderSide, QueuedOrder};
pub use recovery::{RecoveryCounter, StepDownOutcome, StepDownPolicy};
pub use reservation::{FillProgress, InFlightReservation, ReservationBook};
