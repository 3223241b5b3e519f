//! ondemand-lifecycle — request-triggered lifecycle actions.
//!
//! [`Lifecycle`] is the composition root joining the instance controller
//! and the idle-stop policy:
//!
//! ```text
//! handle_start      → controller.start                       → StartResult
//! handle_idle_stop  → controller.describe → evaluate_idle_stop
//!                     → controller.stop (only when the decision is stop) → StopResult
//! status            → controller.describe                    → StatusResult
//! ```
//!
//! [`IdleStopScheduler`] drives `handle_idle_stop` on a fixed interval,
//! one evaluation at a time.

pub mod handlers;
pub mod scheduler;

pub use handlers::Lifecycle;
pub use scheduler::IdleStopScheduler;
