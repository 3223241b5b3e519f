//! ondemand-policy — the lifecycle decision procedure.
//!
//! Maps an observed [`InstanceState`](ondemand_core::InstanceState) to a
//! [`LifecycleDecision`](ondemand_core::LifecycleDecision). The evaluation is
//! pure: no I/O, no clock, no state carried between calls.
//!
//! # Idle-Stop Rule
//!
//! ```text
//! running                                    → stop,   resulting stopping
//! stopping | stopped                         → none,   unchanged (already converging)
//! pending | shutting-down | terminated | unknown → none, unchanged (no safe action)
//! ```
//!
//! The idle signal today is the run-state alone: a running instance is
//! considered idle. A real activity signal (connection count, last-seen
//! player) would be an additional input to [`evaluate_idle_stop`] that can
//! only turn a `stop` into `none`, never the reverse.

pub mod idle;

pub use idle::evaluate_idle_stop;
