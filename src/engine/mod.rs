//! The disclosure-delay engine: transition planning, the state machine that
//! commits transitions, and the loop that keeps sessions converged.

pub mod machine;
pub mod reconcile;
pub mod transition;

pub use machine::{RevealStateMachine, Transition};
pub use reconcile::{ReconciliationLoop, VaultUpdate};
pub use transition::Action;
