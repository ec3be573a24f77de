//! Application Services
//!
//! Services coordinate domain logic and infrastructure adapters. The reconciler runs
//! per execution; the decision engine and tick loop run as a long-lived periodic task.

mod decision_engine;
mod reconciler;
mod tick_loop;

pub use decision_engine::{
    DecisionEngine, DecisionReport, ExitReason, StrategyParams, entry_quantity,
};
pub use reconciler::{ExecutionReconciler, ReconcileError, ReconcileOutcome};
pub use tick_loop::{ResyncReport, TickLoop, TickLoopConfig};
