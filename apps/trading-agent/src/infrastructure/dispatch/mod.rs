//! Stream Event Dispatch
//!
//! - [`Dispatcher`]: one handler per [`EventKind`], registered at wiring time
//! - [`ExecutionHandler`], [`PriceHandler`], [`StatusHandler`]: the `EC`, `FD` and `ST`
//!   handlers
//! - [`Ingestion`]: the sequential parse-classify-dispatch loop over a stream

mod dispatcher;
mod handlers;
mod ingestion;

pub use dispatcher::{Dispatcher, EventHandler, EventKind, HandlerError};
pub use handlers::{ExecutionHandler, PriceHandler, StatusHandler, decode_execution};
pub use ingestion::{Ingestion, IngestionStats, MessageOutcome};
