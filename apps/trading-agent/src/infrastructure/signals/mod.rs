//! Strategy signal files.
//!
//! - [`read_signal_file`]: decode one binary signal file
//! - [`FilePattern`]: locate the newest file matching `dir/*.bin`-style patterns
//! - [`FileSignalSource`]: the [`SignalSource`](crate::application::ports::SignalSource)
//!   the decision engine reads from

mod locator;
mod reader;
mod source;

pub use locator::{FilePattern, find_latest_signal_file};
pub use reader::{decode_signals, read_signal_file};
pub use source::FileSignalSource;
