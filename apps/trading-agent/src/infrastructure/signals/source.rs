//! File-backed signal source.

use async_trait::async_trait;

use crate::application::ports::{SignalError, SignalSource};
use crate::domain::market::TradeSignal;

use super::locator::FilePattern;
use super::reader::read_signal_file;

/// Reads the newest signal file matching a pattern on every call.
///
/// The directory scan and file read run on the blocking pool.
#[derive(Debug, Clone)]
pub struct FileSignalSource {
    pattern: FilePattern,
}

impl FileSignalSource {
    /// Create a source for `pattern`, e.g. `./signals/*.bin`.
    ///
    /// # Errors
    ///
    /// [`SignalError::InvalidPattern`] if the pattern cannot be compiled.
    pub fn new(pattern: &str) -> Result<Self, SignalError> {
        Ok(Self {
            pattern: FilePattern::new(pattern)?,
        })
    }
}

fn load_newest(pattern: &FilePattern) -> Result<Vec<TradeSignal>, SignalError> {
    let Some(path) = pattern.newest()? else {
        tracing::info!("No signal file found, skipping entries");
        return Ok(Vec::new());
    };
    let signals = read_signal_file(&path)?;
    tracing::info!(path = %path.display(), count = signals.len(), "Signals loaded");
    Ok(signals)
}

#[async_trait]
impl SignalSource for FileSignalSource {
    async fn latest_signals(&self) -> Result<Vec<TradeSignal>, SignalError> {
        let pattern = self.pattern.clone();
        tokio::task::spawn_blocking(move || load_newest(&pattern))
            .await
            .map_err(|e| SignalError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::SignalAction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_newest_file() {
        let dir = TempDir::new().unwrap();
        let mut bytes = 7203u16.to_le_bytes().to_vec();
        bytes.push(1);
        std::fs::write(dir.path().join("signals.bin"), &bytes).unwrap();

        let source = FileSignalSource::new(&format!("{}/*.bin", dir.path().display())).unwrap();
        let signals = source.latest_signals().await.unwrap();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, SignalAction::Buy);
    }

    #[tokio::test]
    async fn no_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = FileSignalSource::new(&format!("{}/*.bin", dir.path().display())).unwrap();
        assert!(source.latest_signals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncated_file_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("signals.bin"), 7203u16.to_le_bytes()).unwrap();

        let source = FileSignalSource::new(&format!("{}/*.bin", dir.path().display())).unwrap();
        assert!(matches!(
            source.latest_signals().await,
            Err(SignalError::IncompleteRecord { .. })
        ));
    }
}
