//! Periodic real-time trip updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::graph::Graph;
use crate::timetable::{TimetableSnapshotSource, TripUpdate};

use super::{GraphUpdater, SharedGraphRunnable, ShutdownSignal, UpdateError, WriterHandle};

/// Somewhere decoded trip updates come from.
pub trait TripUpdateSource: Send {
    /// Fetch the updates published since the last call, or the full
    /// current set if the source does not track that.
    fn fetch(&mut self) -> Result<Vec<TripUpdate>, UpdateError>;
}

impl<F> TripUpdateSource for F
where
    F: FnMut() -> Result<Vec<TripUpdate>, UpdateError> + Send,
{
    fn fetch(&mut self) -> Result<Vec<TripUpdate>, UpdateError> {
        self()
    }
}

/// Reads a JSON array of trip updates from a file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileTripUpdateSource {
    path: PathBuf,
}

impl JsonFileTripUpdateSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TripUpdateSource for JsonFileTripUpdateSource {
    fn fetch(&mut self) -> Result<Vec<TripUpdate>, UpdateError> {
        let content = std::fs::read_to_string(&self.path)?;
        let updates: Vec<TripUpdate> = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), count = updates.len(), "read trip updates");
        Ok(updates)
    }
}

/// Writer task applying one batch of trip updates to the real-time buffer.
/// Only reads the graph, so it runs beside searches.
pub struct TripUpdateWriter {
    updates: Vec<TripUpdate>,
    snapshots: Arc<TimetableSnapshotSource>,
}

impl TripUpdateWriter {
    pub fn new(updates: Vec<TripUpdate>, snapshots: Arc<TimetableSnapshotSource>) -> Self {
        Self { updates, snapshots }
    }
}

impl SharedGraphRunnable for TripUpdateWriter {
    fn run(self: Box<Self>, graph: &Graph) -> Result<(), UpdateError> {
        let report = self.snapshots.apply_trip_updates(graph, &self.updates);
        info!(
            applied = report.applied,
            skipped = report.skipped,
            "trip updates applied"
        );
        Ok(())
    }
}

/// Polls a [`TripUpdateSource`] and hands each batch to the graph writer.
pub struct PollingTripUpdater {
    name: String,
    source: Box<dyn TripUpdateSource>,
    snapshots: Arc<TimetableSnapshotSource>,
    interval: Duration,
}

impl PollingTripUpdater {
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn TripUpdateSource>,
        snapshots: Arc<TimetableSnapshotSource>,
        interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            snapshots,
            interval,
        }
    }

    fn poll(&mut self) -> Result<Option<TripUpdateWriter>, UpdateError> {
        let updates = self.source.fetch()?;
        if updates.is_empty() {
            return Ok(None);
        }
        Ok(Some(TripUpdateWriter::new(
            updates,
            Arc::clone(&self.snapshots),
        )))
    }
}

impl GraphUpdater for PollingTripUpdater {
    fn name(&self) -> &str {
        &self.name
    }

    /// Apply the first batch before returning, so the updater starts from
    /// current data. A source that cannot be read yet is not fatal.
    fn setup(&mut self, writer: &WriterHandle) -> Result<(), UpdateError> {
        match self.poll() {
            Ok(Some(task)) => writer.execute_shared_blocking(task),
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(updater = %self.name, error = %e, "initial trip update fetch failed");
                Ok(())
            }
        }
    }

    fn run(&mut self, writer: WriterHandle, shutdown: ShutdownSignal) {
        while !shutdown.wait_timeout(self.interval) {
            match self.poll() {
                Ok(Some(task)) => {
                    if writer.execute_shared(task).is_err() {
                        warn!(updater = %self.name, "graph writer gone; stopping");
                        return;
                    }
                }
                Ok(None) => debug!(updater = %self.name, "no trip updates"),
                Err(e) => warn!(updater = %self.name, error = %e, "trip update fetch failed"),
            }
        }
    }
}
