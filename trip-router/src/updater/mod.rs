//! Graph mutation after startup.
//!
//! Every change to a live [`Graph`](crate::graph::Graph) runs as a task on
//! one writer thread owned by [`GraphUpdaterManager`]. Background
//! [`GraphUpdater`]s feed it from their own threads.

mod error;
mod manager;
mod polling;

pub use error::UpdateError;
pub use manager::{
    GraphUpdater, GraphUpdaterManager, GraphWriterRunnable, SharedGraphRunnable, ShutdownSignal,
    WriterHandle,
};
pub use polling::{
    JsonFileTripUpdateSource, PollingTripUpdater, TripUpdateSource, TripUpdateWriter,
};
