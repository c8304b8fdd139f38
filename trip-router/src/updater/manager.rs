//! The single graph writer.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::graph::Graph;

use super::UpdateError;

/// A unit of work that mutates the graph. Runs once, on the writer thread,
/// with exclusive access.
pub trait GraphWriterRunnable: Send {
    fn run(self: Box<Self>, graph: &mut Graph) -> Result<(), UpdateError>;
}

impl<F> GraphWriterRunnable for F
where
    F: FnOnce(&mut Graph) -> Result<(), UpdateError> + Send,
{
    fn run(self: Box<Self>, graph: &mut Graph) -> Result<(), UpdateError> {
        (*self)(graph)
    }
}

/// A queued task that only needs to read the graph. It still runs on the
/// writer thread in submission order, but under the read lock, so searches
/// keep running alongside it. Real-time timetable changes take this path:
/// they write to the timetable buffer, which has its own lock.
pub trait SharedGraphRunnable: Send {
    fn run(self: Box<Self>, graph: &Graph) -> Result<(), UpdateError>;
}

impl<F> SharedGraphRunnable for F
where
    F: FnOnce(&Graph) -> Result<(), UpdateError> + Send,
{
    fn run(self: Box<Self>, graph: &Graph) -> Result<(), UpdateError> {
        (*self)(graph)
    }
}

enum Work {
    Exclusive(Box<dyn GraphWriterRunnable>),
    Shared(Box<dyn SharedGraphRunnable>),
}

impl Work {
    fn run(self, graph: &RwLock<Graph>) -> Result<(), UpdateError> {
        match self {
            Work::Exclusive(task) => task.run(&mut graph.write()),
            Work::Shared(task) => task.run(&graph.read()),
        }
    }
}

struct Task {
    work: Work,
    done: Option<oneshot::Sender<Result<(), UpdateError>>>,
}

enum Message {
    Run(Task),
    /// Run everything queued before this, then exit.
    Stop,
}

/// Submits tasks to the graph writer. Cheap to clone; tasks from every
/// clone run in the order they were submitted.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl WriterHandle {
    /// Queue `task` and return without waiting. A task that fails is
    /// logged by the writer.
    pub fn execute(&self, task: impl GraphWriterRunnable + 'static) -> Result<(), UpdateError> {
        self.submit(Work::Exclusive(Box::new(task)), None)
    }

    /// Queue `task` and block until it has run, returning its result.
    ///
    /// Blocks the calling thread, so it must not be called from async code.
    pub fn execute_blocking(
        &self,
        task: impl GraphWriterRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.submit_blocking(Work::Exclusive(Box::new(task)))
    }

    /// Like [`execute`](Self::execute), for a task that runs under the
    /// read lock.
    pub fn execute_shared(
        &self,
        task: impl SharedGraphRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.submit(Work::Shared(Box::new(task)), None)
    }

    /// Like [`execute_blocking`](Self::execute_blocking), for a task that
    /// runs under the read lock.
    pub fn execute_shared_blocking(
        &self,
        task: impl SharedGraphRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.submit_blocking(Work::Shared(Box::new(task)))
    }

    fn submit(
        &self,
        work: Work,
        done: Option<oneshot::Sender<Result<(), UpdateError>>>,
    ) -> Result<(), UpdateError> {
        self.tx
            .send(Message::Run(Task { work, done }))
            .map_err(|_| UpdateError::WriterStopped)
    }

    fn submit_blocking(&self, work: Work) -> Result<(), UpdateError> {
        let (done, wait) = oneshot::channel();
        self.submit(work, Some(done))?;
        wait.blocking_recv()
            .map_err(|_| UpdateError::WriterStopped)?
    }
}

/// Lets background updaters sleep between polls and wake promptly on
/// shutdown.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (stopped, wake) = &*self.inner;
        *stopped.lock() = true;
        wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for up to `timeout`. Returns true if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (stopped, wake) = &*self.inner;
        let mut stopped = stopped.lock();
        if !*stopped {
            let _ = wake.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

/// A background source of graph changes, run on its own thread.
pub trait GraphUpdater: Send {
    fn name(&self) -> &str;

    /// Called on the updater's thread before `run`. May use
    /// [`WriterHandle::execute_blocking`] to make sure initial data is in
    /// place.
    fn setup(&mut self, _writer: &WriterHandle) -> Result<(), UpdateError> {
        Ok(())
    }

    /// Poll for changes until `shutdown` fires.
    fn run(&mut self, writer: WriterHandle, shutdown: ShutdownSignal);
}

/// Owns the graph writer thread and the threads of the updaters feeding
/// it.
///
/// Every mutation of the graph goes through this writer, one task at a
/// time in submission order. Structural edits run under the graph's write
/// lock: such a task waits for running searches to finish and new searches
/// wait for the task. Shared tasks run under the read lock and never hold
/// up a search. A task that panics is contained and
/// reported; the writer carries on with the next one.
pub struct GraphUpdaterManager {
    handle: Option<WriterHandle>,
    writer: Option<JoinHandle<()>>,
    updaters: Vec<JoinHandle<()>>,
    shutdown: ShutdownSignal,
}

impl GraphUpdaterManager {
    pub fn new(graph: Arc<RwLock<Graph>>) -> Result<Self, UpdateError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = thread::Builder::new()
            .name("graph-writer".to_string())
            .spawn(move || writer_loop(graph, rx))?;
        Ok(Self {
            handle: Some(WriterHandle { tx }),
            writer: Some(writer),
            updaters: Vec::new(),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// A handle for submitting tasks.
    pub fn handle(&self) -> Result<WriterHandle, UpdateError> {
        self.handle.clone().ok_or(UpdateError::WriterStopped)
    }

    pub fn execute(&self, task: impl GraphWriterRunnable + 'static) -> Result<(), UpdateError> {
        self.handle()?.execute(task)
    }

    pub fn execute_blocking(
        &self,
        task: impl GraphWriterRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.handle()?.execute_blocking(task)
    }

    pub fn execute_shared(
        &self,
        task: impl SharedGraphRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.handle()?.execute_shared(task)
    }

    pub fn execute_shared_blocking(
        &self,
        task: impl SharedGraphRunnable + 'static,
    ) -> Result<(), UpdateError> {
        self.handle()?.execute_shared_blocking(task)
    }

    /// Start `updater` on a thread of its own.
    pub fn add_updater(&mut self, mut updater: Box<dyn GraphUpdater>) -> Result<(), UpdateError> {
        let writer = self.handle()?;
        let shutdown = self.shutdown.clone();
        let name = updater.name().to_string();
        let thread = thread::Builder::new()
            .name(format!("updater-{name}"))
            .spawn(move || {
                if let Err(e) = updater.setup(&writer) {
                    error!(updater = %name, error = %e, "updater setup failed");
                    return;
                }
                info!(updater = %name, "updater started");
                updater.run(writer, shutdown);
                info!(updater = %name, "updater stopped");
            })?;
        self.updaters.push(thread);
        Ok(())
    }

    pub fn updater_count(&self) -> usize {
        self.updaters.len()
    }

    /// Stop the updaters, let the writer drain its queue, and wait for
    /// every thread to finish.
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        for updater in self.updaters.drain(..) {
            if updater.join().is_err() {
                warn!("an updater thread panicked");
            }
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.tx.send(Message::Stop);
        }
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("graph writer thread panicked");
            }
        }
        debug!("graph updater manager stopped");
    }
}

impl Drop for GraphUpdaterManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn writer_loop(graph: Arc<RwLock<Graph>>, mut rx: mpsc::UnboundedReceiver<Message>) {
    debug!("graph writer started");
    while let Some(Message::Run(task)) = rx.blocking_recv() {
        let work = task.work;
        let result = panic::catch_unwind(AssertUnwindSafe(|| work.run(&graph)))
            .unwrap_or_else(|payload| Err(UpdateError::TaskPanicked(panic_message(&*payload))));
        match task.done {
            Some(done) => {
                let _ = done.send(result);
            }
            None => {
                if let Err(e) = result {
                    warn!(error = %e, "graph writer task failed");
                }
            }
        }
    }
    debug!("graph writer finished");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::Coordinate;
    use crate::graph::VertexKind;

    fn manager() -> (Arc<RwLock<Graph>>, GraphUpdaterManager) {
        let graph = Arc::new(RwLock::new(Graph::default()));
        let manager = GraphUpdaterManager::new(Arc::clone(&graph)).unwrap();
        (graph, manager)
    }

    fn add_vertex(label: String) -> impl FnOnce(&mut Graph) -> Result<(), UpdateError> + Send {
        move |g: &mut Graph| {
            g.add_vertex(label, Coordinate::new(0.0, 0.0).unwrap(), VertexKind::Intersection)?;
            Ok(())
        }
    }

    fn noop() -> impl FnOnce(&mut Graph) -> Result<(), UpdateError> + Send {
        |_| Ok(())
    }

    #[test]
    fn blocking_task_sees_its_result() {
        let (graph, manager) = manager();
        manager.execute_blocking(add_vertex("a".to_string())).unwrap();
        assert!(graph.read().vertex_by_label("a").is_some());

        let err = manager
            .execute_blocking(add_vertex("a".to_string()))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Graph(_)));
    }

    #[test]
    fn tasks_run_in_submission_order() {
        let (_, manager) = manager();
        let order = Arc::new(Mutex::new(Vec::new()));
        let handle = manager.handle().unwrap();
        let submitted = Arc::new(Mutex::new(Vec::new()));

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let handle = handle.clone();
                let order = Arc::clone(&order);
                let submitted = Arc::clone(&submitted);
                thread::spawn(move || {
                    for i in 0..25 {
                        let id = t * 100 + i;
                        let order = Arc::clone(&order);
                        // Submission order is fixed under the lock.
                        let mut log = submitted.lock();
                        handle
                            .execute(move |_: &mut Graph| -> Result<(), UpdateError> {
                                order.lock().push(id);
                                Ok(())
                            })
                            .unwrap();
                        log.push(id);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        manager.execute_blocking(noop()).unwrap();
        assert_eq!(*order.lock(), *submitted.lock());
        assert_eq!(order.lock().len(), 100);
    }

    #[test]
    fn panicking_task_is_contained() {
        let (graph, manager) = manager();
        let err = manager
            .execute_blocking(|_: &mut Graph| -> Result<(), UpdateError> { panic!("boom") })
            .unwrap_err();
        assert!(matches!(err, UpdateError::TaskPanicked(ref m) if m == "boom"));

        manager.execute_blocking(add_vertex("after".to_string())).unwrap();
        assert!(graph.read().vertex_by_label("after").is_some());
    }

    #[test]
    fn stopped_writer_rejects_tasks() {
        let (_, mut manager) = manager();
        let handle = manager.handle().unwrap();
        manager.stop();
        assert!(matches!(
            handle.execute(noop()),
            Err(UpdateError::WriterStopped)
        ));
        assert!(matches!(
            manager.execute(noop()),
            Err(UpdateError::WriterStopped)
        ));
    }

    #[test]
    fn shared_task_runs_beside_readers() {
        let (graph, manager) = manager();
        manager.execute_blocking(add_vertex("a".to_string())).unwrap();

        let search = graph.read();
        let (seen, wait) = std::sync::mpsc::channel();
        manager
            .execute_shared(move |g: &Graph| -> Result<(), UpdateError> {
                let _ = seen.send(g.vertex_by_label("a").is_some());
                Ok(())
            })
            .unwrap();
        assert_eq!(wait.recv_timeout(Duration::from_secs(2)), Ok(true));
        assert!(graph.try_read_for(Duration::from_millis(100)).is_some());
        drop(search);
    }

    #[test]
    fn shared_and_exclusive_tasks_keep_submission_order() {
        let (graph, manager) = manager();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let order = Arc::clone(&order);
            if i % 2 == 0 {
                manager
                    .execute(move |g: &mut Graph| -> Result<(), UpdateError> {
                        g.add_vertex(
                            format!("v{i}"),
                            Coordinate::new(0.0, 0.0).unwrap(),
                            VertexKind::Intersection,
                        )?;
                        order.lock().push(i);
                        Ok(())
                    })
                    .unwrap();
            } else {
                manager
                    .execute_shared(move |g: &Graph| -> Result<(), UpdateError> {
                        assert!(g.vertex_by_label(&format!("v{}", i - 1)).is_some());
                        order.lock().push(i);
                        Ok(())
                    })
                    .unwrap();
            }
        }
        manager
            .execute_shared_blocking(|_: &Graph| -> Result<(), UpdateError> { Ok(()) })
            .unwrap();
        assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
        assert_eq!(graph.read().vertices().count(), 5);
    }

    struct Counting {
        polls: Arc<AtomicUsize>,
    }

    impl GraphUpdater for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(&mut self, writer: WriterHandle, shutdown: ShutdownSignal) {
            loop {
                let polls = Arc::clone(&self.polls);
                let _ = writer.execute(move |_: &mut Graph| -> Result<(), UpdateError> {
                    polls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
                if shutdown.wait_timeout(Duration::from_millis(5)) {
                    break;
                }
            }
        }
    }

    #[test]
    fn updaters_stop_on_shutdown() {
        let (_, mut manager) = manager();
        let polls = Arc::new(AtomicUsize::new(0));
        manager
            .add_updater(Box::new(Counting {
                polls: Arc::clone(&polls),
            }))
            .unwrap();
        assert_eq!(manager.updater_count(), 1);
        thread::sleep(Duration::from_millis(30));
        manager.stop();
        assert!(polls.load(Ordering::SeqCst) >= 1);
        assert_eq!(manager.updater_count(), 0);
    }
}
