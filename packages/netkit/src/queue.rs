//! Serial execution queues keyed by name.
//!
//! Every [`SerialQueue`] is backed by one drain task that runs its jobs one
//! at a time, in the order they were enqueued. Distinct queues run
//! concurrently on the tokio worker pool.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub(crate) type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A FIFO queue with a concurrency of exactly one.
#[derive(Clone)]
pub struct SerialQueue {
    name: Option<Arc<str>>,
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    pub(crate) fn spawn(name: Option<&str>, runtime: &Handle) -> Self {
        let name: Option<Arc<str>> = name.map(Arc::from);
        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(drain(name.clone(), runtime.clone(), receiver));
        Self { name, sender }
    }

    /// The queue key, or `None` for the default queue.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether both handles refer to the same queue.
    pub fn same_queue(&self, other: &SerialQueue) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Schedule `job` after everything already enqueued.
    ///
    /// Returns `false` if the queue's drain task is gone (runtime shut
    /// down); the job is dropped.
    pub(crate) fn enqueue(&self, job: Job) -> bool {
        self.sender.send(job).is_ok()
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .finish()
    }
}

async fn drain(
    name: Option<Arc<str>>,
    runtime: Handle,
    mut receiver: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = receiver.recv().await {
        // A job runs as its own task so a panic frees the slot without
        // taking the queue down with it.
        if let Err(error) = runtime.spawn(job).await {
            tracing::debug!(queue = ?name, %error, "queued job did not complete");
        }
    }
}

/// Per-session map from queue key to [`SerialQueue`].
///
/// Queues are created on first use and live as long as the registry.
pub struct QueueRegistry {
    runtime: Handle,
    default_queue: SerialQueue,
    queues: Mutex<HashMap<String, SerialQueue>>,
}

impl QueueRegistry {
    pub fn new(runtime: Handle) -> Self {
        let default_queue = SerialQueue::spawn(None, &runtime);
        Self {
            runtime,
            default_queue,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// The queue for `key`, creating it if needed. `None` maps to the
    /// shared default queue.
    pub fn queue_for(&self, key: Option<&str>) -> SerialQueue {
        let Some(key) = key else {
            return self.default_queue.clone();
        };

        // Lookup and creation happen under one lock so concurrent
        // submissions with the same new key share a single queue.
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = queues.get(key) {
            return queue.clone();
        }

        tracing::debug!(queue = key, "creating request queue");
        let queue = SerialQueue::spawn(Some(key), &self.runtime);
        queues.insert(key.to_string(), queue.clone());
        queue
    }

    /// Number of keyed queues created so far.
    pub fn len(&self) -> usize {
        self.queues.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}
