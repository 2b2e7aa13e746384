//! Serial dispatch queue backed by a named worker thread.
//!
//! Jobs run strictly in submission order. `dispatch_after` schedules a job
//! for a later deadline without blocking the queue; timed jobs never run
//! before jobs already due.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    RunAt(Instant, Job),
    Shutdown,
}

struct TimedJob {
    deadline: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for TimedJob {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimedJob {}

impl PartialOrd for TimedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedJob {
    // Reversed so the BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A serial execution queue.
///
/// Cloning yields another handle to the same queue; the worker thread shuts
/// down when the last handle is dropped.
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<Inner>,
}

struct Inner {
    label: String,
    sender: Mutex<Option<mpsc::Sender<Message>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SerialQueue {
    /// Spawn the worker thread. The label doubles as the thread name.
    pub fn new(label: &str) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || worker_loop(rx))?;
        Ok(Self {
            inner: Arc::new(Inner {
                label: label.to_string(),
                sender: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Enqueue a job to run after all previously enqueued jobs.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        self.send(Message::Run(Box::new(job)));
    }

    /// Enqueue a job to run no earlier than `delay` from now.
    pub fn dispatch_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        self.send(Message::RunAt(Instant::now() + delay, Box::new(job)));
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Debug check that the caller is running on this queue's thread.
    pub fn assert_current(&self) {
        debug_assert_eq!(
            thread::current().name(),
            Some(self.inner.label.as_str()),
            "expected to run on queue '{}'",
            self.inner.label
        );
    }

    fn send(&self, message: Message) {
        let guard = self.inner.sender.lock();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(message).is_err() {
                    log::error!("queue '{}' worker is gone, dropping job", self.inner.label);
                }
            }
            None => log::error!("queue '{}' already shut down, dropping job", self.inner.label),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(tx) = self.sender.get_mut().take() {
            let _ = tx.send(Message::Shutdown);
        }
        if let Some(handle) = self.handle.get_mut().take() {
            // The last handle may be dropped from a job running on the
            // queue itself; joining there would deadlock.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn worker_loop(rx: mpsc::Receiver<Message>) {
    let mut timed: BinaryHeap<TimedJob> = BinaryHeap::new();
    let mut seq: u64 = 0;
    loop {
        run_due(&mut timed);
        let timeout = timed
            .peek()
            .map(|t| t.deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(60));
        match rx.recv_timeout(timeout) {
            Ok(Message::Run(job)) => job(),
            Ok(Message::RunAt(deadline, job)) => {
                seq += 1;
                timed.push(TimedJob { deadline, seq, job });
            }
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    run_due(&mut timed);
}

fn run_due(timed: &mut BinaryHeap<TimedJob>) {
    while timed
        .peek()
        .map(|t| t.deadline <= Instant::now())
        .unwrap_or(false)
    {
        if let Some(t) = timed.pop() {
            (t.job)();
        }
    }
}
