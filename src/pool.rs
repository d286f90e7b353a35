// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed-size worker pool.
//!
//! A [`WorkerPool`] owns a set of named OS threads fed from one unbounded
//! [`crossbeam`] channel. Every submitted task gets a [`TaskHandle`] the
//! caller may join or simply drop; dropping a handle never cancels the task.
//!
//! # Lifecycle
//!
//! ```text
//!  accepting ──shutdown()──► draining ──queue empty──► terminated
//!      │                         │
//!      └──────shutdown_now()─────┴──► queued tasks discarded
//! ```
//!
//! [`WorkerPool::drain`] combines the two: stop accepting, wait up to a
//! timeout, then discard whatever is still queued. Tasks already running are
//! never interrupted by the pool; they observe cancellation through their own
//! tokens.

use crate::error::PoolError;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// Identity of the pool owning the current thread, 0 outside any pool.
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Outcome of a bounded wait on a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every queued and running task finished.
    Drained,
    /// The timeout elapsed; `discarded` queued tasks were dropped unrun.
    TimedOut { discarded: usize },
}

impl Completion {
    pub fn is_drained(&self) -> bool {
        matches!(self, Completion::Drained)
    }
}

struct State {
    /// `None` once the pool stops accepting tasks.
    sender: Option<Sender<Job>>,
    queued: usize,
    running: usize,
}

impl State {
    fn outstanding(&self) -> usize {
        self.queued + self.running
    }
}

struct Shared {
    name: String,
    state: Mutex<State>,
    idle: Condvar,
    receiver: Receiver<Job>,
}

impl Shared {
    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn start_job(&self) {
        let mut state = self.state.lock();
        state.queued -= 1;
        state.running += 1;
    }

    fn finish_job(&self) {
        let mut state = self.state.lock();
        state.running -= 1;
        if state.outstanding() == 0 {
            self.idle.notify_all();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    CURRENT_POOL.with(|current| current.set(shared.id()));
    let receiver = shared.receiver.clone();

    while let Ok(job) = receiver.recv() {
        shared.start_job();
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(pool = %shared.name, "task panicked");
        }
        shared.finish_job();
    }

    debug!(pool = %shared.name, "worker exiting");
}

/// Bounded pool of worker threads.
pub struct WorkerPool {
    shared: Arc<Shared>,
    size: usize,
}

impl WorkerPool {
    /// Starts `size` worker threads named `{name}-{index}`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Spawn`] if `size` is zero or a thread cannot be started.
    pub fn new(name: impl Into<String>, size: usize) -> Result<Self, PoolError> {
        let name = name.into();
        if size == 0 {
            return Err(PoolError::Spawn(format!("pool `{name}` needs at least one worker")));
        }

        let (sender, receiver) = channel::unbounded();
        let shared = Arc::new(Shared {
            name,
            state: Mutex::new(State {
                sender: Some(sender),
                queued: 0,
                running: 0,
            }),
            idle: Condvar::new(),
            receiver,
        });

        for index in 0..size {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", shared.name, index))
                .spawn(move || worker_loop(worker_shared));
            if let Err(e) = spawned {
                // Let the workers that did start exit.
                shared.state.lock().sender.take();
                return Err(PoolError::Spawn(e.to_string()));
            }
        }

        debug!(pool = %shared.name, size, "worker pool started");
        Ok(Self { shared, size })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks queued or running.
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().sender.is_none()
    }

    /// Whether the calling thread is one of this pool's workers.
    pub fn is_current_thread_worker(&self) -> bool {
        CURRENT_POOL.with(|current| current.get()) == self.shared.id()
    }

    /// Queues a task.
    ///
    /// # Errors
    ///
    /// [`PoolError::ShutDown`] once the pool stopped accepting tasks.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = channel::bounded(1);
        let job: Job = Box::new(move || {
            // The caller may have dropped its handle.
            let _ = result_tx.send(task());
        });

        let mut state = self.shared.state.lock();
        let sender = state
            .sender
            .as_ref()
            .ok_or_else(|| PoolError::ShutDown(self.shared.name.clone()))?;
        sender
            .send(job)
            .map_err(|_| PoolError::ShutDown(self.shared.name.clone()))?;
        state.queued += 1;

        Ok(TaskHandle {
            receiver: result_rx,
        })
    }

    /// Stops accepting tasks. Queued tasks still run.
    pub fn shutdown(&self) {
        if self.shared.state.lock().sender.take().is_some() {
            debug!(pool = %self.shared.name, "worker pool shutting down");
        }
    }

    /// Stops accepting tasks and discards every queued task.
    ///
    /// Returns how many tasks were discarded. Their handles resolve to
    /// [`PoolError::TaskLost`].
    pub fn shutdown_now(&self) -> usize {
        let mut dropped = Vec::new();
        {
            let mut state = self.shared.state.lock();
            state.sender.take();
            loop {
                match self.shared.receiver.try_recv() {
                    Ok(job) => dropped.push(job),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            debug_assert!(state.queued >= dropped.len());
            state.queued -= dropped.len();
            if state.outstanding() == 0 {
                self.shared.idle.notify_all();
            }
        }
        // Dropped outside the lock: a task may own the last reference to
        // something that takes other locks when released.
        let discarded = dropped.len();
        drop(dropped);
        discarded
    }

    /// Blocks until no task is queued or running, or the timeout elapses.
    ///
    /// Returns `true` if the pool went idle.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while state.outstanding() > 0 {
                    if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                        return state.outstanding() == 0;
                    }
                }
            }
            None => {
                while state.outstanding() > 0 {
                    self.shared.idle.wait(&mut state);
                }
            }
        }
        true
    }

    /// Stops accepting tasks and waits for the pool to empty; on timeout
    /// discards what is still queued.
    pub fn drain(&self, timeout: Duration) -> Completion {
        self.shutdown();
        if self.await_termination(timeout) {
            return Completion::Drained;
        }

        let discarded = self.shutdown_now();
        warn!(
            pool = %self.shared.name,
            discarded,
            running = self.shared.state.lock().running,
            "pool did not drain in time"
        );
        Completion::TimedOut { discarded }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit once the queue is empty.
        self.shutdown();
    }
}

/// Result of a task submitted to a [`WorkerPool`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task produces its result.
    ///
    /// # Errors
    ///
    /// [`PoolError::TaskLost`] if the task was discarded or panicked.
    pub fn join(self) -> Result<T, PoolError> {
        self.receiver.recv().map_err(|_| PoolError::TaskLost)
    }

    /// Like [`join`](Self::join) but gives up after `timeout`, leaving the
    /// handle usable.
    pub fn join_timeout(&self, timeout: Duration) -> Result<T, PoolError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::TaskLost),
        }
    }

    /// Returns the result if the task already finished.
    pub fn try_join(&self) -> Option<Result<T, PoolError>> {
        match self.receiver.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::TaskLost)),
        }
    }
}
