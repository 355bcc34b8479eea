//! Worker : file de tâches FIFO à thread unique

use crate::Result;
use crossbeam_channel::{unbounded, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single dedicated thread draining tasks in submission order
pub(crate) struct Worker {
    name: String,
    tx: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Worker {
    pub(crate) fn spawn(name: String) -> Result<Self> {
        let (tx, rx) = unbounded::<Task>();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            for task in rx.iter() {
                task();
            }
            tracing::debug!(
                worker = thread::current().name().unwrap_or_default(),
                "Worker drained"
            );
        })?;

        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Queues `task`; false once the worker is shut down
    pub(crate) fn execute<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match lock(&self.tx).as_ref() {
            Some(tx) => tx.send(Box::new(task)).is_ok(),
            None => false,
        }
    }

    pub(crate) fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Blocks until every task queued before this call has run
    pub(crate) fn flush(&self) {
        if self.is_worker_thread() {
            return;
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        if self.execute(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.recv();
        }
    }

    /// Stops accepting tasks, lets queued ones finish and joins the thread
    ///
    /// Returns false if the worker was already shut down.
    pub(crate) fn shutdown(&self) -> bool {
        let Some(tx) = lock(&self.tx).take() else {
            return false;
        };
        drop(tx);

        // Appelé depuis une tâche : le thread se termine seul
        if self.is_worker_thread() {
            return true;
        }

        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.name, "Worker thread panicked");
            }
        }
        true
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
