//! Continuations onto the controlling thread.
//!
//! Workers never call back into controller-owned state directly. They send a
//! closure through a [`ControllerHandle`], and the controlling thread runs
//! everything queued when it pumps the [`ControllerQueue`], typically once
//! per frame.

use tokio::sync::mpsc;
use tracing::warn;

/// Work to run on the controlling thread with exclusive access to `C`
pub type ControllerTask<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Receiving end, owned by the controlling thread
pub struct ControllerQueue<C> {
    tx: mpsc::UnboundedSender<ControllerTask<C>>,
    rx: mpsc::UnboundedReceiver<ControllerTask<C>>,
}

/// Sending end, cloned into workers
pub struct ControllerHandle<C> {
    tx: mpsc::UnboundedSender<ControllerTask<C>>,
}

impl<C> Clone for ControllerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> ControllerHandle<C> {
    /// Queue a continuation. Returns false if the controller is gone.
    pub fn enqueue(&self, task: impl FnOnce(&mut C) + Send + 'static) -> bool {
        if self.tx.send(Box::new(task)).is_err() {
            warn!("Controller queue closed, continuation dropped");
            return false;
        }
        true
    }
}

impl<C> Default for ControllerQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ControllerQueue<C> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> ControllerHandle<C> {
        ControllerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Remove every queued continuation without running it.
    ///
    /// For owners that hold the queue inside `C` itself and cannot lend
    /// `&mut C` while the queue is borrowed.
    pub fn take_pending(&mut self) -> Vec<ControllerTask<C>> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    /// Block until at least one continuation arrives, then take all queued.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait_pending(&mut self) -> Vec<ControllerTask<C>> {
        let mut tasks: Vec<ControllerTask<C>> = self.rx.blocking_recv().into_iter().collect();
        tasks.extend(self.take_pending());
        tasks
    }

    /// Run every queued continuation against `context`, in arrival order
    pub fn pump(&mut self, context: &mut C) -> usize {
        let tasks = self.take_pending();
        let count = tasks.len();
        for task in tasks {
            task(context);
        }
        count
    }
}
