//! The shared queue of modules waiting to be loaded.
//!
//! Besides moving [`ModuleDescriptor`]s between producers and loader workers,
//! the queue tracks how many enqueued modules have not been completed yet, and
//! lets a controller block until that count drops to zero (quiescence).
//!
//! Completion is tied to [`WorkItem`]: dropping an item marks it complete, so a
//! worker cannot forget to do so on any exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::trace;

use crate::module::ModuleDescriptor;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
  /// The queue no longer accepts work (the session finished or aborted).
  #[error("module queue is closed")]
  Closed,
}

/// A blocking multi-producer, multi-consumer queue with a pending-work count.
pub struct WorkQueue {
  sender: Sender<ModuleDescriptor>,
  receiver: Receiver<ModuleDescriptor>,
  /// Enqueued but not yet completed. Also guards `closed` transitions.
  pending: Mutex<usize>,
  quiescent: Condvar,
  closed: AtomicBool,
}

impl WorkQueue {
  pub fn new() -> Self {
    let (sender, receiver) = unbounded();
    Self {
      sender,
      receiver,
      pending: Mutex::new(0),
      quiescent: Condvar::new(),
      closed: AtomicBool::new(false),
    }
  }

  /// Enqueue a module.
  ///
  /// Fails once the queue has been closed; a rejected module is never counted
  /// as pending.
  pub fn push(&self, module: ModuleDescriptor) -> Result<(), QueueError> {
    let mut pending = self.pending.lock();
    if self.closed.load(Ordering::Acquire) {
      return Err(QueueError::Closed);
    }
    // Both ends live in self, so the channel cannot be disconnected.
    self.sender.send(module).map_err(|_| QueueError::Closed)?;
    *pending += 1;
    Ok(())
  }

  /// Wait up to `timeout` for the next module.
  pub fn pop_timeout(&self, timeout: Duration) -> Option<WorkItem<'_>> {
    let module = self.receiver.recv_timeout(timeout).ok()?;
    Some(WorkItem { queue: self, module })
  }

  /// Take the next module if one is immediately available.
  pub fn try_pop(&self) -> Option<WorkItem<'_>> {
    let module = self.receiver.try_recv().ok()?;
    Some(WorkItem { queue: self, module })
  }

  /// Stop accepting new modules. Already queued modules stay poppable.
  pub fn close(&self) {
    let _pending = self.pending.lock();
    self.closed.store(true, Ordering::Release);
  }

  /// Close the queue and discard every module still waiting, marking each
  /// complete. Returns how many were discarded.
  pub fn drain(&self) -> usize {
    self.close();
    let mut discarded = 0;
    while let Some(item) = self.try_pop() {
      trace!(descriptor = %item.module().descriptor_path, "discarding queued module");
      drop(item);
      discarded += 1;
    }
    discarded
  }

  /// Block until every module ever enqueued has been completed.
  pub fn wait_quiescent(&self) {
    let mut pending = self.pending.lock();
    while *pending > 0 {
      self.quiescent.wait(&mut pending);
    }
  }

  /// Like [`wait_quiescent`](Self::wait_quiescent), giving up after `timeout`.
  /// Returns whether the queue is quiescent.
  pub fn wait_quiescent_timeout(&self, timeout: Duration) -> bool {
    let mut pending = self.pending.lock();
    while *pending > 0 {
      if self.quiescent.wait_for(&mut pending, timeout).timed_out() {
        return *pending == 0;
      }
    }
    true
  }

  /// Enqueued modules not yet completed, including ones being processed.
  pub fn pending(&self) -> usize {
    *self.pending.lock()
  }

  /// Modules waiting to be popped.
  pub fn len(&self) -> usize {
    self.receiver.len()
  }

  pub fn is_empty(&self) -> bool {
    self.receiver.is_empty()
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  fn complete(&self) {
    let mut pending = self.pending.lock();
    *pending = pending.saturating_sub(1);
    if *pending == 0 {
      self.quiescent.notify_all();
    }
  }
}

impl Default for WorkQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for WorkQueue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WorkQueue")
      .field("queued", &self.len())
      .field("pending", &self.pending())
      .field("closed", &self.is_closed())
      .finish()
  }
}

/// A module taken from a [`WorkQueue`]. Marks itself complete when dropped.
#[derive(Debug)]
pub struct WorkItem<'q> {
  queue: &'q WorkQueue,
  module: ModuleDescriptor,
}

impl WorkItem<'_> {
  pub fn module(&self) -> &ModuleDescriptor {
    &self.module
  }
}

impl Drop for WorkItem<'_> {
  fn drop(&mut self) {
    self.queue.complete();
  }
}
