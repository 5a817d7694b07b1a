//! Types for descriptor loading.
//!
//! This module defines the configuration, error types, session states and the
//! diagnostics seam used by [`LoadSession`](super::LoadSession).

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::error;

use crate::consts::{DEFAULT_DEQUEUE_TIMEOUT, DEFAULT_WORKERS};
use crate::env::BuildMode;
use crate::executor::DescriptorError;

/// Configuration for a load session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
  /// Number of worker threads draining the module queue.
  pub workers: usize,
  /// Build mode every environment is loaded in.
  pub mode: BuildMode,
  /// How long an idle worker waits on the queue before re-checking the stop flag.
  pub dequeue_timeout: Duration,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      workers: DEFAULT_WORKERS,
      mode: BuildMode::default(),
      dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
    }
  }
}

impl LoaderConfig {
  /// Set the worker count. Zero is raised to one.
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers.max(1);
    self
  }

  pub fn with_mode(mut self, mode: BuildMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
    self.dequeue_timeout = timeout;
    self
  }
}

/// Errors that end a load session.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
  /// The root descriptor failed; no worker was started.
  #[error("failed to load root module {module}: {source}")]
  RootLoad {
    module: String,
    descriptor: String,
    #[source]
    source: DescriptorError,
  },

  /// A queued module's descriptor failed.
  #[error("failed to load {descriptor} (module {module}): {source}")]
  Descriptor {
    module: String,
    descriptor: String,
    #[source]
    source: DescriptorError,
  },

  /// A declared sub-directory failed to load.
  #[error("failed to expand {descriptor} declared by {parent}: {source}")]
  Expansion {
    parent: String,
    module: String,
    descriptor: String,
    #[source]
    source: DescriptorError,
  },

  /// A worker thread could not be started.
  #[error("failed to spawn loader worker: {source}")]
  Spawn {
    #[source]
    source: Arc<io::Error>,
  },

  /// `load` was called on a session that already ran.
  #[error("load session already started")]
  AlreadyStarted,
}

impl LoadError {
  /// Descriptor path of the failing descriptor, if the error concerns one.
  pub fn descriptor(&self) -> Option<&str> {
    match self {
      LoadError::RootLoad { descriptor, .. }
      | LoadError::Descriptor { descriptor, .. }
      | LoadError::Expansion { descriptor, .. } => Some(descriptor),
      LoadError::Spawn { .. } | LoadError::AlreadyStarted => None,
    }
  }

  /// Module path of the failing descriptor, if the error concerns one.
  pub fn module(&self) -> Option<&str> {
    match self {
      LoadError::RootLoad { module, .. } | LoadError::Descriptor { module, .. } | LoadError::Expansion { module, .. } => {
        Some(module)
      }
      LoadError::Spawn { .. } | LoadError::AlreadyStarted => None,
    }
  }

  /// The underlying descriptor error, if any.
  pub fn descriptor_error(&self) -> Option<&DescriptorError> {
    match self {
      LoadError::RootLoad { source, .. }
      | LoadError::Descriptor { source, .. }
      | LoadError::Expansion { source, .. } => Some(source),
      LoadError::Spawn { .. } | LoadError::AlreadyStarted => None,
    }
  }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  /// `load` has not finished yet.
  Pending,
  /// Every reachable descriptor was loaded.
  Loaded,
  /// At least one descriptor failed; the cache must not be trusted.
  Failed,
}

/// Receives one report per failing descriptor.
pub trait DiagnosticSink: Send + Sync {
  fn report(&self, failure: &LoadError);
}

/// Default sink: logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
  fn report(&self, failure: &LoadError) {
    error!(
      module = failure.module().unwrap_or("-"),
      descriptor = failure.descriptor().unwrap_or("-"),
      error = %failure,
      "descriptor load failed"
    );
  }
}
