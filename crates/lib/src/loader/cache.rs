//! Path-keyed index of loaded environments.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::env::Environment;

/// Maps descriptor paths to the environments loaded from them.
///
/// Shared by all loader workers. Every access takes the lock; entries are
/// written at most once.
#[derive(Debug, Default)]
pub struct EnvironmentCache {
  inner: Mutex<BTreeMap<String, Arc<Environment>>>,
}

impl EnvironmentCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert `env` under its descriptor path unless that path is already taken.
  ///
  /// Returns whether the environment was inserted.
  pub fn insert(&self, env: Arc<Environment>) -> bool {
    let key = env.descriptor_path().to_string();
    let mut inner = self.inner.lock();
    if inner.contains_key(&key) {
      warn!(descriptor = %key, "duplicate descriptor detected, skipping insertion");
      return false;
    }
    inner.insert(key, env);
    true
  }

  pub fn get(&self, descriptor_path: &str) -> Option<Arc<Environment>> {
    self.inner.lock().get(descriptor_path).cloned()
  }

  pub fn contains(&self, descriptor_path: &str) -> bool {
    self.inner.lock().contains_key(descriptor_path)
  }

  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }

  /// All environments, ordered by descriptor path.
  pub fn snapshot(&self) -> Vec<Arc<Environment>> {
    self.inner.lock().values().cloned().collect()
  }

  /// All descriptor paths, in order.
  pub fn keys(&self) -> Vec<String> {
    self.inner.lock().keys().cloned().collect()
  }
}
