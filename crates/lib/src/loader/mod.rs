//! Concurrent descriptor loading.
//!
//! A [`LoadSession`] turns a root module plus a queue of further modules into a
//! graph of [`Environment`]s:
//! 1. The root descriptor is loaded on the calling thread. It establishes
//!    session-wide settings (the compiler directory), so nothing else starts
//!    until it has succeeded.
//! 2. A fixed pool of workers drains the [`WorkQueue`], executing each module's
//!    descriptor and expanding its declared sub-directories inline.
//! 3. The caller blocks until the queue is quiescent, then stops the workers.
//!
//! The first failure aborts the session: the failing worker raises the stop
//! flag, reports the failure and drains the queue; the remaining workers notice
//! on their next dequeue and exit.

mod cache;
mod queue;
mod types;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::env::Environment;
use crate::executor::{DescriptorError, DescriptorExecutor, LuaExecutor};
use crate::module::ModuleDescriptor;

pub use cache::EnvironmentCache;
pub use queue::{QueueError, WorkItem, WorkQueue};
pub use types::{DiagnosticSink, LoadError, LoaderConfig, SessionState, TracingSink};

/// One end-to-end load of a module tree.
pub struct LoadSession<E = LuaExecutor> {
  root: ModuleDescriptor,
  queue: Arc<WorkQueue>,
  executor: E,
  config: LoaderConfig,
  sink: Box<dyn DiagnosticSink>,
  cache: EnvironmentCache,
  root_env: OnceLock<Arc<Environment>>,
  /// Compiler directory resolved by the root descriptor.
  compiler_dir: OnceLock<Option<PathBuf>>,
  started: AtomicBool,
  finished: AtomicBool,
  failed: AtomicBool,
  stop: AtomicBool,
  failures: Mutex<Vec<LoadError>>,
}

impl<E: DescriptorExecutor> LoadSession<E> {
  /// Create a session loading `root` first, then every module pushed to `queue`.
  pub fn new(root: ModuleDescriptor, queue: Arc<WorkQueue>, executor: E, config: LoaderConfig) -> Self {
    Self {
      root,
      queue,
      executor,
      config,
      sink: Box::new(TracingSink),
      cache: EnvironmentCache::new(),
      root_env: OnceLock::new(),
      compiler_dir: OnceLock::new(),
      started: AtomicBool::new(false),
      finished: AtomicBool::new(false),
      failed: AtomicBool::new(false),
      stop: AtomicBool::new(false),
      failures: Mutex::new(Vec::new()),
    }
  }

  /// Report failures to `sink` instead of the log.
  pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
    self.sink = Box::new(sink);
    self
  }

  /// Load the root module, then every queued module, and wait for completion.
  ///
  /// Returns the first failure recorded by the session. The queue is closed
  /// when this returns, whatever the outcome.
  pub fn load(&self) -> Result<(), LoadError> {
    if self.started.swap(true, Ordering::AcqRel) {
      return Err(LoadError::AlreadyStarted);
    }

    let started_at = Instant::now();
    info!(
      module = %self.root.module_path,
      mode = %self.config.mode,
      workers = self.config.workers,
      queued = self.queue.len(),
      "loading build descriptors"
    );

    match self.load_root() {
      Ok(()) => self.run_workers(),
      Err(err) => self.abort(err),
    }

    self.queue.close();
    self.finished.store(true, Ordering::Release);

    match self.first_failure() {
      None => {
        info!(
          environments = self.cache.len(),
          elapsed_ms = started_at.elapsed().as_millis() as u64,
          "loaded build descriptors"
        );
        Ok(())
      }
      Some(err) => {
        warn!(
          failures = self.failures.lock().len(),
          environments = self.cache.len(),
          "loading build descriptors failed"
        );
        Err(err)
      }
    }
  }

  /// Whether the session finished without any descriptor failing.
  pub fn succeeded(&self) -> bool {
    self.finished.load(Ordering::Acquire) && !self.failed.load(Ordering::Acquire)
  }

  pub fn state(&self) -> SessionState {
    if !self.finished.load(Ordering::Acquire) {
      SessionState::Pending
    } else if self.failed.load(Ordering::Acquire) {
      SessionState::Failed
    } else {
      SessionState::Loaded
    }
  }

  /// The root environment, available once `load` returned, even on failure.
  pub fn root_environment(&self) -> Option<Arc<Environment>> {
    self.root_env.get().cloned()
  }

  /// Every environment in the cache, ordered by descriptor path.
  pub fn environments(&self) -> Vec<Arc<Environment>> {
    self.cache.snapshot()
  }

  pub fn environment(&self, descriptor_path: &str) -> Option<Arc<Environment>> {
    self.cache.get(descriptor_path)
  }

  /// Every failure recorded, in the order they happened.
  pub fn failures(&self) -> Vec<LoadError> {
    self.failures.lock().clone()
  }

  pub fn config(&self) -> &LoaderConfig {
    &self.config
  }

  fn first_failure(&self) -> Option<LoadError> {
    self.failures.lock().first().cloned()
  }

  fn load_root(&self) -> Result<(), LoadError> {
    let mut env = Environment::new(self.root.clone(), self.config.mode);
    let outcome = self.populate(&mut env, true);

    let env = Arc::new(env);
    let _ = self.root_env.set(Arc::clone(&env));
    if let Err(source) = outcome {
      return Err(LoadError::RootLoad {
        module: self.root.module_path.clone(),
        descriptor: self.root.descriptor_path.clone(),
        source,
      });
    }

    let _ = self.compiler_dir.set(env.compiler_dir().map(Path::to_path_buf));
    debug!(
      descriptor = %env.descriptor_path(),
      compiler_dir = ?env.compiler_dir(),
      "loaded root descriptor"
    );

    self.cache.insert(Arc::clone(&env));
    self.expand(&env)
  }

  fn run_workers(&self) {
    let workers = self.config.workers.max(1);

    thread::scope(|scope| {
      for id in 0..workers {
        let spawned = thread::Builder::new()
          .name(format!("broc-loader-{}", id))
          .spawn_scoped(scope, move || self.run_worker(id));
        if let Err(e) = spawned {
          self.abort(LoadError::Spawn { source: Arc::new(e) });
          break;
        }
      }

      self.queue.wait_quiescent();
      self.stop.store(true, Ordering::Release);
      debug!("module queue quiescent, stopping workers");
    });
  }

  fn run_worker(&self, id: usize) {
    trace!(worker = id, "loader worker started");
    let mut loaded = 0usize;

    while !self.stop.load(Ordering::Acquire) {
      let Some(item) = self.queue.pop_timeout(self.config.dequeue_timeout) else {
        continue;
      };
      if self.stop.load(Ordering::Acquire) {
        trace!(worker = id, descriptor = %item.module().descriptor_path, "session stopped, discarding module");
        continue;
      }

      match self.load_queued(item.module()) {
        Ok(()) => loaded += 1,
        Err(err) => {
          self.abort(err);
          break;
        }
      }
    }

    debug!(worker = id, loaded, "loader worker stopped");
  }

  fn load_queued(&self, module: &ModuleDescriptor) -> Result<(), LoadError> {
    if self.cache.contains(&module.descriptor_path) {
      trace!(descriptor = %module.descriptor_path, "module already loaded");
      return Ok(());
    }

    let mut env = Environment::new(module.clone(), self.config.mode);
    self.populate(&mut env, false).map_err(|source| LoadError::Descriptor {
      module: module.module_path.clone(),
      descriptor: module.descriptor_path.clone(),
      source,
    })?;

    let env = Arc::new(env);
    if !self.cache.insert(Arc::clone(&env)) {
      return Ok(());
    }
    self.expand(&env)
  }

  /// Load every sub-directory `parent` declares, depth first.
  ///
  /// Each child is cached before its own sub-directories are expanded. A
  /// sub-directory whose descriptor is already cached is linked as is, without
  /// running it again. The first failure stops the expansion; later siblings
  /// are not attempted and no children are linked into `parent`.
  fn expand(&self, parent: &Environment) -> Result<(), LoadError> {
    if parent.subdirs().is_empty() {
      return Ok(());
    }

    let mut children = Vec::with_capacity(parent.subdirs().len());
    for subdir in parent.subdirs() {
      let module = parent.module().with_subdir(subdir);
      if let Some(cached) = self.cache.get(&module.descriptor_path) {
        trace!(parent = %parent.descriptor_path(), descriptor = %cached.descriptor_path(), "sub-directory already loaded");
        children.push(cached);
        continue;
      }

      let mut child = Environment::new(module, parent.mode());
      if !parent.debug_enabled() {
        child.disable_debug();
      }

      self.populate(&mut child, false).map_err(|source| LoadError::Expansion {
        parent: parent.descriptor_path().to_string(),
        module: child.module().module_path.clone(),
        descriptor: child.descriptor_path().to_string(),
        source,
      })?;

      let child = Arc::new(child);
      trace!(parent = %parent.descriptor_path(), descriptor = %child.descriptor_path(), "expanded sub-directory");
      if !self.cache.insert(Arc::clone(&child)) {
        // Another worker loaded the same descriptor meanwhile; theirs is the cached one
        children.extend(self.cache.get(child.descriptor_path()));
        continue;
      }
      self.expand(&child)?;
      children.push(child);
    }

    parent.attach_children(children);
    Ok(())
  }

  /// Execute and finalize `env`. Non-root environments then take the
  /// session's compiler directory.
  fn populate(&self, env: &mut Environment, is_root: bool) -> Result<(), DescriptorError> {
    let path = env.module().descriptor_file();
    self.execute(&path, env)?;
    env
      .finalize()
      .map_err(|source| DescriptorError::Invalid { path, source })?;

    if !is_root && let Some(Some(dir)) = self.compiler_dir.get() {
      env.set_compiler_dir(dir.clone());
    }
    Ok(())
  }

  fn execute(&self, path: &Path, env: &mut Environment) -> Result<(), DescriptorError> {
    trace!(descriptor = %path.display(), "executing descriptor");
    match panic::catch_unwind(AssertUnwindSafe(|| self.executor.execute(path, env))) {
      Ok(result) => result,
      Err(payload) => Err(DescriptorError::Panicked {
        path: path.to_path_buf(),
        message: panic_message(payload.as_ref()),
      }),
    }
  }

  /// Record `err`, discard all queued modules and tell every worker to stop.
  fn abort(&self, err: LoadError) {
    // Raise stop first so a module popped while draining is discarded, not loaded
    self.failed.store(true, Ordering::Release);
    self.stop.store(true, Ordering::Release);
    self.sink.report(&err);
    self.failures.lock().push(err);

    let discarded = self.queue.drain();
    if discarded > 0 {
      warn!(discarded, "discarded queued modules after failure");
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
