//! Shared helpers for loader tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use broc_lib::{DescriptorError, DescriptorExecutor, DiagnosticSink, Environment, LoadError, ModuleDescriptor};
use parking_lot::Mutex;

pub const WORKSPACE: &str = "/ws";

/// How a scripted descriptor behaves when executed.
#[derive(Debug, Clone, Default)]
pub struct Script {
  pub subdirs: Vec<String>,
  pub compiler_path: Option<String>,
  pub cflags: Vec<String>,
  pub fail: bool,
  pub panic: bool,
  pub delay: Option<Duration>,
}

impl Script {
  pub fn subdirs(names: &[&str]) -> Self {
    Self {
      subdirs: names.iter().map(|s| s.to_string()).collect(),
      ..Default::default()
    }
  }

  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn panicking() -> Self {
    Self {
      panic: true,
      ..Default::default()
    }
  }

  pub fn with_compiler(mut self, path: &str) -> Self {
    self.compiler_path = Some(path.to_string());
    self
  }

  pub fn with_cflags(mut self, flags: &[&str]) -> Self {
    self.cflags = flags.iter().map(|s| s.to_string()).collect();
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }
}

/// In-memory executor keyed by logical descriptor path.
///
/// Descriptors without a script succeed and declare nothing. Every execution is
/// recorded.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
  scripts: HashMap<PathBuf, Script>,
  calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn script(mut self, descriptor_path: &str, script: Script) -> Self {
    self.scripts.insert(descriptor_file(descriptor_path), script);
    self
  }

  /// Logical descriptor paths executed so far, in execution order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().clone()
  }

  pub fn call_count(&self, descriptor_path: &str) -> usize {
    self.calls.lock().iter().filter(|c| *c == descriptor_path).count()
  }
}

impl DescriptorExecutor for ScriptedExecutor {
  fn execute(&self, descriptor: &Path, env: &mut Environment) -> Result<(), DescriptorError> {
    self.calls.lock().push(env.descriptor_path().to_string());

    let Some(script) = self.scripts.get(descriptor) else {
      return Ok(());
    };
    if let Some(delay) = script.delay {
      std::thread::sleep(delay);
    }
    if script.panic {
      panic!("executor blew up on {}", env.descriptor_path());
    }
    if script.fail {
      return Err(DescriptorError::Script {
        path: descriptor.to_path_buf(),
        message: format!("scripted failure in {}", env.descriptor_path()),
      });
    }

    let decls = env.declarations_mut();
    decls.subdirs.extend(script.subdirs.iter().cloned());
    decls.cflags.extend(script.cflags.iter().cloned());
    if script.compiler_path.is_some() {
      decls.compiler_path = script.compiler_path.clone();
    }
    Ok(())
  }
}

/// Sink collecting every reported failure.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
  reports: Arc<Mutex<Vec<LoadError>>>,
}

impl CollectingSink {
  pub fn reports(&self) -> Vec<LoadError> {
    self.reports.lock().clone()
  }
}

impl DiagnosticSink for CollectingSink {
  fn report(&self, failure: &LoadError) {
    self.reports.lock().push(failure.clone());
  }
}

pub fn module(path: &str) -> ModuleDescriptor {
  ModuleDescriptor::new(WORKSPACE, path)
}

/// On-disk location the loader asks the executor for.
pub fn descriptor_file(descriptor_path: &str) -> PathBuf {
  let mut path = PathBuf::from(WORKSPACE);
  path.extend(descriptor_path.split('/'));
  path
}

pub fn keys(envs: &[Arc<Environment>]) -> Vec<String> {
  envs.iter().map(|e| e.descriptor_path().to_string()).collect()
}
