//! Descriptor execution.
//!
//! A [`DescriptorExecutor`] runs one descriptor file against one environment.
//! The environment is passed explicitly on every call, so executors carry no
//! "current environment" state and a single executor can be shared by every
//! loader worker.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use mlua::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::env::{ConfigError, Declarations, Environment};
use crate::lua::runtime;

/// Errors raised while loading a single descriptor.
#[derive(Debug, Clone, Error)]
pub enum DescriptorError {
  /// The descriptor file could not be read.
  #[error("cannot read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  /// The descriptor script raised an error.
  #[error("error in {}: {message}", .path.display())]
  Script { path: PathBuf, message: String },

  /// Execution panicked.
  #[error("{} panicked: {message}", .path.display())]
  Panicked { path: PathBuf, message: String },

  /// The declared configuration did not pass finalization.
  #[error("invalid configuration in {}: {source}", .path.display())]
  Invalid {
    path: PathBuf,
    #[source]
    source: ConfigError,
  },
}

impl DescriptorError {
  /// The descriptor file the error concerns.
  pub fn path(&self) -> &Path {
    match self {
      DescriptorError::Read { path, .. }
      | DescriptorError::Script { path, .. }
      | DescriptorError::Panicked { path, .. }
      | DescriptorError::Invalid { path, .. } => path,
    }
  }
}

/// Runs a descriptor file, populating the given environment.
///
/// Implementations must be shareable across loader threads; each call is
/// independent and may run concurrently with calls for other environments.
pub trait DescriptorExecutor: Sync {
  fn execute(&self, descriptor: &Path, env: &mut Environment) -> Result<(), DescriptorError>;
}

impl<E: DescriptorExecutor + ?Sized> DescriptorExecutor for &E {
  fn execute(&self, descriptor: &Path, env: &mut Environment) -> Result<(), DescriptorError> {
    (**self).execute(descriptor, env)
  }
}

impl<E: DescriptorExecutor + Send + ?Sized> DescriptorExecutor for Arc<E> {
  fn execute(&self, descriptor: &Path, env: &mut Environment) -> Result<(), DescriptorError> {
    (**self).execute(descriptor, env)
  }
}

/// Executes `BROC` descriptors as Lua scripts.
///
/// Each call gets a fresh Lua state, so nothing a descriptor does can leak
/// into another descriptor.
#[derive(Debug, Clone, Default)]
pub struct LuaExecutor {
  package_dirs: Vec<PathBuf>,
}

impl LuaExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make Lua modules under `dir` available to descriptors via `require`.
  pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.package_dirs.push(dir.into());
    self
  }
}

impl DescriptorExecutor for LuaExecutor {
  fn execute(&self, descriptor: &Path, env: &mut Environment) -> Result<(), DescriptorError> {
    let source = fs::read_to_string(descriptor).map_err(|e| DescriptorError::Read {
      path: descriptor.to_path_buf(),
      source: Arc::new(e),
    })?;

    let decls = Rc::new(RefCell::new(Declarations::default()));

    // Run in a block so the Lua state, and its references to decls, is dropped
    // before the declarations are taken back.
    {
      let lua = runtime::create_runtime(env, decls.clone(), &self.package_dirs)
        .map_err(|e| script_error(descriptor, &e))?;
      runtime::exec_descriptor(&lua, descriptor, &source).map_err(|e| script_error(descriptor, &e))?;
    }

    let declared = Rc::try_unwrap(decls)
      .map(RefCell::into_inner)
      .unwrap_or_else(|shared| shared.borrow().clone());

    debug!(
      descriptor = %descriptor.display(),
      subdirs = declared.subdirs.len(),
      targets = declared.targets.len(),
      "executed descriptor"
    );
    env.declarations_mut().merge(declared);
    Ok(())
  }
}

fn script_error(path: &Path, err: &LuaError) -> DescriptorError {
  DescriptorError::Script {
    path: path.to_path_buf(),
    message: err.to_string(),
  }
}
