//! Environment types.
//!
//! # Ownership
//!
//! Environments are shared as `Arc<Environment>`: the loader's cache indexes
//! every environment by descriptor path, while each parent owns the children it
//! expanded. The two relations are kept separately; neither is derived from the
//! other.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::ModuleDescriptor;

/// Which kind of build the environments are loaded for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  /// Regular development build, debug output enabled.
  #[default]
  Build,
  /// Release build, debug-oriented configuration is suppressed.
  Release,
}

impl BuildMode {
  pub fn as_str(self) -> &'static str {
    match self {
      BuildMode::Build => "build",
      BuildMode::Release => "release",
    }
  }

  /// Whether environments loaded in this mode keep debug configuration.
  pub fn debug_enabled(self) -> bool {
    matches!(self, BuildMode::Build)
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown build mode '{0}' (expected 'build' or 'release')")]
pub struct ParseBuildModeError(String);

impl FromStr for BuildMode {
  type Err = ParseBuildModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "build" => Ok(BuildMode::Build),
      "release" => Ok(BuildMode::Release),
      _ => Err(ParseBuildModeError(s.to_string())),
    }
  }
}

/// Kind of target a descriptor can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
  Application,
  StaticLibrary,
  UtApplication,
}

impl TargetKind {
  pub fn as_str(self) -> &'static str {
    match self {
      TargetKind::Application => "application",
      TargetKind::StaticLibrary => "static_library",
      TargetKind::UtApplication => "ut_application",
    }
  }
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A build target declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
  pub kind: TargetKind,
  pub name: String,
  pub sources: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub libs: Vec<String>,
}

/// Everything a descriptor script declared, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations {
  /// Sub-directories carrying their own descriptor.
  pub subdirs: Vec<String>,
  /// Compiler toolchain directory, normally only declared by the root module.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub compiler_path: Option<String>,
  pub cflags: Vec<String>,
  pub cxxflags: Vec<String>,
  pub ldflags: Vec<String>,
  pub includes: Vec<String>,
  pub targets: Vec<Target>,
}

impl Declarations {
  /// Append everything `other` declared after what is already declared.
  ///
  /// A compiler path in `other` replaces the current one.
  pub fn merge(&mut self, other: Declarations) {
    self.subdirs.extend(other.subdirs);
    if other.compiler_path.is_some() {
      self.compiler_path = other.compiler_path;
    }
    self.cflags.extend(other.cflags);
    self.cxxflags.extend(other.cxxflags);
    self.ldflags.extend(other.ldflags);
    self.includes.extend(other.includes);
    self.targets.extend(other.targets);
  }

  pub fn is_empty(&self) -> bool {
    *self == Declarations::default()
  }
}

/// Errors raised while finalizing a populated environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
  /// A declared sub-directory is empty, absolute, or escapes the module.
  #[error("invalid sub-directory '{0}'")]
  InvalidSubdir(String),

  /// A target was declared without a name.
  #[error("{kind} target declared without a name")]
  UnnamedTarget { kind: TargetKind },

  /// Two targets share a name.
  #[error("duplicate target '{0}'")]
  DuplicateTarget(String),

  /// A target lists no sources.
  #[error("target '{0}' has no sources")]
  NoSources(String),
}

/// The build configuration of one module directory.
#[derive(Debug)]
pub struct Environment {
  module: ModuleDescriptor,
  mode: BuildMode,
  debug: bool,
  declarations: Declarations,
  compiler_dir: Option<PathBuf>,
  finalized: bool,
  children: OnceLock<Vec<Arc<Environment>>>,
}

impl Environment {
  /// Create an empty environment for `module`.
  ///
  /// Debug configuration is disabled up front for [`BuildMode::Release`].
  pub fn new(module: ModuleDescriptor, mode: BuildMode) -> Self {
    Self {
      module,
      mode,
      debug: mode.debug_enabled(),
      declarations: Declarations::default(),
      compiler_dir: None,
      finalized: false,
      children: OnceLock::new(),
    }
  }

  pub fn module(&self) -> &ModuleDescriptor {
    &self.module
  }

  /// Cache key of this environment.
  pub fn descriptor_path(&self) -> &str {
    &self.module.descriptor_path
  }

  pub fn mode(&self) -> BuildMode {
    self.mode
  }

  pub fn debug_enabled(&self) -> bool {
    self.debug
  }

  /// Suppress debug-oriented configuration for this environment.
  pub fn disable_debug(&mut self) {
    self.debug = false;
  }

  pub fn declarations(&self) -> &Declarations {
    &self.declarations
  }

  /// Mutable access for descriptor execution.
  pub fn declarations_mut(&mut self) -> &mut Declarations {
    &mut self.declarations
  }

  /// Declared sub-directories, normalized once the environment is finalized.
  pub fn subdirs(&self) -> &[String] {
    &self.declarations.subdirs
  }

  pub fn compiler_dir(&self) -> Option<&Path> {
    self.compiler_dir.as_deref()
  }

  pub fn set_compiler_dir(&mut self, dir: impl Into<PathBuf>) {
    self.compiler_dir = Some(dir.into());
  }

  pub fn is_finalized(&self) -> bool {
    self.finalized
  }

  pub(super) fn mark_finalized(&mut self) {
    self.finalized = true;
  }

  pub(super) fn compiler_dir_mut(&mut self) -> &mut Option<PathBuf> {
    &mut self.compiler_dir
  }

  /// Child environments expanded from the declared sub-directories.
  ///
  /// Empty for leaves and for environments whose expansion has not completed.
  pub fn children(&self) -> &[Arc<Environment>] {
    self.children.get().map(Vec::as_slice).unwrap_or(&[])
  }

  /// Link the expanded children. Only the first call has an effect.
  pub(crate) fn attach_children(&self, children: Vec<Arc<Environment>>) -> bool {
    self.children.set(children).is_ok()
  }

  /// Count of this environment and all environments below it.
  pub fn tree_size(&self) -> usize {
    1 + self.children().iter().map(|c| c.tree_size()).sum::<usize>()
  }
}
