//! Module descriptors.
//!
//! A [`ModuleDescriptor`] locates one module of the build graph: where its
//! checkout lives on disk, which workspace it belongs to, and the logical path
//! of its `BROC` descriptor inside that workspace. Descriptors are handed to the
//! loader by an upstream enumerator and are never mutated afterwards; the loader
//! derives new ones for declared sub-directories with [`ModuleDescriptor::with_subdir`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DESCRIPTOR_FILE;

/// Identifies a module and the descriptor file that configures it.
///
/// Logical paths (`module_path`, `descriptor_path`) are always `/`-separated
/// and relative to the workspace, independent of the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDescriptor {
  /// Directory of the module checkout on disk.
  pub root_path: PathBuf,
  /// Workspace directory the logical paths are relative to.
  pub workspace: PathBuf,
  /// Logical path of the module within the workspace (e.g. `baidu/net`).
  pub module_path: String,
  /// Logical path of the descriptor file (e.g. `baidu/net/BROC`).
  pub descriptor_path: String,
}

impl ModuleDescriptor {
  /// Describe the module at `module_path` inside `workspace`.
  ///
  /// The checkout is assumed to live at `workspace/module_path` and the
  /// descriptor at `module_path/BROC`.
  pub fn new(workspace: impl Into<PathBuf>, module_path: &str) -> Self {
    let workspace = workspace.into();
    let module_path = normalize_logical(module_path);
    let root_path = workspace.join(&module_path);
    let descriptor_path = join_logical(&module_path, DESCRIPTOR_FILE);
    Self {
      root_path,
      workspace,
      module_path,
      descriptor_path,
    }
  }

  /// Derive the descriptor of a declared sub-directory.
  ///
  /// The result belongs to the same module; only the descriptor path moves,
  /// relative to the directory of this descriptor, so nested sub-directories
  /// compose: `m/b/BROC` with `c` yields `m/b/c/BROC`.
  pub fn with_subdir(&self, subdir: &str) -> Self {
    let dir = join_logical(self.descriptor_dir(), &normalize_logical(subdir));
    Self {
      root_path: self.root_path.clone(),
      workspace: self.workspace.clone(),
      module_path: self.module_path.clone(),
      descriptor_path: join_logical(&dir, DESCRIPTOR_FILE),
    }
  }

  /// Logical directory containing the descriptor file.
  pub fn descriptor_dir(&self) -> &str {
    match self.descriptor_path.rfind('/') {
      Some(idx) => &self.descriptor_path[..idx],
      None => "",
    }
  }

  /// Location of the descriptor file on disk.
  pub fn descriptor_file(&self) -> PathBuf {
    let mut path = self.workspace.clone();
    path.extend(self.descriptor_path.split('/').filter(|s| !s.is_empty()));
    path
  }
}

impl std::fmt::Display for ModuleDescriptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.module_path, self.descriptor_path)
  }
}

fn normalize_logical(path: &str) -> String {
  path
    .split(['/', '\\'])
    .filter(|s| !s.is_empty() && *s != ".")
    .collect::<Vec<_>>()
    .join("/")
}

fn join_logical(base: &str, segment: &str) -> String {
  match (base.is_empty(), segment.is_empty()) {
    (true, _) => segment.to_string(),
    (_, true) => base.to_string(),
    _ => format!("{}/{}", base, segment),
  }
}
