//! The finalize ("Action") step run after a descriptor has executed.
//!
//! Finalizing validates what the script declared and normalizes it so that
//! downstream stages see one canonical shape regardless of how the script
//! spelled things.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use super::types::{ConfigError, Environment};

impl Environment {
  /// Validate and normalize the declared configuration.
  ///
  /// - sub-directories are trimmed and deduplicated (first occurrence wins);
  ///   empty, absolute and `..` entries are rejected
  /// - debug flags are stripped from all flag lists when debug is disabled
  /// - targets need a unique name and at least one source
  /// - a declared compiler path becomes the compiler directory
  pub fn finalize(&mut self) -> Result<(), ConfigError> {
    let debug = self.debug_enabled();
    let decls = self.declarations_mut();

    let mut seen = HashSet::new();
    let mut subdirs = Vec::with_capacity(decls.subdirs.len());
    for raw in &decls.subdirs {
      let subdir = normalize_subdir(raw)?;
      if seen.insert(subdir.clone()) {
        subdirs.push(subdir);
      }
    }
    decls.subdirs = subdirs;

    if !debug {
      for flags in [&mut decls.cflags, &mut decls.cxxflags, &mut decls.ldflags] {
        flags.retain(|flag| !is_debug_flag(flag));
      }
    }

    let mut names = HashSet::new();
    for target in &decls.targets {
      if target.name.trim().is_empty() {
        return Err(ConfigError::UnnamedTarget { kind: target.kind });
      }
      if !names.insert(target.name.as_str()) {
        return Err(ConfigError::DuplicateTarget(target.name.clone()));
      }
      if target.sources.is_empty() {
        return Err(ConfigError::NoSources(target.name.clone()));
      }
    }

    let compiler = decls.compiler_path.clone();
    if let Some(path) = compiler {
      *self.compiler_dir_mut() = Some(PathBuf::from(path));
    }

    self.mark_finalized();
    debug!(
      descriptor = %self.descriptor_path(),
      subdirs = self.subdirs().len(),
      targets = self.declarations().targets.len(),
      "finalized environment"
    );
    Ok(())
  }
}

fn normalize_subdir(raw: &str) -> Result<String, ConfigError> {
  let trimmed = raw.trim();
  if trimmed.starts_with('/') || trimmed.starts_with('\\') || trimmed.contains(':') {
    return Err(ConfigError::InvalidSubdir(raw.to_string()));
  }

  let segments: Vec<&str> = trimmed
    .split(['/', '\\'])
    .filter(|s| !s.is_empty() && *s != ".")
    .collect();
  if segments.is_empty() || segments.contains(&"..") {
    return Err(ConfigError::InvalidSubdir(raw.to_string()));
  }

  Ok(segments.join("/"))
}

/// `-g`, `-g<level>`, `-ggdb*` and `-gdwarf*`.
fn is_debug_flag(flag: &str) -> bool {
  let Some(rest) = flag.strip_prefix("-g") else {
    return false;
  };
  rest.is_empty() || rest.chars().all(|c| c.is_ascii_digit()) || rest.starts_with("gdb") || rest.starts_with("dwarf")
}
