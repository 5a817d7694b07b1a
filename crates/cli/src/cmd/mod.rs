mod load;
mod tree;

pub use load::cmd_load;
pub use tree::cmd_tree;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use broc_lib::consts::DEFAULT_WORKERS;
use broc_lib::{BuildMode, LoadError, LoadSession, LoaderConfig, LuaExecutor, ModuleDescriptor, WorkQueue};

use crate::output::OutputFormat;

/// Arguments shared by every command that runs a load session.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
  /// Root module, relative to the workspace
  pub root: String,

  /// Further modules to load after the root
  pub modules: Vec<String>,

  /// Workspace directory module paths are relative to
  #[arg(short, long, default_value = ".")]
  pub workspace: PathBuf,

  /// Build mode (build or release)
  #[arg(short, long, default_value = "build")]
  pub mode: BuildMode,

  /// Number of loader worker threads
  #[arg(short = 'j', long, default_value_t = DEFAULT_WORKERS)]
  pub workers: usize,

  /// Directory searched by `require` in descriptors (repeatable)
  #[arg(long = "lua-path")]
  pub lua_paths: Vec<PathBuf>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

/// A finished load session.
pub struct Loaded {
  pub session: LoadSession<LuaExecutor>,
  pub result: Result<(), LoadError>,
  pub elapsed: Duration,
}

/// Queue the requested modules and load them, root first.
///
/// Only setup problems are errors here; a failing descriptor is reported in
/// [`Loaded::result`].
pub fn run_session(args: &LoadArgs) -> Result<Loaded> {
  let workspace = dunce::canonicalize(&args.workspace)
    .with_context(|| format!("Failed to resolve workspace: {}", args.workspace.display()))?;

  let queue = Arc::new(WorkQueue::new());
  for module in &args.modules {
    queue
      .push(ModuleDescriptor::new(workspace.as_path(), module))
      .with_context(|| format!("Failed to queue module: {}", module))?;
  }

  let mut executor = LuaExecutor::new();
  for dir in &args.lua_paths {
    let dir = dunce::canonicalize(dir).with_context(|| format!("Failed to resolve Lua path: {}", dir.display()))?;
    executor = executor.with_package_dir(dir);
  }

  let config = LoaderConfig::default().with_workers(args.workers).with_mode(args.mode);
  let session = LoadSession::new(
    ModuleDescriptor::new(workspace.as_path(), &args.root),
    queue,
    executor,
    config,
  );

  debug!(
    workspace = %workspace.display(),
    root = %args.root,
    queued = args.modules.len(),
    "starting load session"
  );
  let started = Instant::now();
  let result = session.load();
  Ok(Loaded {
    session,
    result,
    elapsed: started.elapsed(),
  })
}
