//! Implementation of the `broc load` command.
//!
//! Loads the root module and every queued module, then prints what was loaded
//! or the failure that aborted the session.

use anyhow::{Result, bail};
use serde::Serialize;

use broc_lib::{BuildMode, Environment, LoadError, Target};

use crate::cmd::{LoadArgs, run_session};
use crate::output::{self, ITEM, Status};

#[derive(Debug, Serialize)]
struct LoadSummary<'a> {
  root: &'a str,
  mode: BuildMode,
  workers: usize,
  success: bool,
  elapsed_ms: u64,
  environments: Vec<EnvironmentSummary>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  failures: Vec<FailureSummary>,
}

#[derive(Debug, Serialize)]
struct EnvironmentSummary {
  descriptor: String,
  module: String,
  subdirs: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  compiler_dir: Option<String>,
  targets: Vec<Target>,
}

impl From<&Environment> for EnvironmentSummary {
  fn from(env: &Environment) -> Self {
    Self {
      descriptor: env.descriptor_path().to_string(),
      module: env.module().module_path.clone(),
      subdirs: env.subdirs().to_vec(),
      compiler_dir: env.compiler_dir().map(|p| p.display().to_string()),
      targets: env.declarations().targets.clone(),
    }
  }
}

#[derive(Debug, Serialize)]
struct FailureSummary {
  #[serde(skip_serializing_if = "Option::is_none")]
  descriptor: Option<String>,
  message: String,
}

impl From<&LoadError> for FailureSummary {
  fn from(err: &LoadError) -> Self {
    Self {
      descriptor: err.descriptor().map(str::to_string),
      message: err.to_string(),
    }
  }
}

pub fn cmd_load(args: &LoadArgs, verbose: bool) -> Result<()> {
  let loaded = run_session(args)?;
  let session = &loaded.session;
  let environments = session.environments();

  if args.output.is_json() {
    let summary = LoadSummary {
      root: &args.root,
      mode: args.mode,
      workers: session.config().workers,
      success: loaded.result.is_ok(),
      elapsed_ms: loaded.elapsed.as_millis() as u64,
      environments: environments.iter().map(|e| EnvironmentSummary::from(e.as_ref())).collect(),
      failures: session.failures().iter().map(FailureSummary::from).collect(),
    };
    output::json(&summary)?;
  } else {
    match &loaded.result {
      Ok(()) => {
        output::status(
          Status::Loaded,
          format_args!("Loaded {} environment(s) from {}", environments.len(), args.root),
        );
        output::detail("Mode", args.mode);
        output::detail("Workers", session.config().workers);
        output::detail("Elapsed", output::elapsed(loaded.elapsed));

        if verbose {
          println!();
          for env in &environments {
            println!(
              "  {} {} ({} target(s))",
              ITEM,
              env.descriptor_path(),
              env.declarations().targets.len()
            );
          }
        }
      }
      Err(err) => {
        output::status(Status::Failed, err);
        let failures = session.failures();
        if failures.len() > 1 {
          output::status(
            Status::Partial,
            format_args!("{} further failure(s) while aborting", failures.len() - 1),
          );
        }
        output::detail("Loaded", environments.len());
      }
    }
  }

  if loaded.result.is_err() {
    bail!("loading {} failed", args.root);
  }
  Ok(())
}
