//! Implementation of the `broc tree` command.
//!
//! Prints each loaded module with the sub-directory environments expanded
//! beneath it.

use anyhow::{Result, bail};
use serde::Serialize;

use broc_lib::Environment;

use crate::cmd::{LoadArgs, run_session};
use crate::output::{self, Status};

#[derive(Debug, Serialize)]
struct TreeNode {
  descriptor: String,
  targets: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  children: Vec<TreeNode>,
}

impl From<&Environment> for TreeNode {
  fn from(env: &Environment) -> Self {
    Self {
      descriptor: env.descriptor_path().to_string(),
      targets: env.declarations().targets.iter().map(|t| t.name.clone()).collect(),
      children: env.children().iter().map(|c| TreeNode::from(c.as_ref())).collect(),
    }
  }
}

pub fn cmd_tree(args: &LoadArgs, verbose: bool) -> Result<()> {
  let loaded = run_session(args)?;
  if let Err(err) = &loaded.result {
    output::status(Status::Failed, err);
    bail!("loading {} failed", args.root);
  }

  // Expanded sub-directories hang off their parent; only module roots start a tree
  let roots: Vec<_> = loaded
    .session
    .environments()
    .into_iter()
    .filter(|env| env.module().descriptor_dir() == env.module().module_path)
    .collect();

  if args.output.is_json() {
    let nodes: Vec<TreeNode> = roots.iter().map(|env| TreeNode::from(env.as_ref())).collect();
    return output::json(&nodes);
  }

  for env in &roots {
    println!("{}", label(env, verbose));
    print_children(env, "", verbose);
  }
  Ok(())
}

fn print_children(env: &Environment, prefix: &str, verbose: bool) {
  let children = env.children();
  for (i, child) in children.iter().enumerate() {
    let last = i + 1 == children.len();
    let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
    println!("{}{}{}", prefix, branch, label(child, verbose));
    print_children(child, &format!("{}{}", prefix, indent), verbose);
  }
}

fn label(env: &Environment, verbose: bool) -> String {
  let targets = &env.declarations().targets;
  if !verbose || targets.is_empty() {
    return env.descriptor_path().to_string();
  }
  let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
  format!("{} [{}]", env.descriptor_path(), names.join(", "))
}
