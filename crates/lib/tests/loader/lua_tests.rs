//! End-to-end loading of Lua descriptors from a workspace on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use broc_lib::{BuildMode, DescriptorError, LoadSession, LoaderConfig, LuaExecutor, ModuleDescriptor, TargetKind, WorkQueue};
use tempfile::TempDir;

use super::common::keys;

fn write_descriptor(workspace: &Path, dir: &str, content: &str) {
  let dir = workspace.join(dir);
  fs::create_dir_all(&dir).unwrap();
  fs::write(dir.join("BROC"), content).unwrap();
}

fn config() -> LoaderConfig {
  LoaderConfig::default()
    .with_workers(3)
    .with_dequeue_timeout(Duration::from_millis(5))
}

/// app declares [net, tools]; net declares [http].
fn example_workspace() -> TempDir {
  let temp = TempDir::new().unwrap();
  let ws = temp.path();
  write_descriptor(
    ws,
    "app",
    r#"
      broc.compiler_path("/opt/toolchain/bin")
      broc.cflags("-g", "-Wall")
      broc.directory("net", "tools")
      broc.application { name = "app", sources = { "main.cpp" }, libs = { "net" } }
    "#,
  );
  write_descriptor(
    ws,
    "app/net",
    r#"
      broc.directory("http")
      broc.static_library { name = "net", sources = { "socket.cpp" } }
    "#,
  );
  write_descriptor(ws, "app/net/http", r#"broc.cxxflags("-g2", "-std=c++17")"#);
  write_descriptor(
    ws,
    "app/tools",
    r#"broc.ut_application { name = "tools_test", sources = { "tools_test.cpp" } }"#,
  );
  write_descriptor(ws, "base", r#"broc.include("include")"#);
  temp
}

#[test]
fn loads_lua_workspace() {
  let temp = example_workspace();
  let queue = Arc::new(WorkQueue::new());
  queue.push(ModuleDescriptor::new(temp.path(), "base")).unwrap();

  let session = LoadSession::new(
    ModuleDescriptor::new(temp.path(), "app"),
    queue,
    LuaExecutor::new(),
    config(),
  );
  session.load().unwrap();

  assert_eq!(
    keys(&session.environments()),
    [
      "app/BROC",
      "app/net/BROC",
      "app/net/http/BROC",
      "app/tools/BROC",
      "base/BROC"
    ]
  );

  let root = session.root_environment().unwrap();
  assert_eq!(root.tree_size(), 4);
  assert_eq!(root.declarations().targets[0].kind, TargetKind::Application);

  for env in session.environments() {
    assert_eq!(env.compiler_dir(), Some(Path::new("/opt/toolchain/bin")));
  }
  let tools = session.environment("app/tools/BROC").unwrap();
  assert_eq!(tools.declarations().targets[0].name, "tools_test");
  assert_eq!(session.environment("base/BROC").unwrap().declarations().includes, ["include"]);
}

#[test]
fn release_mode_strips_debug_flags_everywhere() {
  let temp = example_workspace();
  let session = LoadSession::new(
    ModuleDescriptor::new(temp.path(), "app"),
    Arc::new(WorkQueue::new()),
    LuaExecutor::new(),
    config().with_mode(BuildMode::Release),
  );
  session.load().unwrap();

  let root = session.root_environment().unwrap();
  assert_eq!(root.declarations().cflags, ["-Wall"]);
  let http = session.environment("app/net/http/BROC").unwrap();
  assert!(!http.debug_enabled());
  assert_eq!(http.declarations().cxxflags, ["-std=c++17"]);
}

#[test]
fn descriptors_see_build_mode() {
  let temp = TempDir::new().unwrap();
  write_descriptor(
    temp.path(),
    "app",
    r#"if broc.mode == "release" and not broc.debug then broc.directory("release_only") end"#,
  );
  write_descriptor(temp.path(), "app/release_only", "");

  let session = LoadSession::new(
    ModuleDescriptor::new(temp.path(), "app"),
    Arc::new(WorkQueue::new()),
    LuaExecutor::new(),
    config().with_mode(BuildMode::Release),
  );
  session.load().unwrap();

  assert!(session.environment("app/release_only/BROC").is_some());
}

#[test]
fn missing_subdir_descriptor_fails() {
  let temp = TempDir::new().unwrap();
  write_descriptor(temp.path(), "app", r#"broc.directory("ghost")"#);

  let session = LoadSession::new(
    ModuleDescriptor::new(temp.path(), "app"),
    Arc::new(WorkQueue::new()),
    LuaExecutor::new(),
    config(),
  );
  let err = session.load().unwrap_err();

  assert_eq!(err.descriptor(), Some("app/ghost/BROC"));
  assert!(matches!(err.descriptor_error(), Some(DescriptorError::Read { .. })));
  assert_eq!(keys(&session.environments()), ["app/BROC"]);
}

#[test]
fn lua_error_in_queued_module_reports_file() {
  let temp = TempDir::new().unwrap();
  write_descriptor(temp.path(), "app", "");
  write_descriptor(temp.path(), "broken", r#"error("unsupported platform")"#);

  let queue = Arc::new(WorkQueue::new());
  queue.push(ModuleDescriptor::new(temp.path(), "broken")).unwrap();
  let session = LoadSession::new(ModuleDescriptor::new(temp.path(), "app"), queue, LuaExecutor::new(), config());

  let err = session.load().unwrap_err();

  assert_eq!(err.descriptor(), Some("broken/BROC"));
  let msg = err.to_string();
  assert!(msg.contains("unsupported platform"), "{}", msg);
  assert!(msg.contains("broken"), "{}", msg);
}
