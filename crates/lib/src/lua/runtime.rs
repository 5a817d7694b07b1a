use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;

use crate::consts::LUA_GLOBAL;
use crate::env::{Declarations, Environment};
use crate::lua::globals;

/// Create a fresh Lua state for executing one descriptor against `env`.
///
/// Registers the `broc` table bound to `decls` and prepends every directory in
/// `package_dirs` to `package.path`, so descriptors can `require` shared
/// helper modules.
pub fn create_runtime(env: &Environment, decls: Rc<RefCell<Declarations>>, package_dirs: &[PathBuf]) -> LuaResult<Lua> {
  let lua = Lua::new();

  if !package_dirs.is_empty() {
    let package = lua.globals().get::<LuaTable>("package")?;
    let current: String = package.get("path")?;
    let mut paths: Vec<String> = package_dirs
      .iter()
      .flat_map(|dir| {
        let dir = dir.to_string_lossy().replace('\\', "/");
        [format!("{}/?.lua", dir), format!("{}/?/init.lua", dir)]
      })
      .collect();
    paths.push(current);
    package.set("path", paths.join(";"))?;
  }

  globals::register_globals(&lua, env, decls)?;

  Ok(lua)
}

/// Execute descriptor `source`, read from `path`, in `lua`.
///
/// Sets `broc.dir` to the directory containing the descriptor before running
/// it. The chunk is named after the file so errors point at the descriptor.
pub fn exec_descriptor(lua: &Lua, path: &Path, source: &str) -> LuaResult<()> {
  let broc = lua.globals().get::<LuaTable>(LUA_GLOBAL)?;
  broc.set(
    "dir",
    path
      .parent()
      .unwrap_or(Path::new(""))
      .to_string_lossy()
      .to_string(),
  )?;

  lua.load(source).set_name(format!("@{}", path.display())).exec()
}
