//! The `broc` global table.
//!
//! This module registers the `broc` global table which provides:
//! - `broc.mode` - Build mode (`"build"` or `"release"`)
//! - `broc.debug` - Whether debug configuration is enabled
//! - `broc.module` - Logical path of the module being loaded
//! - `broc.descriptor` - Logical path of the descriptor being executed
//! - `broc.path` - Path manipulation utilities
//! - `broc.directory(...)` - Declare sub-directories with their own descriptor
//! - `broc.compiler_path(path)` - Declare the compiler toolchain directory
//! - `broc.cflags(...)`, `broc.cxxflags(...)`, `broc.ldflags(...)`, `broc.include(...)`
//! - `broc.application{}`, `broc.static_library{}`, `broc.ut_application{}` - Declare targets
//!
//! List-taking functions accept any mix of strings and arrays of strings.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use super::helpers;
use crate::consts::LUA_GLOBAL;
use crate::env::{Declarations, Environment, Target, TargetKind};

/// Register the `broc` global table for a descriptor executed against `env`.
///
/// Declarations made by the script are recorded into `decls`; `env` is only
/// read for the informational fields.
pub fn register_globals(lua: &Lua, env: &Environment, decls: Rc<RefCell<Declarations>>) -> LuaResult<()> {
  let broc = lua.create_table()?;

  broc.set("mode", env.mode().as_str())?;
  broc.set("debug", env.debug_enabled())?;
  broc.set("module", env.module().module_path.as_str())?;
  broc.set("descriptor", env.descriptor_path())?;

  let path = helpers::path::create_path_helpers(lua)?;
  broc.set("path", path)?;

  // broc.directory("a", "b", ...)
  let subdirs = decls.clone();
  broc.set(
    "directory",
    lua.create_function(move |_, args: LuaMultiValue| {
      let names = collect_strings(args, "directory")?;
      subdirs.borrow_mut().subdirs.extend(names);
      Ok(())
    })?,
  )?;

  // broc.compiler_path("/opt/compiler/bin")
  let compiler = decls.clone();
  broc.set(
    "compiler_path",
    lua.create_function(move |_, path: String| {
      if path.trim().is_empty() {
        return Err(LuaError::external("compiler_path requires a non-empty path"));
      }
      compiler.borrow_mut().compiler_path = Some(path);
      Ok(())
    })?,
  )?;

  register_list(lua, &broc, "cflags", decls.clone(), |d| &mut d.cflags)?;
  register_list(lua, &broc, "cxxflags", decls.clone(), |d| &mut d.cxxflags)?;
  register_list(lua, &broc, "ldflags", decls.clone(), |d| &mut d.ldflags)?;
  register_list(lua, &broc, "include", decls.clone(), |d| &mut d.includes)?;

  for kind in [
    TargetKind::Application,
    TargetKind::StaticLibrary,
    TargetKind::UtApplication,
  ] {
    register_target(lua, &broc, kind, decls.clone())?;
  }

  lua.globals().set(LUA_GLOBAL, broc)?;
  Ok(())
}

/// Register `broc.<name>(...)`, appending its string arguments to one list.
fn register_list(
  lua: &Lua,
  broc: &LuaTable,
  name: &'static str,
  decls: Rc<RefCell<Declarations>>,
  select: fn(&mut Declarations) -> &mut Vec<String>,
) -> LuaResult<()> {
  let func = lua.create_function(move |_, args: LuaMultiValue| {
    let values = collect_strings(args, name)?;
    select(&mut *decls.borrow_mut()).extend(values);
    Ok(())
  })?;
  broc.set(name, func)
}

/// Register `broc.<kind>{ name = ..., sources = {...}, libs = {...} }`.
fn register_target(lua: &Lua, broc: &LuaTable, kind: TargetKind, decls: Rc<RefCell<Declarations>>) -> LuaResult<()> {
  let func = lua.create_function(move |_, spec: LuaTable| {
    let name: String = spec
      .get::<Option<String>>("name")?
      .ok_or_else(|| LuaError::external(format!("{} requires a 'name' field", kind)))?;

    let mut sources = Vec::new();
    push_strings(spec.get("sources")?, kind.as_str(), &mut sources)?;
    let mut libs = Vec::new();
    push_strings(spec.get("libs")?, kind.as_str(), &mut libs)?;

    decls.borrow_mut().targets.push(Target {
      kind,
      name,
      sources,
      libs,
    });
    Ok(())
  })?;
  broc.set(kind.as_str(), func)
}

fn collect_strings(args: LuaMultiValue, what: &str) -> LuaResult<Vec<String>> {
  let mut out = Vec::new();
  for value in args {
    push_strings(value, what, &mut out)?;
  }
  Ok(out)
}

/// Flatten a string, an array of strings, or nil into `out`.
fn push_strings(value: LuaValue, what: &str, out: &mut Vec<String>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => {}
    LuaValue::String(s) => out.push(s.to_str()?.to_string()),
    LuaValue::Table(t) => {
      for i in 1..=t.raw_len() {
        let item: LuaValue = t.get(i)?;
        push_strings(item, what, out)?;
      }
    }
    other => {
      return Err(LuaError::external(format!(
        "{} expects strings or arrays of strings, got {}",
        what,
        other.type_name()
      )));
    }
  }
  Ok(())
}
