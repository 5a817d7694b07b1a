use std::path::{Component, Path, PathBuf};

use mlua::prelude::*;

/// Create the `broc.path` table with path manipulation utilities.
///
/// None of these touch the filesystem.
pub fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // broc.path.join(...) - Join multiple path segments
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut result = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          result.push(s.to_str()?.as_ref());
        }
      }
      Ok(result.to_string_lossy().into_owned())
    })?,
  )?;

  // broc.path.dirname(path) - Get parent directory
  path.set(
    "dirname",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .parent()
          .map(|p| p.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // broc.path.basename(path) - Get file name
  path.set(
    "basename",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // broc.path.normalize(path) - Resolve . and .. lexically
  path.set(
    "normalize",
    lua.create_function(|_, path_str: String| {
      let mut normalized = PathBuf::new();
      for component in Path::new(&path_str).components() {
        match component {
          Component::ParentDir => {
            normalized.pop();
          }
          Component::CurDir => {}
          _ => normalized.push(component),
        }
      }
      Ok(normalized.to_string_lossy().into_owned())
    })?,
  )?;

  Ok(path)
}
