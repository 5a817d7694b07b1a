//! Lua runtime for `BROC` descriptors.
//!
//! Every descriptor runs in its own Lua state. The state exposes a `broc`
//! global table whose functions record declarations into the environment the
//! descriptor is executed for.
//!
//! # Submodules
//!
//! - [`globals`] - The `broc` table (`broc.directory()`, `broc.cflags()`, targets, ...)
//! - [`helpers`] - Helper tables exposed to descriptor scripts
//! - [`runtime`] - Lua state creation and descriptor execution

pub mod globals;
pub mod helpers;
pub mod runtime;
