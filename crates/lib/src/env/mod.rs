//! Per-module build environments.
//!
//! An [`Environment`] is the configuration produced by executing one `BROC`
//! descriptor. It starts empty, collects [`Declarations`] while the script runs,
//! is normalized by [`Environment::finalize`], and is frozen once its declared
//! sub-directories have been expanded into child environments.

mod finalize;
mod types;

pub use types::*;
