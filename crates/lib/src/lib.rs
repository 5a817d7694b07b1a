//! broc-lib: build descriptor loading for broc
//!
//! This crate discovers and loads the build configuration of a module tree:
//! - `ModuleDescriptor`: where a module and its `BROC` descriptor live
//! - `Environment`: the configuration produced by executing one descriptor
//! - `DescriptorExecutor`: runs a descriptor script against an environment
//! - `LoadSession`: loads the root, then drains the module queue with a worker pool

pub mod consts;
pub mod env;
pub mod executor;
pub mod loader;
pub mod lua;
pub mod module;

pub use env::{BuildMode, Declarations, Environment, Target, TargetKind};
pub use executor::{DescriptorError, DescriptorExecutor, LuaExecutor};
pub use loader::{
  DiagnosticSink, EnvironmentCache, LoadError, LoadSession, LoaderConfig, QueueError, SessionState, TracingSink,
  WorkItem, WorkQueue,
};
pub use module::ModuleDescriptor;
