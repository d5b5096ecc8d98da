pub mod core;
pub mod discovery;
pub mod manifest;
pub mod orchestration;
pub mod process;

pub use crate::core::{
    ConfigLoadOptions, ConfigLoader, RescopeConfig, RescopeError, RunSettings, RunState,
};
pub use discovery::DirectoryResolver;
pub use manifest::{Manifest, ScopePair, VersionStrategy};
pub use orchestration::{RescopePublisher, RunPlan, RunReport};
pub use process::{PackageManager, ProcessExecutor};
