pub mod config;
pub mod config_loader;
pub mod error;
pub mod state_machine;
pub mod traits;

pub use config::{CONFIG_TEMPLATE, DEFAULT_DEPENDENCY_TYPES, RescopeConfig, RunSettings};
pub use config_loader::{CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader};
pub use error::RescopeError;
pub use state_machine::{RunState, RunStateMachine, StateTransition};
pub use traits::{CommandLine, CommandRunner, Invocation};
