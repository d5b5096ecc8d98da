pub mod command_executor;
pub mod package_manager;

pub use command_executor::ProcessExecutor;
pub use package_manager::{ALLOWED_PACKAGE_MANAGERS, PackageManager};
