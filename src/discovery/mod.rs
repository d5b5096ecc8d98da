pub mod directory_resolver;

pub use directory_resolver::{DEFAULT_PATTERN, DirectoryResolver};
