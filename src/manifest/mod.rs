//! Package manifest handling: I/O, rescope transforms, versioning and checks

pub mod package_json;
pub mod rescope;
pub mod validator;
pub mod version;

pub use package_json::{MANIFEST_FILE, Manifest};
pub use rescope::{
    DependencyRewrite, RescopeOutcome, ScopePair, rescope_dependencies, rescope_name,
    rescope_package,
};
pub use validator::ManifestValidator;
pub use version::{VersionStrategy, timestamp_version};
