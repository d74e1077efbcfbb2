//! C1 (Version Store) and C2 (Compiler Driver).

pub mod driver;
pub mod output;
pub mod version_store;

pub use driver::{CompilerDriver, DriverError};
pub use version_store::{VersionStore, VersionStoreError};
