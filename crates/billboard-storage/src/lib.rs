//! Billboard Storage Library
//!
//! On-device persistence for submitted videos: the video binaries live in a
//! single directory and their records in one JSON metadata index.
//!
//! # File layout
//!
//! - **Binaries**: `{root}/videos/{bookingId}_{timestampMillis}.{ext}`
//! - **Index**: `{root}/video_metadata.json`, a JSON array of `VideoRecord`
//!
//! Filesystem access goes through the `FileSystem` capability so platforms
//! without durable storage degrade to no-ops instead of failing.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod store;
pub mod traits;
pub mod unavailable;
pub mod validation;

// Re-export commonly used types
pub use factory::create_file_system;
#[cfg(feature = "storage-local")]
pub use local::LocalFileSystem;
pub use store::{LocalVideoStore, StoreLimits, StoreVideoResponse};
pub use traits::{FileSystem, StorageError, StorageResult};
pub use unavailable::UnavailableFileSystem;
pub use validation::StoreVideoError;
