use crate::traits::FileSystem;
use crate::UnavailableFileSystem;
use billboard_core::ModerationConfig;
use std::sync::Arc;

#[cfg(feature = "storage-local")]
use crate::LocalFileSystem;

/// Create the filesystem capability selected by configuration
pub fn create_file_system(config: &ModerationConfig) -> Arc<dyn FileSystem> {
    if !config.filesystem_enabled {
        tracing::warn!("FILESYSTEM_ENABLED=false, video storage disabled");
        return Arc::new(UnavailableFileSystem);
    }

    #[cfg(feature = "storage-local")]
    {
        Arc::new(LocalFileSystem::new())
    }

    #[cfg(not(feature = "storage-local"))]
    {
        tracing::warn!("Local filesystem backend not available (storage-local feature not enabled)");
        Arc::new(UnavailableFileSystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_filesystem_is_unavailable() {
        let config = ModerationConfig {
            filesystem_enabled: false,
            ..Default::default()
        };
        assert!(!create_file_system(&config).is_available());
    }

    #[cfg(feature = "storage-local")]
    #[test]
    fn enabled_filesystem_is_local() {
        assert!(create_file_system(&ModerationConfig::default()).is_available());
    }
}
