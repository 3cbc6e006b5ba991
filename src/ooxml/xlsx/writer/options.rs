//! Options controlling package output.

use std::sync::Arc;

use crate::ooxml::xlsx::plugin::PluginRegistry;
use crate::ooxml::xlsx::protection::{LegacyPasswordHasher, PasswordHasher};

/// Settings for one write operation.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Deflate archive entries; stored uncompressed when false
    pub deflate: bool,
    /// Hashes plain protection passwords
    pub password_hasher: Arc<dyn PasswordHasher>,
    /// Registry to take plugins from; the process-wide registry when `None`
    pub plugins: Option<Arc<PluginRegistry>>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            deflate: true,
            password_hasher: Arc::new(LegacyPasswordHasher),
            plugins: None,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deflate(mut self, deflate: bool) -> Self {
        self.deflate = deflate;
        self
    }

    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.password_hasher = hasher;
        self
    }

    pub fn with_plugins(mut self, registry: PluginRegistry) -> Self {
        self.plugins = Some(Arc::new(registry));
        self
    }
}
