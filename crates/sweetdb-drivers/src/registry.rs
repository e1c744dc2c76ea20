//! Driver registry for managing available database drivers

use std::collections::HashMap;
use std::sync::Arc;
use sweetdb_core::{ConnectionConfig, DatabaseDriver, Result, SweetError};

/// Registry of available database drivers, keyed by driver name and by the
/// DSN schemes each driver answers to
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
    schemes: HashMap<String, String>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            schemes: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "mysql")]
        registry.register(Arc::new(crate::mysql::MySqlDriver::new()));

        registry
    }

    /// Register a new driver. A later registration under the same name or
    /// scheme replaces the earlier one.
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, schemes = ?driver.schemes(), "registering database driver");
        for scheme in driver.schemes() {
            self.schemes.insert(scheme.to_ascii_lowercase(), name.clone());
        }
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name or DSN scheme (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let key = name.to_ascii_lowercase();
        let driver = self
            .drivers
            .get(&key)
            .or_else(|| self.schemes.get(&key).and_then(|n| self.drivers.get(n)))
            .cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Get the driver for a configuration, or a configuration error naming
    /// the drivers that are available
    pub fn resolve(&self, config: &ConnectionConfig) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(&config.driver).ok_or_else(|| {
            let mut available = self.list();
            available.sort_unstable();
            SweetError::Configuration(format!(
                "no driver registered for '{}' (available: {})",
                config.driver,
                available.join(", ")
            ))
        })
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered under this name or scheme
    pub fn has(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        self.drivers.contains_key(&key) || self.schemes.contains_key(&key)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
