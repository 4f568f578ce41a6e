//! Descriptor API Compatibility
//!
//! Plugin descriptors may declare the API version they were written for.
//! Versions are `YYYYMMDD` numbers; the year is the major version and only
//! descriptors with the host's major version are accepted.

use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::error::{PluginError, PluginResult};

include!(concat!(env!("OUT_DIR"), "/version_api.rs"));

/// API version of this build
pub fn get_api_version() -> u32 {
    BASE_API_VERSION
}

/// Checker for descriptor API compatibility
#[derive(Debug, Clone, Copy)]
pub struct VersionCompatibilityChecker {
    api_version: u32,
}

impl VersionCompatibilityChecker {
    pub fn new(api_version: u32) -> Self {
        Self { api_version }
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Same major version (year) is compatible
    pub fn is_api_compatible(&self, plugin_api_version: u32) -> bool {
        self.get_major_version(self.api_version) == self.get_major_version(plugin_api_version)
    }

    pub fn get_major_version(&self, api_version: u32) -> u32 {
        api_version / 10000
    }

    /// Descriptors without an `api_version` are always accepted
    pub fn check_descriptor(&self, descriptor: &PluginDescriptor) -> PluginResult<()> {
        match descriptor.api_version {
            Some(version) if !self.is_api_compatible(version) => Err(PluginError::version_incompatible(format!(
                "Plugin '{}' requires API version {} but current version is {}",
                descriptor.name, version, self.api_version
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for VersionCompatibilityChecker {
    fn default() -> Self {
        Self::new(get_api_version())
    }
}
