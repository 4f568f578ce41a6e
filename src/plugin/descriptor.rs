//! Plugin Descriptors
//!
//! A descriptor file declares what a plugin contributes: versioned methods,
//! classes, version descriptions and an optional registration entry point,
//! with code referenced by
//! catalog key. Loading a descriptor links those keys against a
//! [`PluginCatalog`] and produces a [`LoadedPlugin`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::plugin::catalog::PluginCatalog;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::Plugin;
use crate::version::{ClassFactory, MergeMode, MethodFn, DEFAULT_VERSION};

fn default_enabled() -> bool {
    true
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// On-disk plugin descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name (unique identifier)
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Descriptor API version this plugin targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<u32>,

    /// Priority applied to every handler the entry point adds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Catalog key of the registration entry point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassEntry>,

    /// Descriptions for versions this plugin's bindings create
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, String>,

    /// File the descriptor was read from
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            api_version: None,
            priority: None,
            entry_point: None,
            description: String::new(),
            methods: Vec::new(),
            classes: Vec::new(),
            versions: BTreeMap::new(),
            file_path: None,
        }
    }

    /// Link every catalog reference, failing on the first unknown key
    pub fn link(&self, catalog: &PluginCatalog) -> PluginResult<LoadedPlugin> {
        let entry_point = match &self.entry_point {
            Some(key) => Some(catalog.entry_point(key).ok_or_else(|| {
                PluginError::descriptor_parse_error(format!("unknown entry point '{}'", key))
            })?),
            None => None,
        };

        let methods = self.methods
            .iter()
            .map(|entry| {
                let callable = catalog.function(&entry.function).ok_or_else(|| {
                    PluginError::descriptor_parse_error(format!(
                        "unknown function '{}' for {}.{}",
                        entry.function, entry.entity, entry.method
                    ))
                })?;
                Ok(LinkedMethod {
                    entity: entry.entity.clone(),
                    method: entry.method.clone(),
                    version: entry.version.clone(),
                    callable,
                    description: entry.description.clone(),
                    mode: entry.mode,
                })
            })
            .collect::<PluginResult<Vec<_>>>()?;

        let classes = self.classes
            .iter()
            .map(|entry| {
                let factory = catalog.class(&entry.class).ok_or_else(|| {
                    PluginError::descriptor_parse_error(format!(
                        "unknown class '{}' for {}",
                        entry.class, entry.entity
                    ))
                })?;
                Ok(LinkedClass {
                    entity: entry.entity.clone(),
                    version: entry.version.clone(),
                    factory,
                })
            })
            .collect::<PluginResult<Vec<_>>>()?;

        Ok(LoadedPlugin {
            name: self.name.clone(),
            description: self.description.clone(),
            file_path: self.file_path.clone(),
            priority: self.priority,
            entry_point,
            methods,
            classes,
            versions: self.versions.clone(),
        })
    }
}

/// A method a plugin contributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub entity: String,
    pub method: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Catalog key of the function
    pub function: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub mode: MergeMode,
}

/// A class a plugin contributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub entity: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Catalog key of the class factory
    pub class: String,
}

/// Method entry with its function linked
#[derive(Clone)]
pub struct LinkedMethod {
    pub entity: String,
    pub method: String,
    pub version: String,
    pub callable: MethodFn,
    pub description: String,
    pub mode: MergeMode,
}

/// Class entry with its factory linked
#[derive(Clone)]
pub struct LinkedClass {
    pub entity: String,
    pub version: String,
    pub factory: ClassFactory,
}

/// A plugin ready for registration
///
/// Built either by linking a descriptor file or directly in code.
#[derive(Clone)]
pub struct LoadedPlugin {
    pub name: String,
    pub description: String,
    pub file_path: Option<PathBuf>,
    pub priority: Option<i32>,
    pub entry_point: Option<Arc<dyn Plugin>>,
    pub methods: Vec<LinkedMethod>,
    pub classes: Vec<LinkedClass>,
    /// Version name to description
    pub versions: BTreeMap<String, String>,
}

impl LoadedPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            file_path: None,
            priority: None,
            entry_point: None,
            methods: Vec::new(),
            classes: Vec::new(),
            versions: BTreeMap::new(),
        }
    }

    pub fn with_entry_point(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.entry_point = Some(plugin);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_method(
        mut self,
        entity: &str,
        method: &str,
        version: &str,
        callable: MethodFn,
        mode: MergeMode,
    ) -> Self {
        self.methods.push(LinkedMethod {
            entity: entity.to_string(),
            method: method.to_string(),
            version: version.to_string(),
            callable,
            description: String::new(),
            mode,
        });
        self
    }

    pub fn with_version_description(mut self, version: &str, description: &str) -> Self {
        self.versions.insert(version.to_string(), description.to_string());
        self
    }

    pub fn with_class(mut self, entity: &str, version: &str, factory: ClassFactory) -> Self {
        self.classes.push(LinkedClass {
            entity: entity.to_string(),
            version: version.to_string(),
            factory,
        });
        self
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("file_path", &self.file_path)
            .field("priority", &self.priority)
            .field("entry_point", &self.entry_point.as_ref().map(|p| p.name().to_string()))
            .field("methods", &self.methods.len())
            .field("classes", &self.classes.len())
            .finish()
    }
}
