//! Compiled-in Plugin Catalog
//!
//! Descriptor files cannot carry code, so everything they reference lives in
//! a catalog keyed by string: method functions, class factories and
//! registration entry points.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::plugin::traits::Plugin;
use crate::version::{ClassFactory, MethodFn};

#[derive(Default, Clone)]
pub struct PluginCatalog {
    functions: BTreeMap<String, MethodFn>,
    classes: BTreeMap<String, ClassFactory>,
    entry_points: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function; an existing key is overwritten
    pub fn add_function(&mut self, key: impl Into<String>, function: MethodFn) -> &mut Self {
        self.functions.insert(key.into(), function);
        self
    }

    pub fn add_class(&mut self, key: impl Into<String>, factory: ClassFactory) -> &mut Self {
        self.classes.insert(key.into(), factory);
        self
    }

    /// Add an entry point under its own name
    pub fn add_entry_point(&mut self, plugin: Arc<dyn Plugin>) -> &mut Self {
        self.entry_points.insert(plugin.name().to_string(), plugin);
        self
    }

    pub fn function(&self, key: &str) -> Option<MethodFn> {
        self.functions.get(key).cloned()
    }

    pub fn class(&self, key: &str) -> Option<ClassFactory> {
        self.classes.get(key).cloned()
    }

    pub fn entry_point(&self, key: &str) -> Option<Arc<dyn Plugin>> {
        self.entry_points.get(key).cloned()
    }

    pub fn function_keys(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn class_keys(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn entry_point_keys(&self) -> impl Iterator<Item = &str> {
        self.entry_points.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty() && self.entry_points.is_empty()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("entry_points", &self.entry_points.keys().collect::<Vec<_>>())
            .finish()
    }
}
