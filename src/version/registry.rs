//! Version Registry
//!
//! In-memory store of named versions. Each version maps entity names to
//! method bindings and class factories. Versions are created on first
//! reference and never removed; `"default"` always exists.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::Serialize;

use super::binding::{ClassFactory, MergeMode, MethodBinding, MethodFn};
use super::manager::{ResolvedClass, ResolvedMethod, VersionManager, VersionSelector};
use crate::plugin::error::PluginResult;

/// Name of the version that always exists
pub const DEFAULT_VERSION: &str = "default";

/// A named snapshot of method and class bindings
pub struct Version {
    name: String,
    description: String,
    methods: BTreeMap<String, BTreeMap<String, MethodBinding>>,
    classes: BTreeMap<String, ClassFactory>,
}

impl Version {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            methods: BTreeMap::new(),
            classes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn method(&self, entity: &str, method: &str) -> Option<&MethodBinding> {
        self.methods.get(entity).and_then(|m| m.get(method))
    }

    pub fn class(&self, entity: &str) -> Option<&ClassFactory> {
        self.classes.get(entity)
    }

    fn summary(&self) -> VersionSummary {
        let methods = self.methods
            .iter()
            .flat_map(|(entity, methods)| {
                methods.iter().map(move |(name, binding)| MethodSummary {
                    entity: entity.clone(),
                    method: name.clone(),
                    description: binding.description().to_string(),
                    callables: binding.callable_count(),
                })
            })
            .collect();

        VersionSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            methods,
            classes: self.classes.keys().cloned().collect(),
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("methods", &self.methods)
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Introspection view of one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub name: String,
    pub description: String,
    pub methods: Vec<MethodSummary>,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub entity: String,
    pub method: String,
    pub description: String,
    pub callables: usize,
}

/// Standard [`VersionManager`] implementation
#[derive(Debug)]
pub struct VersionRegistry {
    /// Versions in creation order
    versions: Vec<Version>,
    current_version: String,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self {
            versions: vec![Version::new(DEFAULT_VERSION, "Default")],
            current_version: DEFAULT_VERSION.to_string(),
        }
    }

    pub fn version(&self, name: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.name == name)
    }

    fn version_mut(&mut self, name: &str) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.name == name)
    }

    fn ensure_version(&mut self, name: &str) -> &mut Version {
        let index = match self.versions.iter().position(|v| v.name == name) {
            Some(index) => index,
            None => {
                debug!("Creating version '{}'", name);
                self.versions.push(Version::new(name, ""));
                self.versions.len() - 1
            }
        };
        &mut self.versions[index]
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionManager for VersionRegistry {
    fn implementation_name(&self) -> &'static str {
        "standard"
    }

    fn register_method(
        &mut self,
        entity: &str,
        method: &str,
        version: &str,
        callable: MethodFn,
        description: &str,
        mode: MergeMode,
    ) -> PluginResult<()> {
        let methods = self.ensure_version(version)
            .methods
            .entry(entity.to_string())
            .or_default();

        let existing = methods.remove(method);
        let binding = MethodBinding::merge(existing, callable, description, mode);
        debug!(
            "Registered {}.{} in version '{}' ({}, {} callable(s))",
            entity, method, version, mode, binding.callable_count()
        );
        methods.insert(method.to_string(), binding);
        Ok(())
    }

    fn register_class(&mut self, entity: &str, version: &str, factory: ClassFactory) -> PluginResult<()> {
        self.ensure_version(version)
            .classes
            .insert(entity.to_string(), factory);
        debug!("Registered class {} in version '{}'", entity, version);
        Ok(())
    }

    fn resolve_method(&self, entity: &str, method: &str, selector: &VersionSelector) -> Option<ResolvedMethod> {
        match selector {
            VersionSelector::Current => self.version(&self.current_version)
                .and_then(|v| v.method(entity, method))
                .map(|b| ResolvedMethod::direct(entity, method, b.clone())),
            VersionSelector::Named(name) => self.version(name)
                .and_then(|v| v.method(entity, method))
                .map(|b| ResolvedMethod::direct(entity, method, b.clone())),
            VersionSelector::Many(names) => {
                let mut found: Vec<(String, MethodBinding)> = Vec::new();
                for name in names {
                    if found.iter().any(|(v, _)| v == name) {
                        continue;
                    }
                    if let Some(binding) = self.version(name).and_then(|v| v.method(entity, method)) {
                        found.push((name.clone(), binding.clone()));
                    }
                }
                if found.is_empty() {
                    None
                } else {
                    Some(ResolvedMethod::per_version(entity, method, found))
                }
            }
        }
    }

    fn resolve_class(&self, entity: &str, version: Option<&str>) -> Option<ResolvedClass> {
        let version = version.unwrap_or(&self.current_version);
        self.version(version)
            .and_then(|v| v.class(entity))
            .map(|factory| ResolvedClass::new(entity, version, factory.clone()))
    }

    fn switch_version(&mut self, name: &str) -> bool {
        if self.version(name).is_some() {
            debug!("Switching current version from '{}' to '{}'", self.current_version, name);
            self.current_version = name.to_string();
            true
        } else {
            false
        }
    }

    fn current_version(&self) -> &str {
        &self.current_version
    }

    fn version_names(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.name.clone()).collect()
    }

    fn has_version(&self, name: &str) -> bool {
        self.version(name).is_some()
    }

    fn describe_version(&mut self, name: &str, description: &str) -> bool {
        match self.version_mut(name) {
            Some(version) => {
                version.description = description.to_string();
                true
            }
            None => false,
        }
    }

    fn version_summary(&self, name: &str) -> Option<VersionSummary> {
        self.version(name).map(Version::summary)
    }

    fn take_registry(&mut self) -> VersionRegistry {
        std::mem::take(self)
    }

    fn adopt_registry(&mut self, registry: VersionRegistry) {
        *self = registry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::error::PluginError;
    use crate::version::binding::{class_factory, method_fn, PluginObject};
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn add() -> MethodFn {
        method_fn(|args| {
            let a = args.first().and_then(Value::as_i64).unwrap_or(0);
            let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(a + b))
        })
    }

    fn tagged(tag: &'static str) -> MethodFn {
        method_fn(move |args| Ok(json!(format!("{}:{}", tag, args.first().and_then(Value::as_str).unwrap_or("")))))
    }

    struct Counter {
        count: i64,
    }

    impl PluginObject for Counter {
        fn call(&mut self, method: &str, _args: &[Value]) -> PluginResult<Value> {
            match method {
                "bump" => {
                    self.count += 1;
                    Ok(json!(self.count))
                }
                other => Err(PluginError::not_found(other)),
            }
        }
    }

    #[test]
    fn test_default_version_exists() {
        let registry = VersionRegistry::new();
        assert_eq!(registry.current_version(), DEFAULT_VERSION);
        assert_eq!(registry.version_names(), vec!["default".to_string()]);
        assert_eq!(registry.version(DEFAULT_VERSION).unwrap().description(), "Default");
    }

    #[test]
    fn test_resolve_and_call_current_version() {
        let mut registry = VersionRegistry::new();
        registry.register_method("Calc", "add", "default", add(), "", MergeMode::Replace).unwrap();

        let resolved = registry.resolve_method("Calc", "add", &VersionSelector::Current).unwrap();
        assert_eq!(resolved.invoke(&[json!(2), json!(3)]).unwrap(), json!(5));
    }

    #[test]
    fn test_replace_keeps_single_binding() {
        let mut registry = VersionRegistry::new();
        registry.register_method("KB", "search", "default", tagged("first"), "a", MergeMode::Replace).unwrap();
        registry.register_method("KB", "search", "default", tagged("second"), "b", MergeMode::Replace).unwrap();

        let binding = registry.version("default").unwrap().method("KB", "search").unwrap();
        assert_eq!(binding.callable_count(), 1);
        assert_eq!(binding.description(), "b");
        assert_eq!(binding.invoke(&[json!("x")]).unwrap(), json!("second:x"));
    }

    #[test]
    fn test_append_returns_pair() {
        let mut registry = VersionRegistry::new();
        registry.register_method("KB", "search", "default", tagged("f1"), "one", MergeMode::Replace).unwrap();
        registry.register_method("KB", "search", "default", tagged("f2"), "two", MergeMode::Append).unwrap();

        let result = registry.call("KB", "search", &VersionSelector::Current, &[json!("x")]).unwrap();
        assert_eq!(result, json!(["f1:x", "f2:x"]));
        let summary = registry.version_summary("default").unwrap();
        assert_eq!(summary.methods[0].description, "one + two");
    }

    #[test]
    fn test_multi_invokes_all_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = VersionRegistry::new();
        for tag in ["a", "b", "c"] {
            let calls = Arc::clone(&calls);
            let f = method_fn(move |_| {
                calls.lock().unwrap().push(tag);
                Ok(json!(tag))
            });
            registry.register_method("Log", "write", "default", f, tag, MergeMode::Multi).unwrap();
        }

        let result = registry.call("Log", "write", &VersionSelector::Current, &[]).unwrap();
        assert_eq!(result, json!(["a", "b", "c"]));
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_version_isolation() {
        let mut registry = VersionRegistry::new();
        registry.register_method("Calc", "add", "v1", add(), "", MergeMode::Replace).unwrap();

        assert!(registry.resolve_method("Calc", "add", &VersionSelector::Current).is_none());
        assert!(registry.resolve_method("Calc", "add", &"default".into()).is_none());
        assert!(registry.resolve_method("Calc", "add", &"v1".into()).is_some());

        registry.register_method("Calc", "sub", "default", add(), "", MergeMode::Replace).unwrap();
        assert!(registry.resolve_method("Calc", "sub", &"v1".into()).is_none());
    }

    #[test]
    fn test_switch_version() {
        let mut registry = VersionRegistry::new();
        registry.register_method("Calc", "add", "v1", add(), "", MergeMode::Replace).unwrap();

        assert!(!registry.switch_version("nonexistent"));
        assert_eq!(registry.current_version(), "default");

        assert!(registry.switch_version("v1"));
        assert_eq!(registry.current_version(), "v1");
        assert!(registry.resolve_method("Calc", "add", &VersionSelector::Current).is_some());
    }

    #[test]
    fn test_many_versions_aggregate_by_name() {
        let mut registry = VersionRegistry::new();
        registry.register_method("KB", "search", "default", tagged("d"), "", MergeMode::Replace).unwrap();
        registry.register_method("KB", "search", "v1", tagged("v1"), "", MergeMode::Replace).unwrap();

        let selector: VersionSelector = vec!["default", "v1", "missing"].into();
        let resolved = registry.resolve_method("KB", "search", &selector).unwrap();
        assert_eq!(resolved.versions(), vec!["default", "v1"]);
        assert_eq!(
            resolved.invoke(&[json!("q")]).unwrap(),
            json!({"default": "d:q", "v1": "v1:q"})
        );
    }

    #[test]
    fn test_many_versions_keep_multi_results_together() {
        let mut registry = VersionRegistry::new();
        registry.register_method("KB", "search", "v1", tagged("a"), "", MergeMode::Multi).unwrap();
        registry.register_method("KB", "search", "v1", tagged("b"), "", MergeMode::Multi).unwrap();
        registry.register_method("KB", "search", "v2", tagged("c"), "", MergeMode::Replace).unwrap();

        let selector: VersionSelector = vec!["v1", "v2"].into();
        let result = registry.call("KB", "search", &selector, &[json!("q")]).unwrap();
        assert_eq!(result, json!({"v1": ["a:q", "b:q"], "v2": "c:q"}));
    }

    #[test]
    fn test_resolution_miss_is_none() {
        let registry = VersionRegistry::new();
        assert!(registry.resolve_method("Unknown", "thing", &VersionSelector::Current).is_none());
        assert!(registry.resolve_method("Unknown", "thing", &vec!["a", "b"].into()).is_none());
        assert!(registry.resolve_class("Unknown", None).is_none());
    }

    #[test]
    fn test_invalid_mode_does_not_create_version() {
        let mut registry = VersionRegistry::new();
        let err = registry
            .register_method_str("Calc", "add", "v9", add(), "", "merge")
            .unwrap_err();

        assert!(matches!(err, PluginError::InvalidMergeMode { .. }));
        assert!(!registry.has_version("v9"));
        assert_eq!(registry.version_count(), 1);
    }

    #[test]
    fn test_class_registration_overwrites() {
        let mut registry = VersionRegistry::new();
        let built = Arc::new(AtomicUsize::new(0));

        registry.register_class("Counter", "default", class_factory(|| Box::new(Counter { count: 0 }))).unwrap();
        let built_clone = Arc::clone(&built);
        registry.register_class("Counter", "default", class_factory(move || {
            built_clone.fetch_add(1, Ordering::SeqCst);
            Box::new(Counter { count: 100 })
        })).unwrap();

        let class = registry.resolve_class("Counter", None).unwrap();
        let mut instance = class.instantiate();
        assert_eq!(instance.call("bump", &[]).unwrap(), json!(101));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(instance.call("missing", &[]).is_err());
    }

    #[test]
    fn test_describe_version() {
        let mut registry = VersionRegistry::new();
        registry.register_class("Counter", "advanced", class_factory(|| Box::new(Counter { count: 0 }))).unwrap();

        assert!(registry.describe_version("advanced", "Experimental"));
        assert!(!registry.describe_version("missing", "nope"));
        let summary = registry.version_summary("advanced").unwrap();
        assert_eq!(summary.description, "Experimental");
        assert_eq!(summary.classes, vec!["Counter".to_string()]);
        assert_eq!(registry.version_names(), vec!["default".to_string(), "advanced".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_multi_preserves_registration_order(tags in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
            let mut registry = VersionRegistry::new();
            for tag in &tags {
                let value = json!(tag);
                registry
                    .register_method("P", "m", "default", method_fn(move |_| Ok(value.clone())), "", MergeMode::Multi)
                    .unwrap();
            }

            let result = registry.call("P", "m", &VersionSelector::Current, &[]).unwrap();
            let expected = if tags.len() == 1 { json!(tags[0]) } else { json!(tags) };
            prop_assert_eq!(result, expected);
        }

        #[test]
        fn prop_replace_keeps_last(values in proptest::collection::vec(any::<i64>(), 1..8)) {
            let mut registry = VersionRegistry::new();
            for v in &values {
                let v = *v;
                registry
                    .register_method("P", "m", "default", method_fn(move |_| Ok(json!(v))), "", MergeMode::Replace)
                    .unwrap();
            }

            let binding = registry.version("default").unwrap().method("P", "m").unwrap();
            prop_assert_eq!(binding.callable_count(), 1);
            prop_assert_eq!(binding.invoke(&[]).unwrap(), json!(values[values.len() - 1]));
        }
    }
}
