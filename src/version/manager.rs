//! Version manager capability
//!
//! [`VersionManager`] is the abstract capability the assistant core depends
//! on. [`VersionRegistry`](super::VersionRegistry) is the standard
//! implementation; [`TracedVersionManager`] wraps it and logs every call.

use log::info;
use serde_json::Value;

use super::binding::{ClassFactory, MergeMode, MethodBinding, MethodFn, PluginObject};
use super::registry::{VersionRegistry, VersionSummary};
use crate::plugin::error::{PluginError, PluginResult};

/// Which versions a method lookup should consult
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionSelector {
    /// The manager's current version
    #[default]
    Current,
    /// A single named version
    Named(String),
    /// Several versions, aggregated by version name
    Many(Vec<String>),
}

impl VersionSelector {
    /// Build a selector from an optional comma separated list
    /// (`None` → current, `"v1"` → named, `"v1,v2"` → many)
    pub fn parse(spec: Option<&str>) -> Self {
        match spec.map(str::trim).filter(|s| !s.is_empty()) {
            None => VersionSelector::Current,
            Some(spec) if spec.contains(',') => VersionSelector::Many(
                spec.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Some(spec) => VersionSelector::Named(spec.to_string()),
        }
    }
}

impl From<&str> for VersionSelector {
    fn from(name: &str) -> Self {
        VersionSelector::Named(name.to_string())
    }
}

impl From<Vec<String>> for VersionSelector {
    fn from(names: Vec<String>) -> Self {
        VersionSelector::Many(names)
    }
}

impl From<Vec<&str>> for VersionSelector {
    fn from(names: Vec<&str>) -> Self {
        VersionSelector::Many(names.into_iter().map(String::from).collect())
    }
}

/// Method found by a lookup, ready to invoke
pub struct ResolvedMethod {
    entity: String,
    method: String,
    shape: Resolution,
}

enum Resolution {
    Direct(MethodBinding),
    PerVersion(Vec<(String, MethodBinding)>),
}

impl ResolvedMethod {
    pub(crate) fn direct(entity: &str, method: &str, binding: MethodBinding) -> Self {
        Self {
            entity: entity.to_string(),
            method: method.to_string(),
            shape: Resolution::Direct(binding),
        }
    }

    pub(crate) fn per_version(
        entity: &str,
        method: &str,
        bindings: Vec<(String, MethodBinding)>,
    ) -> Self {
        Self {
            entity: entity.to_string(),
            method: method.to_string(),
            shape: Resolution::PerVersion(bindings),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Versions contributing to this resolution (empty for a direct lookup)
    pub fn versions(&self) -> Vec<&str> {
        match &self.shape {
            Resolution::Direct(_) => Vec::new(),
            Resolution::PerVersion(bindings) => bindings.iter().map(|(v, _)| v.as_str()).collect(),
        }
    }

    /// Invoke the resolved method.
    ///
    /// A direct lookup returns the binding's own result. A multi-version
    /// lookup returns an object keyed by version name; a multi binding's
    /// results are kept together as an array under its version key.
    pub fn invoke(&self, args: &[Value]) -> PluginResult<Value> {
        match &self.shape {
            Resolution::Direct(binding) => binding.invoke(args),
            Resolution::PerVersion(bindings) => {
                let mut results = serde_json::Map::new();
                for (version, binding) in bindings {
                    results.insert(version.clone(), binding.invoke(args)?);
                }
                Ok(Value::Object(results))
            }
        }
    }
}

/// Class found by a lookup
pub struct ResolvedClass {
    entity: String,
    version: String,
    factory: ClassFactory,
}

impl ResolvedClass {
    pub(crate) fn new(entity: &str, version: &str, factory: ClassFactory) -> Self {
        Self {
            entity: entity.to_string(),
            version: version.to_string(),
            factory,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Create a fresh instance
    pub fn instantiate(&self) -> Box<dyn PluginObject> {
        (self.factory)()
    }
}

/// Store of named versions of method and class bindings
pub trait VersionManager: Send {
    /// Short name of this implementation (for logging)
    fn implementation_name(&self) -> &'static str;

    /// Register a method binding under `version`, creating the version if needed
    fn register_method(
        &mut self,
        entity: &str,
        method: &str,
        version: &str,
        callable: MethodFn,
        description: &str,
        mode: MergeMode,
    ) -> PluginResult<()>;

    /// Register a method with a textual merge mode.
    ///
    /// The mode is validated before anything is touched.
    fn register_method_str(
        &mut self,
        entity: &str,
        method: &str,
        version: &str,
        callable: MethodFn,
        description: &str,
        mode: &str,
    ) -> PluginResult<()> {
        let mode: MergeMode = mode.parse()?;
        self.register_method(entity, method, version, callable, description, mode)
    }

    /// Register (or overwrite) a class binding
    fn register_class(&mut self, entity: &str, version: &str, factory: ClassFactory) -> PluginResult<()>;

    /// Look up a method; `None` when no consulted version binds it
    fn resolve_method(&self, entity: &str, method: &str, selector: &VersionSelector) -> Option<ResolvedMethod>;

    /// Look up a class in `version` or the current version
    fn resolve_class(&self, entity: &str, version: Option<&str>) -> Option<ResolvedClass>;

    /// Make an existing version current
    fn switch_version(&mut self, name: &str) -> bool;

    fn current_version(&self) -> &str;

    /// Version names in creation order
    fn version_names(&self) -> Vec<String>;

    fn has_version(&self, name: &str) -> bool {
        self.version_names().iter().any(|v| v == name)
    }

    /// Set the description of an existing version
    fn describe_version(&mut self, name: &str, description: &str) -> bool;

    fn version_summary(&self, name: &str) -> Option<VersionSummary>;

    /// Move every version out, leaving a fresh registry behind.
    ///
    /// Together with [`adopt_registry`](Self::adopt_registry) this lets one
    /// implementation replace another mid-session without losing bindings.
    fn take_registry(&mut self) -> VersionRegistry;

    /// Replace all versions (and the current version) with `registry`
    fn adopt_registry(&mut self, registry: VersionRegistry);

    /// Resolve and invoke in one step, turning a miss into [`PluginError::NotFound`]
    fn call(&self, entity: &str, method: &str, selector: &VersionSelector, args: &[Value]) -> PluginResult<Value> {
        match self.resolve_method(entity, method, selector) {
            Some(resolved) => resolved.invoke(args),
            None => Err(PluginError::not_found(format!(
                "{}.{} ({})",
                entity,
                method,
                describe_selector(selector, self.current_version())
            ))),
        }
    }
}

/// Human readable form of a selector
pub fn describe_selector(selector: &VersionSelector, current: &str) -> String {
    match selector {
        VersionSelector::Current => current.to_string(),
        VersionSelector::Named(name) => name.clone(),
        VersionSelector::Many(names) => names.join(", "),
    }
}

/// Version manager that logs every registration, lookup and switch
#[derive(Debug, Default)]
pub struct TracedVersionManager {
    inner: VersionRegistry,
}

impl TracedVersionManager {
    pub fn new() -> Self {
        Self { inner: VersionRegistry::new() }
    }
}

impl VersionManager for TracedVersionManager {
    fn implementation_name(&self) -> &'static str {
        "traced"
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
        info!("register method {}.{} ({}) mode={}", entity, method, version, mode);
        self.inner.register_method(entity, method, version, callable, description, mode)
    }

    fn register_class(&mut self, entity: &str, version: &str, factory: ClassFactory) -> PluginResult<()> {
        info!("register class {} ({})", entity, version);
        self.inner.register_class(entity, version, factory)
    }

    fn resolve_method(&self, entity: &str, method: &str, selector: &VersionSelector) -> Option<ResolvedMethod> {
        let resolved = self.inner.resolve_method(entity, method, selector);
        info!(
            "resolve method {}.{} ({}) -> {}",
            entity,
            method,
            describe_selector(selector, self.inner.current_version()),
            if resolved.is_some() { "found" } else { "missing" }
        );
        resolved
    }

    fn resolve_class(&self, entity: &str, version: Option<&str>) -> Option<ResolvedClass> {
        let resolved = self.inner.resolve_class(entity, version);
        info!(
            "resolve class {} ({}) -> {}",
            entity,
            version.unwrap_or(self.inner.current_version()),
            if resolved.is_some() { "found" } else { "missing" }
        );
        resolved
    }

    fn switch_version(&mut self, name: &str) -> bool {
        let switched = self.inner.switch_version(name);
        info!("switch version to '{}': {}", name, if switched { "ok" } else { "unknown version" });
        switched
    }

    fn current_version(&self) -> &str {
        self.inner.current_version()
    }

    fn version_names(&self) -> Vec<String> {
        self.inner.version_names()
    }

    fn describe_version(&mut self, name: &str, description: &str) -> bool {
        self.inner.describe_version(name, description)
    }

    fn version_summary(&self, name: &str) -> Option<VersionSummary> {
        self.inner.version_summary(name)
    }

    fn take_registry(&mut self) -> VersionRegistry {
        info!("hand over {} version(s)", self.inner.version_count());
        std::mem::take(&mut self.inner)
    }

    fn adopt_registry(&mut self, registry: VersionRegistry) {
        info!(
            "adopt {} version(s), current '{}'",
            registry.version_count(),
            registry.current_version()
        );
        self.inner = registry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::binding::method_fn;
    use serde_json::json;

    #[test]
    fn test_selector_parsing() {
        assert_eq!(VersionSelector::parse(None), VersionSelector::Current);
        assert_eq!(VersionSelector::parse(Some("  ")), VersionSelector::Current);
        assert_eq!(VersionSelector::parse(Some("v1")), VersionSelector::Named("v1".to_string()));
        assert_eq!(
            VersionSelector::parse(Some("v1, v2,")),
            VersionSelector::Many(vec!["v1".to_string(), "v2".to_string()])
        );
    }

    #[test]
    fn test_traced_manager_delegates() {
        let mut manager = TracedVersionManager::new();
        manager
            .register_method("Echo", "say", "v1", method_fn(|args| Ok(args[0].clone())), "", MergeMode::Replace)
            .unwrap();

        assert!(manager.has_version("v1"));
        assert!(manager.resolve_method("Echo", "say", &VersionSelector::Current).is_none());
        assert!(manager.switch_version("v1"));
        assert_eq!(manager.call("Echo", "say", &VersionSelector::Current, &[json!("hi")]).unwrap(), json!("hi"));
        assert_eq!(manager.implementation_name(), "traced");
    }

    #[test]
    fn test_call_miss_is_not_found() {
        let manager = VersionRegistry::new();
        let err = manager.call("Unknown", "thing", &VersionSelector::Current, &[]).unwrap_err();
        assert!(matches!(err, PluginError::NotFound { .. }));
        assert!(err.to_string().contains("Unknown.thing (default)"));
    }

    #[test]
    fn test_registry_handover_keeps_bindings() {
        let mut standard = VersionRegistry::new();
        standard
            .register_method("Echo", "say", "v2", method_fn(|_| Ok(json!("v2"))), "", MergeMode::Replace)
            .unwrap();
        assert!(standard.switch_version("v2"));

        let mut traced = TracedVersionManager::new();
        traced.adopt_registry(standard.take_registry());

        assert_eq!(traced.current_version(), "v2");
        assert_eq!(traced.call("Echo", "say", &VersionSelector::Current, &[]).unwrap(), json!("v2"));
        // The giver is left with a fresh registry
        assert_eq!(standard.version_names(), vec!["default".to_string()]);
        assert_eq!(standard.current_version(), "default");
    }
}
