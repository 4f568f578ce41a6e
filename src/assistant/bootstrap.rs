//! Strategy Bootstrap
//!
//! The assistant's own building blocks (the dispatch core, version manager,
//! input processor and run mode) are strategies chosen at startup. Descriptor files in
//! per-capability folders name an implementation from the
//! [`StrategyRegistry`]; selection then follows a fixed order:
//!
//! 1. an explicitly requested name
//! 2. a descriptor marked `preferred`
//! 3. the capability's named default
//! 4. the first discovered descriptor
//! 5. the built-in default
//!
//! A request nothing can satisfy is logged and selection carries on down
//! the list.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::input::{InputProcessor, InputSettings, StandardInput, VerbatimInput};
use super::run_mode::{BatchMode, InteractiveMode, RunMode, RunSettings};
use super::{Assistant, DispatchPolicy};
use crate::plugin::discovery::{scan_descriptors, DescriptorFile, DiscoveryReport, FailedEntry};
use crate::plugin::error::{PluginError, PluginResult};
use crate::version::{TracedVersionManager, VersionManager, VersionRegistry};

/// A pluggable part of the assistant core
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Core,
    VersionManager,
    InputProcessor,
    RunMode,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Core,
        Capability::VersionManager,
        Capability::InputProcessor,
        Capability::RunMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Core => "core",
            Capability::VersionManager => "version_manager",
            Capability::InputProcessor => "input_processor",
            Capability::RunMode => "run_mode",
        }
    }

    /// Folder (under the base directory) holding this capability's descriptors
    pub fn folder(&self) -> &'static str {
        match self {
            Capability::Core => "cores",
            Capability::VersionManager => "version_managers",
            Capability::InputProcessor => "process_inputs",
            Capability::RunMode => "run",
        }
    }

    /// Name picked when nothing is requested or preferred
    pub fn default_name(&self) -> &'static str {
        match self {
            Capability::RunMode => "interactive",
            Capability::Core | Capability::VersionManager | Capability::InputProcessor => "standard",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| PluginError::strategy_error(format!("unknown capability '{}'", s)))
    }
}

fn default_enabled() -> bool {
    true
}

/// Descriptor file announcing one strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub name: String,
    pub capability: Capability,
    /// Registry key of the implementation
    pub implementation: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub preferred: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl DescriptorFile for StrategyDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }
}

/// Builds the dispatch core around the chosen version manager
pub type CoreFactory = Arc<dyn Fn(Box<dyn VersionManager>) -> Assistant + Send + Sync>;
pub type VersionManagerFactory = Arc<dyn Fn() -> Box<dyn VersionManager> + Send + Sync>;
pub type InputProcessorFactory = Arc<dyn Fn(&InputSettings) -> Box<dyn InputProcessor> + Send + Sync>;
pub type RunModeFactory = Arc<dyn Fn(&RunSettings) -> PluginResult<Box<dyn RunMode>> + Send + Sync>;

/// Compiled-in strategy implementations, keyed by name per capability
#[derive(Clone)]
pub struct StrategyRegistry {
    cores: BTreeMap<String, CoreFactory>,
    version_managers: BTreeMap<String, VersionManagerFactory>,
    input_processors: BTreeMap<String, InputProcessorFactory>,
    run_modes: BTreeMap<String, RunModeFactory>,
}

impl StrategyRegistry {
    /// Registry without any implementation
    pub fn empty() -> Self {
        Self {
            cores: BTreeMap::new(),
            version_managers: BTreeMap::new(),
            input_processors: BTreeMap::new(),
            run_modes: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in implementations
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .add_core("standard", Arc::new(Assistant::new))
            .add_core(
                "fallthrough",
                Arc::new(|versions: Box<dyn VersionManager>| Assistant::new(versions).with_dispatch_policy(DispatchPolicy::FallThrough)),
            )
            .add_version_manager("standard", Arc::new(|| Box::new(VersionRegistry::new()) as Box<dyn VersionManager>))
            .add_version_manager("traced", Arc::new(|| Box::new(TracedVersionManager::new()) as Box<dyn VersionManager>))
            .add_input_processor("standard", Arc::new(|s: &InputSettings| Box::new(StandardInput::new(s)) as Box<dyn InputProcessor>))
            .add_input_processor("verbatim", Arc::new(|s: &InputSettings| Box::new(VerbatimInput::new(s)) as Box<dyn InputProcessor>))
            .add_run_mode(
                "interactive",
                Arc::new(|s: &RunSettings| -> PluginResult<Box<dyn RunMode>> {
                    Ok(Box::new(InteractiveMode::stdio(s.clone())))
                }),
            )
            .add_run_mode(
                "batch",
                Arc::new(|s: &RunSettings| -> PluginResult<Box<dyn RunMode>> {
                    Ok(Box::new(BatchMode::from_settings(s.clone())?))
                }),
            );
        registry
    }

    pub fn add_core(&mut self, name: &str, factory: CoreFactory) -> &mut Self {
        self.cores.insert(name.to_string(), factory);
        self
    }

    pub fn add_version_manager(&mut self, name: &str, factory: VersionManagerFactory) -> &mut Self {
        self.version_managers.insert(name.to_string(), factory);
        self
    }

    pub fn add_input_processor(&mut self, name: &str, factory: InputProcessorFactory) -> &mut Self {
        self.input_processors.insert(name.to_string(), factory);
        self
    }

    pub fn add_run_mode(&mut self, name: &str, factory: RunModeFactory) -> &mut Self {
        self.run_modes.insert(name.to_string(), factory);
        self
    }

    /// Implementation names for a capability, sorted
    pub fn implementations(&self, capability: Capability) -> Vec<&str> {
        match capability {
            Capability::Core => self.cores.keys().map(String::as_str).collect(),
            Capability::VersionManager => self.version_managers.keys().map(String::as_str).collect(),
            Capability::InputProcessor => self.input_processors.keys().map(String::as_str).collect(),
            Capability::RunMode => self.run_modes.keys().map(String::as_str).collect(),
        }
    }

    pub fn has_implementation(&self, capability: Capability, name: &str) -> bool {
        match capability {
            Capability::Core => self.cores.contains_key(name),
            Capability::VersionManager => self.version_managers.contains_key(name),
            Capability::InputProcessor => self.input_processors.contains_key(name),
            Capability::RunMode => self.run_modes.contains_key(name),
        }
    }

    /// Build the dispatch core, handing it the version manager
    pub fn create_core(&self, implementation: &str, versions: Box<dyn VersionManager>) -> PluginResult<Assistant> {
        let factory = self
            .cores
            .get(implementation)
            .ok_or_else(|| unknown_implementation(Capability::Core, implementation))?;
        Ok(factory(versions))
    }

    pub fn create_version_manager(&self, implementation: &str) -> PluginResult<Box<dyn VersionManager>> {
        let factory = self
            .version_managers
            .get(implementation)
            .ok_or_else(|| unknown_implementation(Capability::VersionManager, implementation))?;
        Ok(factory())
    }

    pub fn create_input_processor(
        &self,
        implementation: &str,
        settings: &InputSettings,
    ) -> PluginResult<Box<dyn InputProcessor>> {
        let factory = self
            .input_processors
            .get(implementation)
            .ok_or_else(|| unknown_implementation(Capability::InputProcessor, implementation))?;
        Ok(factory(settings))
    }

    pub fn create_run_mode(&self, implementation: &str, settings: &RunSettings) -> PluginResult<Box<dyn RunMode>> {
        let factory = self
            .run_modes
            .get(implementation)
            .ok_or_else(|| unknown_implementation(Capability::RunMode, implementation))?;
        factory(settings)
    }

    /// Scan `base_dir/<folder>` for this capability's descriptors.
    ///
    /// Descriptors filed under the wrong capability or naming an unknown
    /// implementation are reported as failed.
    pub fn discover(&self, base_dir: &Path, capability: Capability) -> PluginResult<DiscoveryReport<StrategyDescriptor>> {
        let folder = base_dir.join(capability.folder());
        let report = scan_descriptors::<StrategyDescriptor>(&folder)?;

        Ok(report.try_map(|descriptor| {
            let file = descriptor.file_path.clone().unwrap_or_default();
            let reason = if descriptor.capability != capability {
                Some(format!(
                    "'{}' provides {} but is filed under {}",
                    descriptor.name, descriptor.capability, capability
                ))
            } else if !self.has_implementation(capability, &descriptor.implementation) {
                Some(format!(
                    "'{}' names unknown {} implementation '{}'",
                    descriptor.name, capability, descriptor.implementation
                ))
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    let error = PluginError::load_failed(file.display().to_string(), reason);
                    warn!("{}", error);
                    Err(FailedEntry { file, error })
                }
                None => Ok(descriptor),
            }
        }))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("cores", &self.implementations(Capability::Core))
            .field("version_managers", &self.implementations(Capability::VersionManager))
            .field("input_processors", &self.implementations(Capability::InputProcessor))
            .field("run_modes", &self.implementations(Capability::RunMode))
            .finish()
    }
}

fn unknown_implementation(capability: Capability, name: &str) -> PluginError {
    PluginError::strategy_error(format!("unknown {} implementation '{}'", capability, name))
}

/// How a strategy was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Requested,
    Preferred,
    NamedDefault,
    FirstDiscovered,
    Builtin,
}

/// The strategy chosen for one capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyChoice {
    pub capability: Capability,
    /// Descriptor name, or the implementation name for built-in choices
    pub name: String,
    pub implementation: String,
    pub source: SelectionSource,
}

/// Pick a strategy among discovered candidates.
///
/// A requested name matches a candidate's descriptor name first, then its
/// implementation, then any registered implementation. An unmatched request
/// is logged and ignored.
pub fn select_strategy(
    registry: &StrategyRegistry,
    capability: Capability,
    candidates: &[StrategyDescriptor],
    requested: Option<&str>,
) -> PluginResult<StrategyChoice> {
    let chosen = |d: &StrategyDescriptor, source| StrategyChoice {
        capability,
        name: d.name.clone(),
        implementation: d.implementation.clone(),
        source,
    };

    if let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) {
        if let Some(d) = candidates
            .iter()
            .find(|d| d.name == requested)
            .or_else(|| candidates.iter().find(|d| d.implementation == requested))
        {
            return Ok(chosen(d, SelectionSource::Requested));
        }
        if registry.has_implementation(capability, requested) {
            return Ok(StrategyChoice {
                capability,
                name: requested.to_string(),
                implementation: requested.to_string(),
                source: SelectionSource::Requested,
            });
        }
        warn!(
            "Requested {} '{}' is not available (known: {}); falling back",
            capability,
            requested,
            registry.implementations(capability).join(", ")
        );
    }

    if let Some(d) = candidates.iter().find(|d| d.preferred) {
        return Ok(chosen(d, SelectionSource::Preferred));
    }

    let default_name = capability.default_name();
    if let Some(d) = candidates.iter().find(|d| d.name == default_name) {
        return Ok(chosen(d, SelectionSource::NamedDefault));
    }

    if let Some(d) = candidates.first() {
        return Ok(chosen(d, SelectionSource::FirstDiscovered));
    }

    Ok(StrategyChoice {
        capability,
        name: default_name.to_string(),
        implementation: default_name.to_string(),
        source: SelectionSource::Builtin,
    })
}

/// Inputs to [`bootstrap`]
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Folder holding the strategy folders; discovery is skipped when unset
    pub base_dir: Option<PathBuf>,
    pub requested: BTreeMap<Capability, String>,
    pub input: InputSettings,
    pub run: RunSettings,
}

impl BootstrapOptions {
    pub fn request(mut self, capability: Capability, name: impl Into<String>) -> Self {
        self.requested.insert(capability, name.into());
        self
    }
}

/// The assembled strategies
pub struct Bootstrap {
    /// Dispatch core already holding the chosen version manager
    pub assistant: Assistant,
    pub input_processor: Box<dyn InputProcessor>,
    pub run_mode: Box<dyn RunMode>,
    pub choices: Vec<StrategyChoice>,
}

impl Bootstrap {
    pub fn choice(&self, capability: Capability) -> Option<&StrategyChoice> {
        self.choices.iter().find(|c| c.capability == capability)
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap").field("choices", &self.choices).finish()
    }
}

/// Choose one implementation per capability and build them
pub fn bootstrap(registry: &StrategyRegistry, options: &BootstrapOptions) -> PluginResult<Bootstrap> {
    let mut choices = Vec::with_capacity(Capability::ALL.len());

    for capability in Capability::ALL {
        let candidates = match &options.base_dir {
            Some(base_dir) => registry.discover(base_dir, capability)?.loaded,
            None => Vec::new(),
        };
        debug!("{} candidate(s) for {}", candidates.len(), capability);

        let requested = options.requested.get(&capability).map(String::as_str);
        let choice = select_strategy(registry, capability, &candidates, requested)?;
        info!(
            "Using {} '{}' (implementation '{}', {:?})",
            capability, choice.name, choice.implementation, choice.source
        );
        choices.push(choice);
    }

    let implementation = |capability: Capability| {
        choices
            .iter()
            .find(|c| c.capability == capability)
            .map(|c| c.implementation.clone())
            .unwrap_or_else(|| capability.default_name().to_string())
    };

    let version_manager = registry.create_version_manager(&implementation(Capability::VersionManager))?;
    let assistant = registry.create_core(&implementation(Capability::Core), version_manager)?;
    let input_processor = registry.create_input_processor(&implementation(Capability::InputProcessor), &options.input)?;
    let run_mode = registry.create_run_mode(&implementation(Capability::RunMode), &options.run)?;

    Ok(Bootstrap {
        assistant,
        input_processor,
        run_mode,
        choices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, implementation: &str, preferred: bool) -> StrategyDescriptor {
        StrategyDescriptor {
            name: name.to_string(),
            capability: Capability::RunMode,
            implementation: implementation.to_string(),
            enabled: true,
            preferred,
            description: String::new(),
            file_path: None,
        }
    }

    #[test]
    fn test_capability_names() {
        assert_eq!("run_mode".parse::<Capability>().unwrap(), Capability::RunMode);
        assert_eq!("core".parse::<Capability>().unwrap(), Capability::Core);
        assert!("kernel".parse::<Capability>().is_err());
        assert_eq!(Capability::Core.folder(), "cores");
        assert_eq!(Capability::InputProcessor.folder(), "process_inputs");
        assert_eq!(Capability::RunMode.default_name(), "interactive");
        assert_eq!(Capability::VersionManager.default_name(), "standard");
    }

    #[test]
    fn test_selection_order() {
        let registry = StrategyRegistry::builtin();
        let cap = Capability::RunMode;

        let none = select_strategy(&registry, cap, &[], None).unwrap();
        assert_eq!(none.source, SelectionSource::Builtin);
        assert_eq!(none.implementation, "interactive");

        let first = vec![descriptor("scripted", "batch", false), descriptor("other", "interactive", false)];
        let choice = select_strategy(&registry, cap, &first, None).unwrap();
        assert_eq!((choice.name.as_str(), choice.source), ("scripted", SelectionSource::FirstDiscovered));

        let named = vec![descriptor("scripted", "batch", false), descriptor("interactive", "interactive", false)];
        let choice = select_strategy(&registry, cap, &named, None).unwrap();
        assert_eq!(choice.source, SelectionSource::NamedDefault);

        let preferred = vec![descriptor("interactive", "interactive", false), descriptor("fast", "batch", true)];
        let choice = select_strategy(&registry, cap, &preferred, None).unwrap();
        assert_eq!((choice.name.as_str(), choice.source), ("fast", SelectionSource::Preferred));

        let choice = select_strategy(&registry, cap, &preferred, Some("interactive")).unwrap();
        assert_eq!((choice.name.as_str(), choice.source), ("interactive", SelectionSource::Requested));

        let choice = select_strategy(&registry, cap, &[], Some("batch")).unwrap();
        assert_eq!((choice.implementation.as_str(), choice.source), ("batch", SelectionSource::Requested));

        // An unmatched request falls back to the regular order
        let choice = select_strategy(&registry, cap, &preferred, Some("gui")).unwrap();
        assert_eq!((choice.name.as_str(), choice.source), ("fast", SelectionSource::Preferred));
        let choice = select_strategy(&registry, cap, &[], Some("gui")).unwrap();
        assert_eq!((choice.implementation.as_str(), choice.source), ("interactive", SelectionSource::Builtin));
    }

    #[test]
    fn test_bootstrap_without_folders_uses_builtins() {
        let registry = StrategyRegistry::builtin();
        let options = BootstrapOptions::default().request(Capability::RunMode, "batch");
        let assembled = bootstrap(&registry, &options).unwrap();

        assert_eq!(assembled.assistant.versions().implementation_name(), "standard");
        assert_eq!(assembled.assistant.dispatch_policy(), DispatchPolicy::FirstMatch);
        assert_eq!(assembled.input_processor.name(), "standard");
        assert_eq!(assembled.run_mode.name(), "batch");
        assert_eq!(assembled.choice(Capability::VersionManager).unwrap().source, SelectionSource::Builtin);
        assert_eq!(assembled.choice(Capability::RunMode).unwrap().source, SelectionSource::Requested);
    }

    #[test]
    fn test_unknown_implementation_cannot_be_created() {
        let registry = StrategyRegistry::empty();
        assert!(registry.create_version_manager("standard").is_err());
        assert!(registry
            .create_core("standard", Box::new(VersionRegistry::new()))
            .is_err());
        assert!(registry.implementations(Capability::RunMode).is_empty());
    }

    #[test]
    fn test_requested_core_wraps_version_manager() {
        let registry = StrategyRegistry::builtin();
        let options = BootstrapOptions::default()
            .request(Capability::Core, "fallthrough")
            .request(Capability::VersionManager, "traced");
        let assembled = bootstrap(&registry, &options).unwrap();

        assert_eq!(assembled.assistant.dispatch_policy(), DispatchPolicy::FallThrough);
        assert_eq!(assembled.assistant.versions().implementation_name(), "traced");
        assert_eq!(assembled.choice(Capability::Core).unwrap().source, SelectionSource::Requested);
    }
}
