//! Plugin Discovery System
//!
//! File-based discovery of plugin descriptors: scans a folder for YAML
//! descriptor files, parses and validates each one, and links it against the
//! compiled-in catalog. A file that fails at any step is reported and
//! skipped; it never aborts discovery of the others.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::catalog::PluginCatalog;
use super::compatibility::VersionCompatibilityChecker;
use super::descriptor::{LoadedPlugin, PluginDescriptor};
use super::error::{PluginError, PluginResult};

/// Descriptor extensions recognised in plugin folders
pub const DESCRIPTOR_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A descriptor type that can live in a discovery folder
pub trait DescriptorFile: DeserializeOwned {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    fn set_file_path(&mut self, path: PathBuf);
}

impl DescriptorFile for PluginDescriptor {
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

/// A descriptor left out because it is disabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    pub file: PathBuf,
}

/// A file that could not be loaded
#[derive(Debug, Clone)]
pub struct FailedEntry {
    pub file: PathBuf,
    pub error: PluginError,
}

/// Outcome of scanning one folder, each list in discovery order
#[derive(Debug, Clone)]
pub struct DiscoveryReport<T> {
    pub loaded: Vec<T>,
    pub skipped: Vec<SkippedEntry>,
    pub failed: Vec<FailedEntry>,
}

impl<T> DiscoveryReport<T> {
    pub fn new() -> Self {
        Self {
            loaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }

    /// Map loaded entries, moving failures of `f` into `failed`
    pub fn try_map<U, F>(self, mut f: F) -> DiscoveryReport<U>
    where
        F: FnMut(T) -> Result<U, FailedEntry>,
    {
        let mut report = DiscoveryReport {
            loaded: Vec::with_capacity(self.loaded.len()),
            skipped: self.skipped,
            failed: self.failed,
        };
        for item in self.loaded {
            match f(item) {
                Ok(mapped) => report.loaded.push(mapped),
                Err(failure) => report.failed.push(failure),
            }
        }
        report
    }
}

impl<T> Default for DiscoveryReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Plugin discovery trait for finding and loading plugins
pub trait PluginDiscovery {
    /// Discover and link every enabled plugin
    fn discover(&self, catalog: &PluginCatalog) -> PluginResult<DiscoveryReport<LoadedPlugin>>;

    /// Get the plugin directory being scanned
    fn plugin_directory(&self) -> &Path;
}

/// File-based plugin discovery implementation
#[derive(Debug)]
pub struct FileBasedDiscovery {
    plugin_directory: PathBuf,
    parser: PluginDescriptorParser,
}

impl FileBasedDiscovery {
    pub fn new<P: AsRef<Path>>(plugin_directory: P) -> Self {
        Self {
            plugin_directory: plugin_directory.as_ref().to_path_buf(),
            parser: PluginDescriptorParser::new(),
        }
    }

    pub fn with_parser<P: AsRef<Path>>(plugin_directory: P, parser: PluginDescriptorParser) -> Self {
        Self {
            plugin_directory: plugin_directory.as_ref().to_path_buf(),
            parser,
        }
    }
}

impl PluginDiscovery for FileBasedDiscovery {
    fn discover(&self, catalog: &PluginCatalog) -> PluginResult<DiscoveryReport<LoadedPlugin>> {
        let report = scan_descriptors::<PluginDescriptor>(&self.plugin_directory)?;

        let report = report.try_map(|descriptor| {
            let file = descriptor.file_path.clone().unwrap_or_default();
            self.parser
                .validate_descriptor(&descriptor)
                .and_then(|_| descriptor.link(catalog))
                .map_err(|e| {
                    let error = PluginError::load_failed(file.display().to_string(), e.to_string());
                    warn!("{}", error);
                    FailedEntry { file, error }
                })
        });

        info!(
            "Discovered {} plugin(s) in {} ({} disabled, {} failed)",
            report.loaded.len(),
            self.plugin_directory.display(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn plugin_directory(&self) -> &Path {
        &self.plugin_directory
    }
}

/// Parser for plugin descriptor files
#[derive(Debug, Default)]
pub struct PluginDescriptorParser {
    checker: VersionCompatibilityChecker,
}

impl PluginDescriptorParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(checker: VersionCompatibilityChecker) -> Self {
        Self { checker }
    }

    /// Parse a YAML string into a plugin descriptor
    pub fn parse_yaml(&self, yaml_content: &str) -> PluginResult<PluginDescriptor> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| PluginError::descriptor_parse_error(format!("Failed to parse YAML: {}", e)))
    }

    /// Validate a plugin descriptor
    pub fn validate_descriptor(&self, descriptor: &PluginDescriptor) -> PluginResult<()> {
        if descriptor.name.trim().is_empty() {
            return Err(PluginError::descriptor_parse_error("Plugin name cannot be empty"));
        }

        for entry in &descriptor.methods {
            if entry.entity.is_empty() || entry.method.is_empty() || entry.version.is_empty() {
                return Err(PluginError::descriptor_parse_error(format!(
                    "Method entry '{}.{}' needs an entity, a method and a version",
                    entry.entity, entry.method
                )));
            }
        }

        for entry in &descriptor.classes {
            if entry.entity.is_empty() || entry.version.is_empty() {
                return Err(PluginError::descriptor_parse_error(format!(
                    "Class entry '{}' needs an entity and a version",
                    entry.class
                )));
            }
        }

        if descriptor.entry_point.as_deref() == Some("") {
            return Err(PluginError::descriptor_parse_error("Entry point cannot be empty"));
        }

        self.checker.check_descriptor(descriptor)
    }
}

/// List descriptor files in `folder`, sorted by file name.
///
/// The folder is created when missing.
pub fn descriptor_files(folder: &Path) -> PluginResult<Vec<PathBuf>> {
    if !folder.exists() {
        debug!("Creating plugin folder {}", folder.display());
        fs::create_dir_all(folder).map_err(|e| {
            PluginError::discovery_error(format!("Failed to create directory {}: {}", folder.display(), e))
        })?;
    }

    if !folder.is_dir() {
        return Err(PluginError::discovery_error(format!(
            "Plugin path is not a directory: {}",
            folder.display()
        )));
    }

    let entries = fs::read_dir(folder).map_err(|e| {
        PluginError::discovery_error(format!("Failed to read directory {}: {}", folder.display(), e))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_descriptor_extension(path))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn has_descriptor_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| DESCRIPTOR_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Read and parse one descriptor file
pub fn read_descriptor<D: DescriptorFile>(path: &Path) -> PluginResult<D> {
    let content = fs::read_to_string(path)
        .map_err(|e| PluginError::load_failed(path.display().to_string(), e.to_string()))?;
    let mut descriptor: D = serde_yaml::from_str(&content)
        .map_err(|e| PluginError::load_failed(path.display().to_string(), e.to_string()))?;
    descriptor.set_file_path(path.to_path_buf());
    Ok(descriptor)
}

/// Scan a folder for descriptors of type `D`.
///
/// Unreadable or malformed files land in `failed`, disabled ones in
/// `skipped`. Only a folder that cannot be created or listed is an error.
pub fn scan_descriptors<D: DescriptorFile>(folder: &Path) -> PluginResult<DiscoveryReport<D>> {
    let mut report = DiscoveryReport::new();

    for file in descriptor_files(folder)? {
        match read_descriptor::<D>(&file) {
            Ok(descriptor) if !descriptor.enabled() => {
                debug!("Skipping disabled descriptor '{}' ({})", descriptor.name(), file.display());
                report.skipped.push(SkippedEntry {
                    name: descriptor.name().to_string(),
                    file,
                });
            }
            Ok(descriptor) => {
                debug!("Loaded descriptor '{}' from {}", descriptor.name(), file.display());
                report.loaded.push(descriptor);
            }
            Err(error) => {
                warn!("{}", error);
                report.failed.push(FailedEntry { file, error });
            }
        }
    }

    Ok(report)
}

/// State of a descriptor on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorState {
    Enabled,
    Disabled,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorStatus {
    pub name: String,
    pub file: PathBuf,
    pub description: String,
    pub state: DescriptorState,
}

/// Report every plugin descriptor in `folder` with its state
pub fn list_descriptors(folder: &Path) -> PluginResult<Vec<DescriptorStatus>> {
    let parser = PluginDescriptorParser::new();
    let statuses = descriptor_files(folder)?
        .into_iter()
        .map(|file| {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match read_descriptor::<PluginDescriptor>(&file).and_then(|d| parser.validate_descriptor(&d).map(|_| d)) {
                Ok(descriptor) => DescriptorStatus {
                    name: descriptor.name.clone(),
                    description: descriptor.description.clone(),
                    state: if descriptor.enabled { DescriptorState::Enabled } else { DescriptorState::Disabled },
                    file,
                },
                Err(e) => DescriptorStatus {
                    name: stem,
                    description: String::new(),
                    state: DescriptorState::Invalid(e.to_string()),
                    file,
                },
            }
        })
        .collect();
    Ok(statuses)
}

/// Rewrite the `enabled` flag of the descriptor named `name`.
///
/// Other fields of the file are kept. Takes effect at next startup.
pub fn set_enabled(folder: &Path, name: &str, enabled: bool) -> PluginResult<PathBuf> {
    for file in descriptor_files(folder)? {
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(_) => continue,
        };
        let mut document: serde_yaml::Value = match serde_yaml::from_str(&content) {
            Ok(document) => document,
            Err(_) => continue,
        };

        let Some(mapping) = document.as_mapping_mut() else {
            continue;
        };
        let matches = mapping
            .get("name")
            .and_then(|v| v.as_str())
            .map(|n| n == name)
            .unwrap_or(false);
        if !matches {
            continue;
        }

        mapping.insert(serde_yaml::Value::from("enabled"), serde_yaml::Value::from(enabled));
        let updated = serde_yaml::to_string(&document)?;
        fs::write(&file, updated)?;
        info!(
            "Plugin '{}' {} in {}",
            name,
            if enabled { "enabled" } else { "disabled" },
            file.display()
        );
        return Ok(file);
    }

    Err(PluginError::not_found(format!("plugin '{}' in {}", name, folder.display())))
}

/// Write `descriptor` as YAML to `path` unless the file already exists.
///
/// Returns whether a file was written.
pub fn write_descriptor_if_absent<D: Serialize>(path: &Path, descriptor: &D) -> PluginResult<bool> {
    if path.exists() {
        debug!("Keeping existing descriptor {}", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(descriptor)?)?;
    info!("Wrote descriptor {}", path.display());
    Ok(true)
}
