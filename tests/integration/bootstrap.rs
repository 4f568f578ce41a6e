//! Strategy Bootstrap Integration Tests
//!
//! Strategy descriptors on disk decide which core, version manager, input
//! processor and run mode the assistant is assembled from.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use vassist::assistant::{bootstrap, BootstrapOptions, Capability, DispatchPolicy, SelectionSource, StrategyRegistry};
use vassist::plugin::builtin;

fn write_strategy(base_dir: &Path, capability: Capability, file: &str, content: &str) {
    let folder = base_dir.join(capability.folder());
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join(file), content).unwrap();
}

fn options(base_dir: &Path) -> BootstrapOptions {
    BootstrapOptions {
        base_dir: Some(base_dir.to_path_buf()),
        ..BootstrapOptions::default()
    }
}

#[test]
fn test_sample_folders_select_named_defaults() {
    let temp_dir = TempDir::new().unwrap();
    builtin::write_sample_strategies(temp_dir.path()).unwrap();

    let parts = bootstrap(&StrategyRegistry::builtin(), &options(temp_dir.path())).unwrap();

    assert_eq!(parts.assistant.versions().implementation_name(), "standard");
    assert_eq!(parts.assistant.dispatch_policy(), DispatchPolicy::FirstMatch);
    assert_eq!(parts.input_processor.name(), "standard");
    assert_eq!(parts.run_mode.name(), "interactive");
    for capability in Capability::ALL {
        assert_eq!(parts.choice(capability).unwrap().source, SelectionSource::NamedDefault);
    }
}

#[test]
fn test_preferred_descriptor_wins_over_default() {
    let temp_dir = TempDir::new().unwrap();
    builtin::write_sample_strategies(temp_dir.path()).unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::VersionManager,
        "traced.yaml",
        "name: traced\ncapability: version_manager\nimplementation: traced\npreferred: true\n",
    );

    let parts = bootstrap(&StrategyRegistry::builtin(), &options(temp_dir.path())).unwrap();

    assert_eq!(parts.assistant.versions().implementation_name(), "traced");
    assert_eq!(
        parts.choice(Capability::VersionManager).unwrap().source,
        SelectionSource::Preferred
    );
}

#[test]
fn test_request_overrides_preference() {
    let temp_dir = TempDir::new().unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::RunMode,
        "loop.yaml",
        "name: loop\ncapability: run_mode\nimplementation: interactive\npreferred: true\n",
    );
    write_strategy(
        temp_dir.path(),
        Capability::RunMode,
        "script.yaml",
        "name: script\ncapability: run_mode\nimplementation: batch\n",
    );

    let opts = options(temp_dir.path()).request(Capability::RunMode, "script");
    let parts = bootstrap(&StrategyRegistry::builtin(), &opts).unwrap();

    assert_eq!(parts.run_mode.name(), "batch");
    let choice = parts.choice(Capability::RunMode).unwrap();
    assert_eq!(choice.name, "script");
    assert_eq!(choice.source, SelectionSource::Requested);
}

#[test]
fn test_first_discovered_without_default_name() {
    let temp_dir = TempDir::new().unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::InputProcessor,
        "b-strict.yaml",
        "name: strict\ncapability: input_processor\nimplementation: verbatim\n",
    );
    write_strategy(
        temp_dir.path(),
        Capability::InputProcessor,
        "c-loose.yaml",
        "name: loose\ncapability: input_processor\nimplementation: standard\n",
    );

    let parts = bootstrap(&StrategyRegistry::builtin(), &options(temp_dir.path())).unwrap();

    assert_eq!(parts.input_processor.name(), "verbatim");
    assert_eq!(
        parts.choice(Capability::InputProcessor).unwrap().source,
        SelectionSource::FirstDiscovered
    );
}

#[test]
fn test_unknown_request_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    builtin::write_sample_strategies(temp_dir.path()).unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::VersionManager,
        "traced.yaml",
        "name: traced\ncapability: version_manager\nimplementation: traced\npreferred: true\n",
    );

    let opts = options(temp_dir.path()).request(Capability::VersionManager, "quantum");
    let parts = bootstrap(&StrategyRegistry::builtin(), &opts).unwrap();

    assert_eq!(parts.assistant.versions().implementation_name(), "traced");
    assert_eq!(
        parts.choice(Capability::VersionManager).unwrap().source,
        SelectionSource::Preferred
    );
}

#[test]
fn test_core_descriptor_selects_dispatch_policy() {
    let temp_dir = TempDir::new().unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::Core,
        "lenient.yaml",
        "name: lenient\ncapability: core\nimplementation: fallthrough\n",
    );

    let parts = bootstrap(&StrategyRegistry::builtin(), &options(temp_dir.path())).unwrap();

    assert_eq!(parts.assistant.dispatch_policy(), DispatchPolicy::FallThrough);
    let choice = parts.choice(Capability::Core).unwrap();
    assert_eq!((choice.name.as_str(), choice.source), ("lenient", SelectionSource::FirstDiscovered));
}

#[test]
fn test_misfiled_and_unknown_descriptors_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::RunMode,
        "a-misfiled.yaml",
        "name: misfiled\ncapability: version_manager\nimplementation: standard\npreferred: true\n",
    );
    write_strategy(
        temp_dir.path(),
        Capability::RunMode,
        "b-missing.yaml",
        "name: missing\ncapability: run_mode\nimplementation: telepathy\n",
    );
    write_strategy(
        temp_dir.path(),
        Capability::RunMode,
        "c-batch.yaml",
        "name: batch\ncapability: run_mode\nimplementation: batch\n",
    );

    let registry = StrategyRegistry::builtin();
    let report = registry.discover(temp_dir.path(), Capability::RunMode).unwrap();
    assert_eq!(report.loaded.len(), 1);
    assert_eq!(report.failed.len(), 2);

    let parts = bootstrap(&registry, &options(temp_dir.path())).unwrap();
    assert_eq!(parts.run_mode.name(), "batch");
    assert_eq!(
        parts.choice(Capability::RunMode).unwrap().source,
        SelectionSource::FirstDiscovered
    );
}

#[test]
fn test_disabled_descriptor_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    write_strategy(
        temp_dir.path(),
        Capability::VersionManager,
        "traced.yaml",
        "name: traced\ncapability: version_manager\nimplementation: traced\npreferred: true\nenabled: false\n",
    );

    let parts = bootstrap(&StrategyRegistry::builtin(), &options(temp_dir.path())).unwrap();

    assert_eq!(parts.assistant.versions().implementation_name(), "standard");
    assert_eq!(
        parts.choice(Capability::VersionManager).unwrap().source,
        SelectionSource::Builtin
    );
}
