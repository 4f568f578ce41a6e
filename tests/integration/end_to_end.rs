//! End-to-End Integration Tests
//!
//! Whole flows through the public API: versioned registration and
//! resolution, descriptor discovery into a live assistant, and dispatch.

use std::fs;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tempfile::TempDir;

use vassist::assistant::{Assistant, HandlerContext, Response};
use vassist::plugin::{
    builtin, CommandHandler, FileBasedDiscovery, Plugin, PluginDiscovery, PluginRegistrar, PluginResult,
};
use vassist::version::{method_fn, MergeMode, VersionManager, VersionRegistry, VersionSelector};

fn add() -> vassist::version::MethodFn {
    method_fn(|args| {
        let a = args.first().and_then(Value::as_i64).unwrap_or(0);
        let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
        Ok(json!(a + b))
    })
}

/// Handler with a fixed trigger that records whether it ran
struct Probe {
    name: &'static str,
    trigger: &'static str,
    ran: Arc<Mutex<Vec<&'static str>>>,
}

impl CommandHandler for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn can_handle(&self, input: &str) -> bool {
        input == self.trigger
    }

    fn handle(&mut self, _input: &str, _ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        self.ran.lock().unwrap().push(self.name);
        Ok(format!("{} handled it", self.name))
    }
}

#[test]
fn test_scenario_a_register_and_call() {
    let mut registry = VersionRegistry::new();
    registry
        .register_method("Calc", "add", "default", add(), "", MergeMode::Replace)
        .unwrap();

    let resolved = registry
        .resolve_method("Calc", "add", &VersionSelector::Current)
        .unwrap();
    assert_eq!(resolved.invoke(&[json!(2), json!(3)]).unwrap(), json!(5));
}

#[test]
fn test_scenario_b_append_pairs_results() {
    let mut registry = VersionRegistry::new();
    registry
        .register_method("KB", "search", "default", method_fn(|a| Ok(json!(format!("f1:{}", a[0])))), "", MergeMode::Replace)
        .unwrap();
    registry
        .register_method("KB", "search", "default", method_fn(|a| Ok(json!(format!("f2:{}", a[0])))), "", MergeMode::Append)
        .unwrap();

    let result = registry.call("KB", "search", &VersionSelector::Current, &[json!("x")]).unwrap();
    assert_eq!(result, json!(["f1:\"x\"", "f2:\"x\""]));
}

#[test]
fn test_scenario_c_unknown_method_is_none() {
    let registry = VersionRegistry::new();
    assert!(registry.resolve_method("Unknown", "thing", &VersionSelector::Current).is_none());
    assert!(registry.resolve_class("Unknown", None).is_none());
}

#[test]
fn test_scenario_d_positional_insertion() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let mut assistant = Assistant::default();
    assistant.insert_handler(0, Box::new(Probe { name: "first", trigger: "pong", ran: Arc::clone(&ran) }));
    assistant.insert_handler(1, Box::new(Probe { name: "second", trigger: "ping", ran: Arc::clone(&ran) }));

    let response = assistant.process("ping").unwrap();
    assert_eq!(response.handler(), Some("second"));
    assert_eq!(response.text(), "second handled it");
    assert_eq!(*ran.lock().unwrap(), vec!["second"]);
}

#[test]
fn test_dispatch_short_circuit() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let mut assistant = Assistant::default();
    assistant.add_handler(Box::new(Probe { name: "a", trigger: "go", ran: Arc::clone(&ran) }));
    assistant.add_handler(Box::new(Probe { name: "b", trigger: "go", ran: Arc::clone(&ran) }));

    assistant.process("GO").unwrap();
    assert_eq!(*ran.lock().unwrap(), vec!["a"]);
}

#[test]
fn test_version_isolation_and_switch_failure() {
    let mut registry = VersionRegistry::new();
    registry
        .register_method("Calc", "add", "v1", add(), "", MergeMode::Replace)
        .unwrap();

    assert!(registry.resolve_method("Calc", "add", &VersionSelector::Current).is_none());
    assert!(registry
        .resolve_method("Calc", "add", &VersionSelector::Named("v1".to_string()))
        .is_some());

    assert!(!registry.switch_version("nonexistent"));
    assert_eq!(registry.current_version(), "default");
    assert!(registry.switch_version("v1"));
    assert!(registry.resolve_method("Calc", "add", &VersionSelector::Current).is_some());
}

struct Marker(&'static str);

impl Plugin for Marker {
    fn name(&self) -> &str {
        self.0
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.context_mut().insert(self.0.to_string(), json!(true));
        Ok(())
    }
}

#[test]
fn test_discovery_fault_isolation_preserves_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("1-alpha.yaml"), "name: alpha\nentry_point: alpha\n").unwrap();
    fs::write(temp_dir.path().join("2-broken.yaml"), "name: broken\nmethods: {not: [a list\n").unwrap();
    fs::write(temp_dir.path().join("3-gamma.yaml"), "name: gamma\nentry_point: gamma\n").unwrap();

    let mut catalog = builtin::default_catalog();
    catalog.add_entry_point(Arc::new(Marker("alpha"))).add_entry_point(Arc::new(Marker("gamma")));

    let report = FileBasedDiscovery::new(temp_dir.path()).discover(&catalog).unwrap();
    assert_eq!(report.failed.len(), 1);

    let mut assistant = Assistant::default();
    let registration = PluginRegistrar::register_all(&mut assistant, report.loaded);
    assert_eq!(registration.registered, vec!["alpha", "gamma"]);
    assert_eq!(assistant.registered_plugins(), ["alpha".to_string(), "gamma".to_string()]);
    assert!(assistant.context().contains_key("alpha"));
    assert!(assistant.context().contains_key("gamma"));
}

#[test]
fn test_sample_plugins_full_session() {
    let temp_dir = TempDir::new().unwrap();
    builtin::write_sample_descriptors(temp_dir.path()).unwrap();

    let report = FileBasedDiscovery::new(temp_dir.path())
        .discover(&builtin::default_catalog())
        .unwrap();
    let mut assistant = Assistant::default().with_plugin_dir(temp_dir.path());
    assert!(PluginRegistrar::register_all(&mut assistant, report.loaded).is_clean());

    let mut say = |text: &str| assistant.process(text).unwrap().text().to_string();

    assert_eq!(say("ping"), "Pong! (#1)");
    assert_eq!(say("calc 6 * 7"), "6 * 7 = 42");
    assert_eq!(say("call Calc.add 2 3"), "5");
    assert_eq!(say("set context city=Hà Nội"), "Set city = Hà Nội");
    assert_eq!(say("version use audit"), "Switched to version 'audit'");
    assert_eq!(say("calc 2 + 3"), r#"2 + 3 = [5,"2 + 3 = 5"]"#);
    assert_eq!(say("version use nowhere"), "Unknown version 'nowhere'; still using 'audit'");
    assert!(say("help").contains("Current version: audit"));
    assert!(say("version list").contains("Addition that also reports its operands"));
    assert!(say("version show default").contains("add, sub, total"));
    assert_eq!(
        say("use version manager traced"),
        "Switched version manager from 'standard' to 'traced'"
    );
    // The swapped-in manager serves the same versions
    assert_eq!(say("calc 2 + 3"), r#"2 + 3 = [5,"2 + 3 = 5"]"#);
    assert_eq!(say("version current"), "Current version: audit");
    assert!(matches!(assistant.process("sing a song").unwrap(), Response::Unknown(_)));
    assert_eq!(assistant.versions().implementation_name(), "traced");
}
