//! Method and class bindings
//!
//! A binding ties an (entity, method, version) key to compiled-in code. Method
//! callables take and return JSON values so that descriptor files, the
//! command line and other plugins can all reach them with the same shape.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin::error::{PluginError, PluginResult};

/// A registered method implementation
pub type MethodFn = Arc<dyn Fn(&[Value]) -> PluginResult<Value> + Send + Sync>;

/// Factory producing fresh instances of a registered class
pub type ClassFactory = Arc<dyn Fn() -> Box<dyn PluginObject> + Send + Sync>;

/// Instance of a registered class
///
/// `call` dispatches by method name; unknown names should return
/// [`PluginError::NotFound`].
pub trait PluginObject: Send {
    /// Invoke a method on this instance
    fn call(&mut self, method: &str, args: &[Value]) -> PluginResult<Value>;

    /// Names of the methods this instance answers to
    fn methods(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// Wrap a closure as a [`MethodFn`]
pub fn method_fn<F>(f: F) -> MethodFn
where
    F: Fn(&[Value]) -> PluginResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a constructor as a [`ClassFactory`]
pub fn class_factory<F>(f: F) -> ClassFactory
where
    F: Fn() -> Box<dyn PluginObject> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Policy applied when a method is registered over an existing binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MergeMode {
    /// Overwrite the existing binding
    #[default]
    Replace,
    /// Call the old and the new callable, returning both results as a pair
    Append,
    /// Accumulate callables; invocation fans out to all of them
    Multi,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Replace => "replace",
            MergeMode::Append => "append",
            MergeMode::Multi => "multi",
        }
    }
}

impl FromStr for MergeMode {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(MergeMode::Replace),
            "append" => Ok(MergeMode::Append),
            "multi" => Ok(MergeMode::Multi),
            _ => Err(PluginError::invalid_merge_mode(s)),
        }
    }
}

impl TryFrom<String> for MergeMode {
    type Error = PluginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MergeMode> for String {
    fn from(mode: MergeMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a method binding calls
#[derive(Clone)]
pub enum CallableRef {
    Single(MethodFn),
    Multi(Vec<MethodFn>),
}

/// Binding of one (entity, method, version) key
#[derive(Clone)]
pub struct MethodBinding {
    callable: CallableRef,
    description: String,
}

impl MethodBinding {
    pub fn new(callable: MethodFn, description: impl Into<String>) -> Self {
        Self {
            callable: CallableRef::Single(callable),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn callable(&self) -> &CallableRef {
        &self.callable
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.callable, CallableRef::Multi(_))
    }

    /// Number of functions invoked by this binding
    pub fn callable_count(&self) -> usize {
        match &self.callable {
            CallableRef::Single(_) => 1,
            CallableRef::Multi(funcs) => funcs.len(),
        }
    }

    /// Invoke the binding. A multi binding yields an array of results in
    /// registration order.
    pub fn invoke(&self, args: &[Value]) -> PluginResult<Value> {
        match &self.callable {
            CallableRef::Single(f) => f(args),
            CallableRef::Multi(funcs) => {
                let mut results = Vec::with_capacity(funcs.len());
                for f in funcs {
                    results.push(f(args)?);
                }
                Ok(Value::Array(results))
            }
        }
    }

    /// Combine an existing binding with a newly registered callable.
    ///
    /// With no existing binding the new callable is stored as-is whatever the
    /// requested mode.
    pub fn merge(
        existing: Option<MethodBinding>,
        callable: MethodFn,
        description: &str,
        mode: MergeMode,
    ) -> MethodBinding {
        let existing = match existing {
            Some(existing) if mode != MergeMode::Replace => existing,
            _ => return MethodBinding::new(callable, description),
        };

        match mode {
            MergeMode::Append => {
                let description = format!("{} + {}", existing.description, description);
                let old = existing;
                let combined: MethodFn = Arc::new(move |args: &[Value]| {
                    let first = old.invoke(args)?;
                    let second = callable(args)?;
                    Ok(Value::Array(vec![first, second]))
                });
                MethodBinding::new(combined, description)
            }
            MergeMode::Multi => {
                let mut funcs = match existing.callable {
                    CallableRef::Single(f) => vec![f],
                    CallableRef::Multi(funcs) => funcs,
                };
                funcs.push(callable);
                MethodBinding {
                    callable: CallableRef::Multi(funcs),
                    description: description.to_string(),
                }
            }
            MergeMode::Replace => MethodBinding::new(callable, description),
        }
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("callables", &self.callable_count())
            .field("description", &self.description)
            .finish()
    }
}
