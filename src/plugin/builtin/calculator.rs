//! Calculator Plugin
//!
//! Contributes the `Calc` entity: arithmetic functions, an accumulator
//! class, and a handler for `calc 2 + 3` / `tính 2 + 3` that routes through
//! whichever `Calc` version is current.

use regex::Regex;
use serde_json::{json, Value};

use crate::assistant::{Assistant, HandlerContext};
use crate::output::format_value;
use crate::plugin::catalog::PluginCatalog;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{CommandHandler, Plugin};
use crate::version::{class_factory, method_fn, PluginObject, VersionSelector};

pub const ENTITY: &str = "Calc";

/// Add the calculator's functions and class to a catalog
pub fn register_catalog(catalog: &mut PluginCatalog) {
    catalog
        .add_function("calc.add", method_fn(|args| binary(args, |a, b| Ok(a + b))))
        .add_function("calc.sub", method_fn(|args| binary(args, |a, b| Ok(a - b))))
        .add_function("calc.mul", method_fn(|args| binary(args, |a, b| Ok(a * b))))
        .add_function("calc.div", method_fn(|args| binary(args, divide)))
        .add_function(
            "calc.add_verbose",
            method_fn(|args| {
                let (a, b) = operands(args)?;
                Ok(json!(format!("{} + {} = {}", number(a), number(b), number(a + b))))
            }),
        )
        .add_class("calc.accumulator", class_factory(|| Box::new(Accumulator::default())));
}

fn divide(a: f64, b: f64) -> PluginResult<f64> {
    if b == 0.0 {
        Err(PluginError::invalid_arguments("division by zero"))
    } else {
        Ok(a / b)
    }
}

fn operand(value: &Value) -> PluginResult<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| PluginError::invalid_arguments(format!("'{}' is not a number", format_value(value))))
}

fn operands(args: &[Value]) -> PluginResult<(f64, f64)> {
    match args {
        [a, b] => Ok((operand(a)?, operand(b)?)),
        _ => Err(PluginError::invalid_arguments(format!("expected 2 numbers, got {}", args.len()))),
    }
}

fn binary(args: &[Value], op: impl Fn(f64, f64) -> PluginResult<f64>) -> PluginResult<Value> {
    let (a, b) = operands(args)?;
    finite(op(a, b)?)
}

/// Reject results JSON cannot carry (infinities, NaN)
fn finite(x: f64) -> PluginResult<Value> {
    if x.is_finite() {
        Ok(number(x))
    } else {
        Err(PluginError::invalid_arguments("result out of range"))
    }
}

/// Whole results as integers, everything else as floats
pub fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        json!(x as i64)
    } else {
        json!(x)
    }
}

/// Running total; each class call gets a fresh instance
#[derive(Debug, Default)]
pub struct Accumulator {
    total: f64,
}

impl PluginObject for Accumulator {
    fn call(&mut self, method: &str, args: &[Value]) -> PluginResult<Value> {
        match method {
            "add" => {
                for arg in args {
                    self.total += operand(arg)?;
                }
                finite(self.total)
            }
            "sub" => {
                for arg in args {
                    self.total -= operand(arg)?;
                }
                finite(self.total)
            }
            "total" => Ok(number(self.total)),
            other => Err(PluginError::not_found(format!("method {} on accumulator", other))),
        }
    }

    fn methods(&self) -> Vec<&'static str> {
        vec!["add", "sub", "total"]
    }
}

pub struct CalculatorPlugin;

impl Plugin for CalculatorPlugin {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Arithmetic through the Calc entity"
    }

    fn register(&self, assistant: &mut Assistant) -> PluginResult<()> {
        assistant.add_handler(Box::new(CalculatorHandler::new()?));
        Ok(())
    }
}

pub struct CalculatorHandler {
    expression: Regex,
}

impl CalculatorHandler {
    pub fn new() -> PluginResult<Self> {
        let expression = Regex::new(r"^(?:calc|tính)\s+(-?\d+(?:\.\d+)?)\s*([-+*/x×:])\s*(-?\d+(?:\.\d+)?)$")
            .map_err(|e| PluginError::generic(e.to_string()))?;
        Ok(Self { expression })
    }
}

impl CommandHandler for CalculatorHandler {
    fn name(&self) -> &str {
        "calculator"
    }

    fn can_handle(&self, input: &str) -> bool {
        input.starts_with("calc ") || input.starts_with("tính ")
    }

    fn handle(&mut self, input: &str, ctx: &mut HandlerContext<'_>) -> PluginResult<String> {
        let captures = self
            .expression
            .captures(input)
            .ok_or_else(|| PluginError::invalid_arguments("usage: calc <a> <+|-|*|/> <b>"))?;

        // Replies echo the operator as typed
        let symbol = &captures[2];
        let method = match symbol {
            "+" => "add",
            "-" => "sub",
            "*" | "x" | "×" => "mul",
            _ => "div",
        };
        let a = parse_number(&captures[1])?;
        let b = parse_number(&captures[3])?;

        match ctx.call_method(ENTITY, method, &[a.clone(), b.clone()], &VersionSelector::Current) {
            Ok(result) => Ok(format!(
                "{} {} {} = {}",
                format_value(&a),
                symbol,
                format_value(&b),
                format_value(&result)
            )),
            Err(PluginError::NotFound { .. }) => Ok(format!(
                "{}.{} is not available in version '{}'",
                ENTITY,
                method,
                ctx.current_version()
            )),
            Err(e) => Err(e),
        }
    }

    fn command_hints(&self) -> Vec<String> {
        vec!["calc <a> <op> <b>".to_string(), "tính <a> <op> <b>".to_string()]
    }
}

fn parse_number(text: &str) -> PluginResult<Value> {
    let x: f64 = text
        .parse()
        .map_err(|_| PluginError::invalid_arguments(format!("'{}' is not a number", text)))?;
    if !x.is_finite() {
        return Err(PluginError::invalid_arguments(format!("'{}' is out of range", text)));
    }
    Ok(number(x))
}
