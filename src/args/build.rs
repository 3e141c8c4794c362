//! Rendering of resolved parameters into the final command line.

use serde_json::Value;
use tracing::debug;

use crate::gear::GearState;

/// Renders a parameter value as a single command-line token.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Returns the working command with every parameter appended as a flag.
///
/// - booleans: the bare flag when true, nothing when false
/// - arrays: the bare flag followed by one token per element
/// - single-character keys: `-k` followed by the value when it is non-empty
/// - empty values: `--key`
/// - anything else: `--key=value`
pub fn build_command(state: &GearState) -> Vec<String> {
    let mut command = state.command.clone();

    for (key, value) in &state.params {
        let flag = if key.chars().count() == 1 {
            format!("-{}", key)
        } else {
            format!("--{}", key)
        };

        match value {
            Value::Bool(true) => command.push(flag),
            Value::Bool(false) | Value::Null => {}
            Value::Array(items) => {
                command.push(flag);
                command.extend(items.iter().map(render_value));
            }
            _ => {
                let rendered = render_value(value);
                if key.chars().count() == 1 {
                    command.push(flag);
                    if !rendered.is_empty() {
                        command.push(rendered);
                    }
                } else if rendered.is_empty() {
                    command.push(flag);
                } else {
                    command.push(format!("{}={}", flag, rendered));
                }
            }
        }
    }

    debug!("Command: {}", command.join(" "));
    command
}
