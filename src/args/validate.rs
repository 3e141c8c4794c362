//! Validation of resolved parameters against the gear manifest.

use serde_json::Value;

use super::resolve::{flag_name, GEAR_PREFIX};
use crate::bids::BIDS_INPUT;
use crate::error::ArgsError;
use crate::gear::manifest::ConfigSpec;
use crate::gear::{GearContext, GearState};

/// Checks that every parameter is declared, well-typed and in range, that
/// required options and inputs are present, and that input files exist.
///
/// A single violation is returned as-is; several are joined into one
/// [`ArgsError::Validation`].
pub fn validate(context: &GearContext, state: &GearState) -> Result<(), ArgsError> {
    let mut violations = Vec::new();

    for (key, spec) in &context.manifest.config {
        if key.starts_with(GEAR_PREFIX) || spec.optional {
            continue;
        }
        if !state.params.contains_key(key) {
            violations.push(ArgsError::Validation(format!(
                "missing required parameter '{}'",
                key
            )));
        }
    }

    for (name, spec) in &context.manifest.inputs {
        if spec.base == "file" && !spec.optional && !context.inputs.contains_key(name) {
            violations.push(ArgsError::Validation(format!(
                "missing required input '{}'",
                name
            )));
        }
    }

    for (key, value) in &state.params {
        if context.config.contains_key(key) {
            match context.manifest.config.get(key) {
                Some(spec) => {
                    if let Err(reason) = check_value(key, value, spec) {
                        violations.push(ArgsError::Validation(reason));
                    }
                }
                None => violations.push(ArgsError::UnknownParameter(key.clone())),
            }
        }
    }

    for (name, input) in &context.inputs {
        if input.base != "file" || name == BIDS_INPUT {
            continue;
        }
        if let Some(location) = &input.location {
            if !location.path.exists() && state.params.contains_key(&flag_name(name)) {
                violations.push(ArgsError::MissingInput {
                    name: name.clone(),
                    path: location.path.clone(),
                });
            }
        }
    }

    match violations.len() {
        0 => Ok(()),
        1 => Err(violations.remove(0)),
        _ => Err(ArgsError::Validation(
            violations
                .iter()
                .map(|v| match v {
                    ArgsError::Validation(reason) => reason.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        )),
    }
}

fn check_value(key: &str, value: &Value, spec: &ConfigSpec) -> Result<(), String> {
    if !spec.value_type.matches(value) {
        return Err(format!(
            "'{}' must be of type {}, got {}",
            key, spec.value_type, value
        ));
    }

    if let Some(allowed) = &spec.allowed {
        if !allowed.contains(value) {
            return Err(format!("'{}' must be one of {:?}, got {}", key, allowed, value));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = spec.minimum {
            if number < min {
                return Err(format!("'{}' must be >= {}, got {}", key, min, value));
            }
        }
        if let Some(max) = spec.maximum {
            if number > max {
                return Err(format!("'{}' must be <= {}, got {}", key, max, value));
            }
        }
    }

    Ok(())
}
