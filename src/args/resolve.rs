//! Resolution of config values and inputs into command parameters.

use serde_json::Value;
use tracing::debug;

use crate::bids::BIDS_INPUT;
use crate::error::ArgsError;
use crate::gear::{GearContext, GearState};

/// Config keys with this prefix control the gear itself and never become flags.
pub const GEAR_PREFIX: &str = "gear-";

/// Flag name for an input: underscores become hyphens.
pub fn flag_name(input_name: &str) -> String {
    input_name.replace('_', "-")
}

/// Collects command parameters from config values and file inputs.
///
/// The `bids` input is consumed by the data stage and is not passed on.
pub fn get_inputs_and_args(context: &GearContext, state: &mut GearState) -> Result<(), ArgsError> {
    for (key, value) in &context.config {
        if key.starts_with(GEAR_PREFIX) {
            continue;
        }
        state.params.insert(key.clone(), value.clone());
    }

    for (name, input) in &context.inputs {
        if input.base != "file" || name == BIDS_INPUT {
            continue;
        }
        let location = input
            .location
            .as_ref()
            .ok_or_else(|| ArgsError::NoLocation(name.clone()))?;
        state.params.insert(
            flag_name(name),
            Value::String(location.path.to_string_lossy().to_string()),
        );
    }

    debug!("Resolved {} parameter(s)", state.params.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::context::{ConfigFile, InputFile, InputLocation};
    use serde_json::json;

    #[test]
    fn test_gear_keys_are_skipped() {
        let mut file = ConfigFile::default();
        file.config.insert("gear-dry-run".into(), json!(true));
        file.config.insert("n_cpus".into(), json!(4));
        file.config.insert("output-spaces".into(), json!("T1w"));
        let context = GearContext::from_config_file("/gear", file);
        let mut state = GearState::default();

        get_inputs_and_args(&context, &mut state).unwrap();

        let keys: Vec<_> = state.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["n_cpus", "output-spaces"]);
        assert_eq!(state.params["n_cpus"], json!(4));
    }

    #[test]
    fn test_file_inputs_become_params() {
        let mut file = ConfigFile::default();
        file.inputs.insert(
            "fs_license_file".into(),
            InputFile {
                base: "file".into(),
                location: Some(InputLocation {
                    path: "/gear/input/fs_license_file/license.txt".into(),
                    name: Some("license.txt".into()),
                }),
            },
        );
        file.inputs.insert(
            "bids".into(),
            InputFile {
                base: "file".into(),
                location: Some(InputLocation {
                    path: "/gear/input/bids/dataset.tar.gz".into(),
                    name: None,
                }),
            },
        );
        file.inputs.insert(
            "api-key".into(),
            InputFile {
                base: "api-key".into(),
                location: None,
            },
        );
        let context = GearContext::from_config_file("/gear", file);
        let mut state = GearState::default();

        get_inputs_and_args(&context, &mut state).unwrap();

        assert_eq!(state.params.len(), 1);
        assert_eq!(
            state.params["fs-license-file"],
            json!("/gear/input/fs_license_file/license.txt")
        );
    }

    #[test]
    fn test_file_input_without_location() {
        let mut file = ConfigFile::default();
        file.inputs.insert(
            "anat_template".into(),
            InputFile {
                base: "file".into(),
                location: None,
            },
        );
        let context = GearContext::from_config_file("/gear", file);
        let mut state = GearState::default();

        let err = get_inputs_and_args(&context, &mut state).unwrap_err();
        assert!(matches!(err, ArgsError::NoLocation(name) if name == "anat_template"));
    }
}
