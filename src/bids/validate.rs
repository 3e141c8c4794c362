//! BIDS layout validation.

use std::fs;
use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{DATASET_DESCRIPTION, DATATYPES};
use crate::error::BidsError;
use crate::gear::{GearContext, GearState};

/// Required fields of `dataset_description.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DatasetDescription {
    #[serde(default)]
    name: String,
    #[serde(rename = "BIDSVersion", default)]
    bids_version: String,
}

/// Validates the layout of the staged dataset.
///
/// With `gear-run-bids-validation` set, `bids-validator` is run as well and
/// any error it reports fails validation.
pub async fn validate_bids(context: &GearContext, state: &GearState) -> Result<(), BidsError> {
    let subjects = check_layout(&state.bids_path)?;
    info!("BIDS layout OK: {} subject(s)", subjects);

    if context.run_bids_validation() {
        run_bids_validator(&state.bids_path).await?;
    }

    Ok(())
}

/// Checks the directory structure and returns the number of subjects.
pub fn check_layout(root: &Path) -> Result<usize, BidsError> {
    let description_path = root.join(DATASET_DESCRIPTION);
    if !description_path.is_file() {
        return Err(BidsError::InvalidLayout(format!(
            "{} not found in {}",
            DATASET_DESCRIPTION,
            root.display()
        )));
    }
    let description: DatasetDescription =
        serde_json::from_str(&fs::read_to_string(&description_path)?)?;
    if description.name.trim().is_empty() {
        return Err(BidsError::InvalidLayout(format!(
            "{} has no Name",
            DATASET_DESCRIPTION
        )));
    }
    if description.bids_version.trim().is_empty() {
        return Err(BidsError::InvalidLayout(format!(
            "{} has no BIDSVersion",
            DATASET_DESCRIPTION
        )));
    }

    let mut subjects = 0;
    for subject in labelled_dirs(root, "sub-")? {
        subjects += 1;
        let sessions = labelled_dirs(&subject, "ses-")?;
        if sessions.is_empty() {
            require_datatype(&subject)?;
        }
        for session in sessions {
            require_datatype(&session)?;
        }
    }

    if subjects == 0 {
        return Err(BidsError::InvalidLayout(format!(
            "no sub-<label> directories in {}",
            root.display()
        )));
    }

    Ok(subjects)
}

fn labelled_dirs(dir: &Path, prefix: &str) -> Result<Vec<std::path::PathBuf>, BidsError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_labelled = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(prefix))
            .unwrap_or(false);
        if is_labelled && path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn require_datatype(dir: &Path) -> Result<(), BidsError> {
    let found = DATATYPES.iter().any(|datatype| dir.join(datatype).is_dir());
    if found {
        return Ok(());
    }
    Err(BidsError::InvalidLayout(format!(
        "{} has no datatype directory",
        dir.display()
    )))
}

/// Runs `bids-validator --json` and fails if it reports errors.
async fn run_bids_validator(root: &Path) -> Result<(), BidsError> {
    info!("Running bids-validator on {}", root.display());

    let output = Command::new("bids-validator")
        .arg("--json")
        .arg(root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| BidsError::ValidatorUnavailable(e.to_string()))?;

    let report: Value = serde_json::from_slice(&output.stdout)?;
    let (errors, warnings) = summarize_report(&report);

    for warning in &warnings {
        warn!("bids-validator: {}", warning);
    }
    for err in &errors {
        error!("bids-validator: {}", err);
    }
    debug!(
        "bids-validator exited with {:?}: {} error(s), {} warning(s)",
        output.status.code(),
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BidsError::Validator {
            errors: errors.len(),
        })
    }
}

/// Extracts error and warning descriptions from a bids-validator JSON report.
pub fn summarize_report(report: &Value) -> (Vec<String>, Vec<String>) {
    let issues = report.get("issues");
    (
        describe_issues(issues.and_then(|i| i.get("errors"))),
        describe_issues(issues.and_then(|i| i.get("warnings"))),
    )
}

fn describe_issues(issues: Option<&Value>) -> Vec<String> {
    let Some(items) = issues.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|issue| {
            let key = issue.get("key").and_then(Value::as_str).unwrap_or("UNKNOWN");
            match issue.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{}: {}", key, reason),
                None => key.to_string(),
            }
        })
        .collect()
}
