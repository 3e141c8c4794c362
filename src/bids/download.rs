//! Staging of the BIDS dataset into the working directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::{BIDS_INPUT, DATASET_DESCRIPTION};
use crate::error::BidsError;
use crate::gear::{GearContext, GearState};

/// Stages the dataset at `state.bids_path`.
///
/// A `bids` archive input is unpacked there; otherwise a dataset already
/// present at the path is reused.
pub fn download_bids(context: &GearContext, state: &GearState) -> Result<(), BidsError> {
    if let Some(archive) = context.input_path(BIDS_INPUT) {
        info!(
            "Unpacking BIDS archive {} into {}",
            archive.display(),
            state.bids_path.display()
        );
        unpack_archive(archive, &state.bids_path)?;
        return Ok(());
    }

    if state.bids_path.join(DATASET_DESCRIPTION).is_file() {
        info!("Using BIDS dataset already at {}", state.bids_path.display());
        return Ok(());
    }

    Err(BidsError::NoSource(state.bids_path.clone()))
}

/// Unpacks a `.tar`, `.tar.gz` or `.tgz` archive into `dest`.
///
/// When the archive wraps the dataset in a single top-level directory, that
/// directory's content is moved up so `dest` is the dataset root.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), BidsError> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let file = File::open(archive)?;
    let reader: Box<dyn Read> = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Box::new(GzDecoder::new(file))
    } else if name.ends_with(".tar") {
        Box::new(file)
    } else {
        return Err(BidsError::UnsupportedArchive(archive.to_path_buf()));
    };

    fs::create_dir_all(dest)?;
    tar::Archive::new(reader).unpack(dest)?;

    flatten_single_root(dest)
}

fn flatten_single_root(dest: &Path) -> Result<(), BidsError> {
    if dest.join(DATASET_DESCRIPTION).is_file() {
        return Ok(());
    }

    let entries: Vec<_> = fs::read_dir(dest)?.collect::<Result<_, _>>()?;
    let [entry] = entries.as_slice() else {
        return Ok(());
    };
    let root = entry.path();
    if !root.is_dir() || !root.join(DATASET_DESCRIPTION).is_file() {
        return Ok(());
    }

    debug!("Moving dataset up from {}", root.display());

    // Rename first so a child with the same name as the wrapper cannot collide.
    let wrapper = dest.join(".bids-unpack");
    fs::rename(&root, &wrapper)?;
    for child in fs::read_dir(&wrapper)? {
        let child = child?;
        fs::rename(child.path(), dest.join(child.file_name()))?;
    }
    fs::remove_dir(&wrapper)?;

    Ok(())
}
