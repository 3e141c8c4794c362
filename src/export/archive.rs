//! Archiving of the gear output directory.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder as TarBuilder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ArchiveError;
use crate::gear::GearContext;

/// Packs the output directory at the end of a run.
pub trait OutputArchiver: Send + Sync {
    /// Archives the output directory and returns the archive path.
    fn archive(&self, context: &GearContext) -> Result<PathBuf, ArchiveError>;
}

/// Writes a gzipped tarball next to the outputs it contains.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzArchiver;

impl OutputArchiver for TarGzArchiver {
    fn archive(&self, context: &GearContext) -> Result<PathBuf, ArchiveError> {
        zip_output(context)
    }
}

/// Archive path for a run: `<output_dir>/<gear-name>_<destination-id>.tar.gz`.
pub fn archive_path(context: &GearContext) -> PathBuf {
    let name = if context.manifest.name.is_empty() {
        "gear"
    } else {
        context.manifest.name.as_str()
    };
    context
        .output_dir
        .join(format!("{}_{}.tar.gz", name, context.destination_id()))
}

/// Packs everything under the output directory into a single tar.gz.
pub fn zip_output(context: &GearContext) -> Result<PathBuf, ArchiveError> {
    let archive = archive_path(context);
    let count = archive_directory(&context.output_dir, &archive)?;
    info!("Saved {} output file(s) to {}", count, archive.display());
    Ok(archive)
}

/// Writes every file under `dir` into `archive`, with paths relative to `dir`.
///
/// The archive itself is skipped when it lives inside `dir`. Returns the
/// number of files written.
pub fn archive_directory(dir: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    if !dir.is_dir() {
        return Err(ArchiveError::MissingOutputDir(dir.to_path_buf()));
    }

    let file = File::create(archive)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut tar = TarBuilder::new(enc);

    let mut count = 0;
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path == archive {
            continue;
        }
        let relative = path.strip_prefix(dir).unwrap_or(path);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            tar.append_dir(relative, path)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            // Symlinked files are stored with their target's contents.
            debug!("Archiving {}", relative.display());
            tar.append_path_with_name(path, relative)?;
            count += 1;
        } else if file_type.is_symlink() && path.is_dir() {
            tar.append_dir(relative, path)?;
        } else if file_type.is_symlink() {
            warn!("Skipping dangling symlink {}", relative.display());
        }
    }

    tar.into_inner()?.finish()?;
    Ok(count)
}
