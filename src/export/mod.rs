//! Export of gear results.
//!
//! Packs the output directory into a single archive when
//! `gear-save-all-output` is set.

pub mod archive;

pub use archive::{archive_directory, archive_path, zip_output, OutputArchiver, TarGzArchiver};
