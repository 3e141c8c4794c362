//! BIDS dataset staging and layout validation.
//!
//! # Layout
//!
//! ```text
//! <work_dir>/bids/
//!   dataset_description.json
//!   sub-01/
//!     anat/ func/ ...        (datatype directories)
//!   sub-02/
//!     ses-pre/ anat/ ...     (or session directories holding datatypes)
//! ```

pub mod download;
pub mod validate;

pub use download::download_bids;
pub use validate::validate_bids;

/// Name of the gear input that carries a BIDS dataset archive.
pub const BIDS_INPUT: &str = "bids";

/// File that marks the root of a BIDS dataset.
pub const DATASET_DESCRIPTION: &str = "dataset_description.json";

/// Datatype directories recognised under a subject or session.
pub const DATATYPES: &[&str] = &[
    "anat", "func", "dwi", "fmap", "perf", "beh", "eeg", "meg", "ieeg", "pet",
];
