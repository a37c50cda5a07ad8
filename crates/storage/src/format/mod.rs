//! On-disk byte formats for datafiles.
//!
//! Keeping serialization separate from operational logic (how datafiles are
//! appended, rotated, and merged) makes format evolution easier to manage.
//!
//! # Module Structure
//!
//! - `record`: datafile record header and framing

pub mod record;

pub use record::{Record, RecordError, RECORD_HEADER_SIZE};
