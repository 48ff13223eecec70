#![deny(clippy::all, warnings)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod digest;
pub mod filename;
pub mod size;

pub use digest::{digest_file, digest_reader, FileDigest};
pub use filename::{is_package_file, split_archive_suffix, ArchiveKind, ParseOrigin, ParsedPackage};
pub use size::format_size;
