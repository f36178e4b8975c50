// SPDX-License-Identifier: Apache-2.0 OR MIT
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(
	clippy::perf,
	clippy::complexity,
	clippy::style,
	clippy::correctness,
	clippy::missing_const_for_fn
)]
#![allow(clippy::tabs_in_doc_comments, clippy::too_many_arguments)]

//! This crate allows for the parsing, verifying, and writing of [asar](https://github.com/electron/asar) archives,
//! often seen in [Electron](https://www.electronjs.org/)-based applications.
//!
//! An archive is a small preamble, a JSON header describing the directory
//! tree, and the packed file contents back to back. Each file may carry
//! SHA256 hashes of its whole content and of every fixed-size block.
//!
//! # Examples
//!
//! ## Listing the contents of an asar archive
//! ```rust,no_run
//! use asar_archive::{Archive, Result};
//! use std::fs;
//!
//! fn main() -> Result<()> {
//! 	let asar = Archive::decode(&fs::read("archive.asar")?)?;
//!
//! 	for (path, file) in asar.files() {
//! 		println!("/{path} ({} bytes)", file.size());
//! 	}
//! 	Ok(())
//! }
//! ```
//!
//! ## Reading a file from an asar archive
//! ```rust,no_run
//! use asar_archive::{Archive, ReadOptions, Result};
//! use std::fs;
//!
//! fn main() -> Result<()> {
//! 	let asar = Archive::decode(&fs::read("archive.asar")?)?;
//!
//! 	let file = asar.read_file("/hello.txt", ReadOptions::STRICT)?;
//! 	let contents = std::str::from_utf8(file).unwrap();
//! 	assert_eq!(contents, "Hello, World!");
//! 	Ok(())
//! }
//! ```
//!
//! ## Writing a file to an asar archive
//! ```rust,no_run
//! use asar_archive::{AsarWriter, Result};
//! use std::fs::File;
//!
//! fn main() -> Result<()> {
//! 	let mut asar = AsarWriter::new();
//! 	asar.write_file("hello.txt", b"Hello, World!", false)?;
//! 	asar.finalize(File::create("archive.asar")?)?;
//! 	Ok(())
//! }
//! ```
//!
//! # Features
//!
//!  - `write` - Enable packing a directory from disk. **Enabled by default**.
//!
//! # License
//!
//! `asar-archive` is licensed under either the [MIT license](LICENSE-MIT) or the
//! [Apache License 2.0](LICENSE-APACHE), at the choice of the user.

/// The in-memory archive: lookup, reads, edits, and serialization.
pub mod archive;
/// Where warnings about missing or failed integrity data go.
pub mod diagnostics;
/// The header tree of folders and files.
pub mod entry;
/// Error handling for parsing, reading, and writing asar archives.
pub mod error;
/// Binary framing of the header.
pub mod header;
pub mod integrity;
#[cfg(feature = "write")]
/// Packing a directory into an archive.
pub mod pack;
pub mod path;
pub mod unpacked;
/// Writing asar archives.
pub mod writer;

pub use archive::{Archive, ArchiveState, EntryRef, ReadOptions};
pub use diagnostics::{Diagnostics, LogDiagnostics, NoDiagnostics};
pub use entry::{Entry, FileEntry, FolderEntry, WalkEntry};
pub use error::{AccessError, Error, FormatError, Result};
pub use header::{Alignment, Header};
pub use integrity::{FileIntegrity, HashAlgorithm, IntegrityChecker, Sha256Checker};
#[cfg(feature = "write")]
pub use pack::{pack, PackOptions, PackSummary};
pub use unpacked::{UnpackedDir, UnpackedStore};
pub use writer::AsarWriter;
