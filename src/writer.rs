// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	archive::{Archive, ReadOptions},
	error::Result,
	header::Alignment,
	integrity::{FileIntegrity, HashAlgorithm, DEFAULT_BLOCK_SIZE},
};
use std::io::Write;

/// Builds a fresh archive from named byte blobs.
///
/// Files are hashed as they are written; [`finalize`](Self::finalize)
/// lays the content out in canonical order and writes header and content.
///
/// ```rust,no_run
/// use asar_archive::{AsarWriter, Result};
/// use std::fs::File;
///
/// fn main() -> Result<()> {
/// 	let mut asar = AsarWriter::new();
/// 	asar.write_file("hello.txt", b"Hello, World!", false)?;
/// 	asar.finalize(File::create("archive.asar")?)?;
/// 	Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct AsarWriter {
	archive: Archive,
}

impl AsarWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_alignment(alignment: Alignment) -> Self {
		Self {
			archive: Archive::with_alignment(alignment),
		}
	}

	/// Copies every packed file of `archive`, keeping executable flags.
	/// Unpacked files are carried over as unpacked entries.
	pub fn add_from_archive(&mut self, archive: &Archive) -> Result<()> {
		for (path, file) in archive.files() {
			if file.is_unpacked() {
				self.archive.insert_unpacked(
					&path,
					file.size(),
					file.executable(),
					file.integrity().cloned(),
				)?;
			} else {
				let data = archive.read_entry(&path, file, ReadOptions::default())?;
				self.archive.insert_file(&path, data, file.executable())?;
			}
		}
		Ok(())
	}

	/// Write a file to the archive.
	/// This appends the contents to the writer and adds the file to the
	/// header.
	pub fn write_file(
		&mut self,
		path: impl AsRef<str>,
		bytes: impl AsRef<[u8]>,
		executable: bool,
	) -> Result<()> {
		self.archive
			.insert_file(path.as_ref(), bytes.as_ref(), executable)
	}

	/// Records a file that is stored beside the archive instead of in it.
	/// `bytes` is only hashed, not stored.
	pub fn write_unpacked(
		&mut self,
		path: impl AsRef<str>,
		bytes: impl AsRef<[u8]>,
		executable: bool,
	) -> Result<()> {
		let bytes = bytes.as_ref();
		self.archive.insert_unpacked(
			path.as_ref(),
			bytes.len() as u64,
			executable,
			Some(FileIntegrity::compute(
				HashAlgorithm::Sha256,
				DEFAULT_BLOCK_SIZE,
				bytes,
			)),
		)
	}

	/// Adds an empty directory.
	pub fn write_dir(&mut self, path: impl AsRef<str>) -> Result<()> {
		self.archive.insert_folder(path.as_ref())
	}

	/// The archive built so far.
	#[inline]
	pub const fn archive(&self) -> &Archive {
		&self.archive
	}

	#[inline]
	pub fn into_archive(self) -> Archive {
		self.archive
	}

	/// Finalizes the archive, writing the header + files to the writer.
	pub fn finalize<FinalWriter>(mut self, final_writer: FinalWriter) -> Result<usize>
	where
		FinalWriter: Write,
	{
		self.archive.write_to(final_writer)
	}
}
