// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	error::{Error, Result},
	path::segments,
};
use std::{
	ffi::OsString,
	fs,
	path::{Path, PathBuf},
};

/// Resolves the bytes of unpacked files, which the header lists but the
/// archive does not contain.
pub trait UnpackedStore {
	fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// The `<archive>.unpacked/` directory the asar tooling keeps beside an
/// archive for its unpacked files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedDir {
	root: PathBuf,
}

impl UnpackedDir {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// The unpacked directory belonging to the archive at `archive`.
	pub fn for_archive(archive: &Path) -> Self {
		let mut root = OsString::from(archive.as_os_str());
		root.push(".unpacked");
		Self::new(root)
	}

	#[inline]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Where the archive path `path` lives on disk.
	pub fn path_of(&self, path: &str) -> PathBuf {
		segments(path)
			.into_iter()
			.fold(self.root.clone(), |out, segment| out.join(segment))
	}

	/// Stores `bytes` for `path`, creating parent directories as needed.
	pub fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
		let out = self.path_of(path);
		if let Some(parent) = out.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(&out, bytes)?;
		Ok(())
	}
}

impl UnpackedStore for UnpackedDir {
	fn read(&self, path: &str) -> Result<Vec<u8>> {
		let on_disk = self.path_of(path);
		fs::read(&on_disk).map_err(|err| match err.kind() {
			std::io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
			_ => Error::Io(err),
		})
	}
}
