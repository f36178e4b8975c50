// SPDX-License-Identifier: Apache-2.0 OR MIT
pub mod args;
pub mod extract;
pub mod extract_file;
pub mod list;
#[cfg(feature = "write")]
pub mod pack;

use std::{fs, io, path::Path};

/// Writes extracted bytes, marking the file executable on unix when the
/// archive says so.
pub fn write_output(path: &Path, bytes: &[u8], executable: bool) -> io::Result<()> {
	fs::write(path, bytes)?;
	#[cfg(unix)]
	if executable {
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
	}
	#[cfg(not(unix))]
	let _ = executable;
	Ok(())
}
