// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::error::{Error, Result};

/// Splits a POSIX-style path into archive-root-relative segments.
///
/// A leading `/` is ignored, so `/a/b` and `a/b` name the same node.
/// Empty and `.` segments are dropped and `..` steps up, never past the root.
pub fn segments(path: &str) -> Vec<&str> {
	let mut out = Vec::new();
	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				out.pop();
			}
			name => out.push(name),
		}
	}
	out
}

/// The canonical spelling of `path`: segments joined by `/`, no leading
/// separator. The archive root is the empty string.
pub fn normalize(path: &str) -> String {
	segments(path).join("/")
}

/// Segments of a path that is about to become a tree node.
///
/// Unlike [`segments`], `..` is rejected rather than resolved, and the root
/// itself is not a valid target.
pub(crate) fn new_entry_segments(path: &str) -> Result<Vec<&str>> {
	let segments = path
		.split('/')
		.filter(|s| !s.is_empty() && *s != ".")
		.collect::<Vec<_>>();
	if segments.is_empty() || segments.iter().any(|s| *s == "..") {
		return Err(Error::InvalidPath(path.to_string()));
	}
	Ok(segments)
}

/// Whether `name` can be a single child name inside a folder.
pub(crate) fn is_valid_name(name: &str) -> bool {
	!name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

pub(crate) fn join(prefix: &str, name: &str) -> String {
	if prefix.is_empty() || prefix == "." {
		name.to_string()
	} else {
		format!("{prefix}/{name}")
	}
}
