// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	diagnostics::{Diagnostics, NoDiagnostics},
	error::{Error, Result},
	unpacked::UnpackedDir,
	writer::AsarWriter,
};
use std::{
	collections::HashMap,
	fs::{self, File},
	io::BufWriter,
	path::{Component, Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};
use wax::{Glob, Pattern};

/// How [`pack`] selects and places files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackOptions {
	/// Text file listing archive paths, one per line, that go first.
	pub ordering: Option<PathBuf>,
	/// Files matching this glob are kept beside the archive.
	pub unpack: Option<String>,
	/// Files under a directory matching this glob, or starting with it
	/// literally, are kept beside the archive.
	pub unpack_dir: Option<String>,
	/// Skip files and directories whose name starts with a dot.
	pub exclude_hidden: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
	pub packed: usize,
	pub unpacked: usize,
	pub bytes_written: usize,
}

/// Packs the directory `dir` into the archive `output`. Unpacked files are
/// copied to `<output>.unpacked/`.
pub fn pack(dir: &Path, output: &Path, options: &PackOptions) -> Result<PackSummary> {
	pack_with(dir, output, options, &NoDiagnostics)
}

pub fn pack_with(
	dir: &Path,
	output: &Path,
	options: &PackOptions,
	diagnostics: &dyn Diagnostics,
) -> Result<PackSummary> {
	let unpack = compile_glob(options.unpack.as_deref(), "unpack")?;
	let unpack_dir = compile_glob(options.unpack_dir.as_deref(), "unpack-dir")?;

	let unpacked_dir = UnpackedDir::for_archive(output);
	let mut folders = Vec::new();
	let mut files = Vec::new();
	let walker = WalkDir::new(dir)
		.follow_links(true)
		.sort_by_file_name()
		.into_iter()
		.filter_entry(|entry| {
			entry.depth() == 0
				|| !(entry.path() == output
					|| entry.path() == unpacked_dir.root()
					|| (options.exclude_hidden && is_hidden(entry)))
		});
	for entry in walker {
		let entry = entry.map_err(std::io::Error::from)?;
		if entry.depth() == 0 {
			continue;
		}
		let archive_path = archive_path(dir, entry.path())?;
		if entry.file_type().is_dir() {
			folders.push(archive_path);
		} else if entry.file_type().is_file() {
			files.push((archive_path, entry.into_path()));
		}
	}

	if let Some(ordering) = &options.ordering {
		let ordering = read_ordering(ordering)?;
		let rank = ordering
			.iter()
			.enumerate()
			.map(|(idx, path)| (path.as_str(), idx))
			.collect::<HashMap<_, _>>();
		files.sort_by_key(|(path, _)| rank.get(path.as_str()).copied().unwrap_or(usize::MAX));
		for listed in ordering.iter().filter(|path| !files.iter().any(|(p, _)| p == *path)) {
			diagnostics.warn(format_args!(
				"ordering file lists '{listed}', which is not being packed"
			));
		}
	}

	let mut writer = AsarWriter::new();
	let mut summary = PackSummary::default();
	for folder in &folders {
		writer.write_dir(folder)?;
	}
	for (archive_path, disk_path) in &files {
		let bytes = fs::read(disk_path)?;
		let executable = is_executable::is_executable(disk_path);
		let keep_outside = unpack
			.as_ref()
			.map_or(false, |glob| glob.is_match(archive_path.as_str()))
			|| unpack_dir.as_ref().map_or(false, |glob| {
				in_unpacked_dir(archive_path, glob, options.unpack_dir.as_deref().unwrap_or_default())
			});
		if keep_outside {
			writer.write_unpacked(archive_path, &bytes, executable)?;
			unpacked_dir.write(archive_path, &bytes)?;
			summary.unpacked += 1;
		} else {
			writer.write_file(archive_path, &bytes, executable)?;
			summary.packed += 1;
		}
	}
	if summary.packed + summary.unpacked == 0 {
		diagnostics.warn(format_args!("'{}' contains no files to pack", dir.display()));
	}

	let mut out = BufWriter::new(File::create(output)?);
	summary.bytes_written = writer.finalize(&mut out)?;
	out.into_inner()
		.map_err(|err| err.into_error())?
		.sync_all()?;
	log::debug!(
		"packed {} files ({} unpacked) into {}",
		summary.packed,
		summary.unpacked,
		output.display()
	);
	Ok(summary)
}

fn compile_glob<'t>(expression: Option<&'t str>, flag: &str) -> Result<Option<Glob<'t>>> {
	expression
		.map(Glob::new)
		.transpose()
		.map_err(|err| Error::Glob(format!("failed to parse --{flag} glob: {err}")))
}

fn is_hidden(entry: &DirEntry) -> bool {
	entry
		.file_name()
		.to_str()
		.map_or(false, |name| name.starts_with('.'))
}

/// `path` relative to `dir`, as a `/`-separated archive path.
fn archive_path(dir: &Path, path: &Path) -> Result<String> {
	let stripped = path
		.strip_prefix(dir)
		.map_err(|_| Error::InvalidPath(path.display().to_string()))?;
	let segments = stripped
		.components()
		.map(|component| match component {
			Component::Normal(name) => Ok(name.to_string_lossy().into_owned()),
			_ => Err(Error::InvalidPath(stripped.display().to_string())),
		})
		.collect::<Result<Vec<_>>>()?;
	Ok(segments.join("/"))
}

/// Whether any directory above `path` matches `glob` or starts with the
/// literal `expression`.
fn in_unpacked_dir(path: &str, glob: &Glob<'_>, expression: &str) -> bool {
	path.match_indices('/')
		.map(|(idx, _)| &path[..idx])
		.any(|ancestor| ancestor.starts_with(expression) || glob.is_match(ancestor))
}

/// Parses an ordering file. Lines may be `name:path`, in which case only the
/// part after the last colon counts; a leading `/` is ignored.
pub fn parse_ordering(text: &str) -> Vec<String> {
	text.lines()
		.map(|line| line.rsplit(':').next().unwrap_or(line).trim())
		.map(|line| line.trim_start_matches('/'))
		.filter(|line| !line.is_empty())
		.map(str::to_string)
		.collect()
}

fn read_ordering(path: &Path) -> Result<Vec<String>> {
	Ok(parse_ordering(&fs::read_to_string(path)?))
}

#[cfg(test)]
mod test {
	use super::{in_unpacked_dir, parse_ordering};
	use wax::Glob;

	#[test]
	fn ordering_lines() {
		let text = "/lib/index.js\n  package.json  \n\nchunk:assets/logo.png\n";
		assert_eq!(
			parse_ordering(text),
			["lib/index.js", "package.json", "assets/logo.png"]
		);
	}

	#[test]
	fn unpack_dir_matching() {
		let glob = Glob::new("node_modules/*").unwrap();
		assert!(in_unpacked_dir("node_modules/addon/index.node", &glob, "node_modules/*"));
		assert!(!in_unpacked_dir("node_modules.txt", &glob, "node_modules/*"));

		let literal = Glob::new("native").unwrap();
		assert!(in_unpacked_dir("native-deps/lib.so", &literal, "native"));
		assert!(!in_unpacked_dir("src/native.rs", &literal, "native"));
	}
}
