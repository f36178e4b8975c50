// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::{args::ExtractFileArgs, write_output};
use asar_archive::{path::segments, Archive, LogDiagnostics, ReadOptions, UnpackedDir};
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use std::{fs, path::Path, sync::Arc};

pub fn extract_file(args: ExtractFileArgs) -> Result<()> {
	let file = fs::read(&args.archive)
		.wrap_err_with(|| format!("failed to open archive {}", args.archive.display()))?;
	let reader = Archive::decode_with(&file, Arc::new(LogDiagnostics))
		.wrap_err("failed to read archive")?;
	let file_name = segments(&args.filename)
		.last()
		.map(|name| name.to_string())
		.ok_or_else(|| eyre!("failed to get file name for {}", args.filename))?;
	let entry = reader
		.file(&args.filename)
		.wrap_err_with(|| format!("failed to find file {}", args.filename))?;
	let bytes = reader
		.read_file_with(
			&args.filename,
			&UnpackedDir::for_archive(&args.archive),
			ReadOptions {
				strict: args.strict,
			},
		)
		.wrap_err_with(|| format!("failed to read {}", args.filename))?;

	write_output(Path::new(&file_name), &bytes, entry.executable())
		.wrap_err_with(|| format!("failed to write contents to {file_name}"))?;

	Ok(())
}
