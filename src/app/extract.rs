// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::{args::ExtractArgs, write_output};
use asar_archive::{Archive, LogDiagnostics, ReadOptions, UnpackedDir};
use color_eyre::{eyre::WrapErr, Result};
use std::{fs, sync::Arc};

pub fn extract(args: ExtractArgs) -> Result<()> {
	let file = fs::read(&args.archive)
		.wrap_err_with(|| format!("failed to open archive {}", args.archive.display()))?;
	let reader = Archive::decode_with(&file, Arc::new(LogDiagnostics))
		.wrap_err("failed to read archive")?;
	let unpacked = UnpackedDir::for_archive(&args.archive);
	let options = ReadOptions {
		strict: args.strict,
	};
	log::info!("extracting {} to {}", args.archive.display(), args.destination.display());
	for step in reader.walk() {
		let dir = step
			.path
			.split('/')
			.filter(|segment| *segment != ".")
			.fold(args.destination.clone(), |out, segment| out.join(segment));
		fs::create_dir_all(&dir)
			.wrap_err_with(|| format!("failed to create directory {}", dir.display()))?;
		for (name, entry) in step.files {
			let archive_path = format!("{}/{}", step.path, name);
			let out_path = dir.join(name);
			let bytes = reader
				.read_file_with(&archive_path, &unpacked, options)
				.wrap_err_with(|| format!("failed to read {archive_path} from archive"))?;
			write_output(&out_path, &bytes, entry.executable())
				.wrap_err_with(|| format!("failed to write file {}", out_path.display()))?;
		}
	}

	Ok(())
}
