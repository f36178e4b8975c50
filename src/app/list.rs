// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::args::ListArgs;
use asar_archive::Archive;
use color_eyre::{eyre::WrapErr, Result};

pub fn list(args: ListArgs) -> Result<()> {
	let file = std::fs::read(&args.archive)
		.wrap_err_with(|| format!("failed to read archive {}", args.archive.display()))?;
	let reader = Archive::decode(&file).wrap_err("failed to read archive")?;
	let mut paths = reader
		.folders()
		.into_iter()
		.map(|path| (path, None))
		.chain(
			reader
				.files()
				.into_iter()
				.map(|(path, file)| (path, Some(file.is_unpacked()))),
		)
		.collect::<Vec<_>>();
	paths.sort();
	for (path, unpacked) in paths {
		if args.is_pack {
			let head = match unpacked {
				Some(true) => "unpack",
				_ => "pack  ",
			};
			println!("{head} : /{path}");
		} else {
			println!("/{path}");
		}
	}

	Ok(())
}
