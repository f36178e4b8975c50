// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::args::PackArgs;
use asar_archive::{pack::pack_with, LogDiagnostics, PackOptions};
use color_eyre::{eyre::WrapErr, Result};

pub fn pack(args: PackArgs) -> Result<()> {
	let options = PackOptions {
		ordering: args.ordering,
		unpack: args.unpack,
		unpack_dir: args.unpack_dir,
		exclude_hidden: args.exclude_hidden,
	};
	let summary = pack_with(&args.dir, &args.output, &options, &LogDiagnostics)
		.wrap_err_with(|| {
			format!(
				"failed to pack {} into {}",
				args.dir.display(),
				args.output.display()
			)
		})?;
	log::info!(
		"wrote {} ({} bytes, {} files packed, {} unpacked)",
		args.output.display(),
		summary.bytes_written,
		summary.packed,
		summary.unpacked
	);

	Ok(())
}
