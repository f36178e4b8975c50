// SPDX-License-Identifier: Apache-2.0 OR MIT
use log::Level;
use std::fmt;

/// A sink for the non-fatal findings of decoding, reading, and packing,
/// such as files without integrity metadata.
///
/// The library never installs a global logger; callers choose where these
/// messages go by handing a sink to [`Archive::with_diagnostics`].
///
/// [`Archive::with_diagnostics`]: crate::Archive::with_diagnostics
pub trait Diagnostics: Send + Sync {
	fn report(&self, level: Level, message: fmt::Arguments<'_>);

	fn warn(&self, message: fmt::Arguments<'_>) {
		self.report(Level::Warn, message)
	}

	fn error(&self, message: fmt::Arguments<'_>) {
		self.report(Level::Error, message)
	}
}

/// Discards everything. This is the default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
	#[inline]
	fn report(&self, _level: Level, _message: fmt::Arguments<'_>) {}
}

/// Forwards to the [`log`] facade under the `asar_archive` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
	fn report(&self, level: Level, message: fmt::Arguments<'_>) {
		log::log!(target: "asar_archive", level, "{}", message);
	}
}
