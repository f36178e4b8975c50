// SPDX-License-Identifier: Apache-2.0 OR MIT
use serde::de::Error as DeError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;
use thiserror::Error as ThisError;

/// Problems with the archive bytes or the header tree they carry.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FormatError {
	#[error("archive does not start with the asar magic number")]
	BadMagic,
	#[error("archive is truncated")]
	Truncated,
	#[error("malformed header tree: {0}")]
	MalformedTree(String),
	#[error("header is missing the `{0}` field")]
	MissingField(&'static str),
	#[error("header field `{0}` has the wrong type")]
	TypeMismatch(&'static str),
	#[error("unsupported integrity algorithm {0:?}")]
	UnsupportedAlgorithm(String),
	#[error("encoded header is {len} bytes, which is not a multiple of {alignment}")]
	AlignmentViolation { len: usize, alignment: usize },
	#[error("header length {0} does not fit the alignment-width length field")]
	HeaderTooLarge(usize),
}

/// Failures when reading a file's bytes out of an archive.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum AccessError {
	#[error("'{0}' is unpacked, its contents live outside the archive")]
	Unpacked(String),
	#[error("file at offset {offset} with size {size} exceeds the {len} byte content region")]
	OutOfRange { offset: u64, size: u64, len: usize },
	#[error("integrity check failed for '{0}'")]
	ChecksumMismatch(String),
}

#[derive(Debug, ThisError)]
pub enum Error {
	#[error(transparent)]
	Format(#[from] FormatError),
	#[error(transparent)]
	Access(#[from] AccessError),
	#[error("no such file or directory in archive: '{0}'")]
	NotFound(String),
	#[error("invalid archive path: '{0}'")]
	InvalidPath(String),
	#[error("'{0}' already exists in the archive")]
	AlreadyExists(String),
	#[error("'{0}' is not a directory")]
	NotADirectory(String),
	#[error("'{0}' is a directory")]
	IsADirectory(String),
	#[error("I/O error: {0}")]
	Io(#[from] IoError),
	#[error("JSON error: {0}")]
	Json(#[from] JsonError),
	#[error("invalid glob: {0}")]
	Glob(String),
}

impl Clone for Error {
	fn clone(&self) -> Self {
		match self {
			Self::Format(err) => Self::Format(err.clone()),
			Self::Access(err) => Self::Access(err.clone()),
			Self::NotFound(path) => Self::NotFound(path.clone()),
			Self::InvalidPath(path) => Self::InvalidPath(path.clone()),
			Self::AlreadyExists(path) => Self::AlreadyExists(path.clone()),
			Self::NotADirectory(path) => Self::NotADirectory(path.clone()),
			Self::IsADirectory(path) => Self::IsADirectory(path.clone()),
			Self::Io(io_err) => Self::Io(IoError::new(io_err.kind(), io_err.to_string())),
			Self::Json(json_err) => Self::Json(JsonError::custom(json_err.to_string())),
			Self::Glob(msg) => Self::Glob(msg.clone()),
		}
	}
}

impl PartialEq for Error {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Format(a), Self::Format(b)) => a == b,
			(Self::Access(a), Self::Access(b)) => a == b,
			(Self::NotFound(a), Self::NotFound(b))
			| (Self::InvalidPath(a), Self::InvalidPath(b))
			| (Self::AlreadyExists(a), Self::AlreadyExists(b))
			| (Self::NotADirectory(a), Self::NotADirectory(b))
			| (Self::IsADirectory(a), Self::IsADirectory(b))
			| (Self::Glob(a), Self::Glob(b)) => a == b,
			(Self::Io(io_err), Self::Io(other_io_err)) => {
				io_err.kind() == other_io_err.kind()
					&& io_err.raw_os_error() == other_io_err.raw_os_error()
					&& io_err.to_string() == other_io_err.to_string()
			}
			(Self::Json(json_err), Self::Json(other_json_err)) => {
				json_err.line() == other_json_err.line()
					&& json_err.column() == other_json_err.column()
					&& json_err.classify() == other_json_err.classify()
					&& json_err.to_string() == other_json_err.to_string()
			}
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
