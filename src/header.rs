// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{entry::FolderEntry, error::FormatError};
use byteorder::{ByteOrder, LittleEndian};

/// Value of the first preamble field.
pub const MAGIC: u64 = 4;

/// The byte width of every preamble integer, and the boundary the header
/// is padded to.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
	#[default]
	Dword = 4,
	Qword = 8,
}

impl Alignment {
	#[inline]
	pub const fn width(self) -> usize {
		self as usize
	}

	/// Zero bytes needed after `len` bytes to reach the next boundary.
	#[inline]
	pub const fn padding(self, len: usize) -> usize {
		(self.width() - len % self.width()) % self.width()
	}

	fn read(self, data: &[u8], field: usize) -> Result<u64, FormatError> {
		let start = field * self.width();
		data.get(start..start + self.width())
			.map(|bytes| LittleEndian::read_uint(bytes, self.width()))
			.ok_or(FormatError::Truncated)
	}

	/// Whether `value` can be stored in a field of this width.
	#[inline]
	pub const fn fits(self, value: u64) -> bool {
		self.width() >= 8 || value >> (self.width() * 8) == 0
	}

	fn write(self, out: &mut Vec<u8>, value: usize) -> Result<(), FormatError> {
		let value = u64::try_from(value)
			.ok()
			.filter(|value| self.fits(*value))
			.ok_or(FormatError::HeaderTooLarge(value))?;
		let mut field = [0_u8; 8];
		LittleEndian::write_uint(&mut field, value, self.width());
		out.extend_from_slice(&field[..self.width()]);
		Ok(())
	}

	/// Finds the alignment whose magic field matches the start of `data`.
	///
	/// The widest candidate goes first: a 4-byte archive always carries a
	/// non-zero header length in bytes 4..8, so it can never read as the
	/// 8-byte magic.
	fn detect(data: &[u8]) -> Result<Self, FormatError> {
		if data.len() < Self::Dword.width() {
			return Err(FormatError::Truncated);
		}
		[Self::Qword, Self::Dword]
			.into_iter()
			.find(|alignment| alignment.read(data, 0).map_or(false, |magic| magic == MAGIC))
			.ok_or(FormatError::BadMagic)
	}
}

/// The decoded preamble: alignment, header tree, and where content starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
	pub alignment: Alignment,
	pub root: FolderEntry,
	pub content_offset: usize,
}

impl Header {
	/// Decodes the preamble and header tree, detecting the alignment.
	///
	/// ```text
	/// magic | outer_len | inner_len | json_len | json | padding | content
	/// ```
	/// `outer_len` covers `inner_len` onwards up to the content, `inner_len`
	/// covers `json_len` onwards. Every field is `alignment` bytes wide,
	/// little-endian.
	pub fn decode(data: &[u8]) -> Result<Self, FormatError> {
		let alignment = Alignment::detect(data)?;
		let width = alignment.width();
		let outer_len = to_usize(alignment.read(data, 1)?)?;
		let content_offset = outer_len
			.checked_add(2 * width)
			.filter(|end| *end <= data.len())
			.ok_or(FormatError::Truncated)?;
		let inner_len = to_usize(alignment.read(data, 2)?)?;
		inner_len
			.checked_add(width)
			.filter(|len| *len <= outer_len)
			.ok_or(FormatError::Truncated)?;
		let json_len = to_usize(alignment.read(data, 3)?)?;
		json_len
			.checked_add(width)
			.filter(|len| *len <= inner_len)
			.ok_or(FormatError::Truncated)?;
		let json_start = 4 * width;
		let json_end = json_start + json_len;
		log::debug!(
			"asar header: alignment={}, json_len={}, content_offset={}",
			width,
			json_len,
			content_offset
		);
		let root = FolderEntry::decode(&data[json_start..json_end])?;
		Ok(Self {
			alignment,
			root,
			content_offset,
		})
	}

	/// Encodes the preamble and header tree. Content is not included; it
	/// starts right after the returned bytes.
	pub fn encode(alignment: Alignment, root: &FolderEntry) -> Result<Vec<u8>, FormatError> {
		let json = root
			.encode()
			.map_err(|err| FormatError::MalformedTree(err.to_string()))?;
		let width = alignment.width();
		let padding = alignment.padding(json.len());
		let inner_len = width + json.len() + padding;
		let outer_len = width + inner_len;

		let mut out = Vec::with_capacity(2 * width + outer_len);
		alignment.write(&mut out, MAGIC as usize)?;
		alignment.write(&mut out, outer_len)?;
		alignment.write(&mut out, inner_len)?;
		alignment.write(&mut out, json.len())?;
		out.extend_from_slice(&json);
		out.resize(out.len() + padding, 0);

		if out.len() % width != 0 {
			return Err(FormatError::AlignmentViolation {
				len: out.len(),
				alignment: width,
			});
		}
		log::debug!("encoded asar header: {} bytes", out.len());
		Ok(out)
	}
}

fn to_usize(value: u64) -> Result<usize, FormatError> {
	usize::try_from(value).map_err(|_| FormatError::Truncated)
}
