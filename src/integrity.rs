// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{diagnostics::Diagnostics, error::FormatError};
use serde::Serialize;
use serde_json::{Map, Value};
use serde_with::{hex::Hex, serde_as};
use sha2::{digest::FixedOutputReset, Digest, Sha256};
use std::{cell::RefCell, fmt, str::FromStr};

/// Block size used when computing integrity for new files. Matches the
/// block size of the reference asar tooling.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024; // 4 MiB

thread_local! {
	pub static SHA256: RefCell<Sha256> = RefCell::new(Sha256::new());
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum HashAlgorithm {
	/// The SHA-256 hashing algorithm
	#[serde(rename = "SHA256")]
	Sha256,
}

impl HashAlgorithm {
	pub fn hash(&self, data: &[u8]) -> Vec<u8> {
		match self {
			Self::Sha256 => SHA256.with(|hasher| {
				let mut hasher = hasher.borrow_mut();
				hasher.update(data);
				hasher.finalize_fixed_reset().to_vec()
			}),
		}
	}

	/// The name this algorithm has in the header.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Sha256 => "SHA256",
		}
	}
}

impl FromStr for HashAlgorithm {
	type Err = FormatError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		match name {
			"SHA256" => Ok(Self::Sha256),
			other => Err(FormatError::UnsupportedAlgorithm(other.to_string())),
		}
	}
}

impl fmt::Display for HashAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Hashes recorded for a file: one over the whole content, and one per
/// `block_size` chunk so a corrupt block can be pinpointed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIntegrity {
	/// The hashing algorithm used to calculate the hash.
	algorithm: HashAlgorithm,
	/// The hash of the file, in hex format.
	#[serde_as(as = "Hex")]
	hash: Vec<u8>,
	/// The size of each "block" to be hashed in a file.
	block_size: usize,
	/// The hash of each "block" in a file.
	#[serde_as(as = "Vec<Hex>")]
	blocks: Vec<Vec<u8>>,
}

impl FileIntegrity {
	pub fn new(
		algorithm: HashAlgorithm,
		hash: Vec<u8>,
		block_size: usize,
		blocks: Vec<Vec<u8>>,
	) -> Self {
		Self {
			algorithm,
			hash,
			block_size,
			blocks,
		}
	}

	/// Hashes `data` as a whole and in `block_size` chunks.
	pub fn compute(algorithm: HashAlgorithm, block_size: usize, data: &[u8]) -> Self {
		let block_size = block_size.max(1);
		let blocks = data
			.chunks(block_size)
			.map(|block| algorithm.hash(block))
			.collect();
		Self::new(algorithm, algorithm.hash(data), block_size, blocks)
	}

	/// The hashing algorithm used to calculate the hash.
	#[inline]
	pub fn algorithm(&self) -> HashAlgorithm {
		self.algorithm
	}

	/// The hash of the file
	#[inline]
	pub fn hash(&self) -> &[u8] {
		&self.hash
	}

	/// The size of each "block" to be hashed in a file.
	#[inline]
	pub fn block_size(&self) -> usize {
		self.block_size
	}

	/// The hash of each "block" in a file.
	#[inline]
	pub fn blocks(&self) -> &[Vec<u8>] {
		&self.blocks
	}

	/// Parses the `integrity` object of a file node.
	pub(crate) fn from_header(value: &Value) -> Result<Self, FormatError> {
		let node = value
			.as_object()
			.ok_or(FormatError::TypeMismatch("integrity"))?;
		let algorithm = required(node, "algorithm")?
			.as_str()
			.ok_or(FormatError::TypeMismatch("algorithm"))?
			.parse::<HashAlgorithm>()?;
		let hash = hex_field(required(node, "hash")?, "hash")?;
		let block_size = required(node, "blockSize")?
			.as_u64()
			.and_then(|size| usize::try_from(size).ok())
			.filter(|size| *size > 0)
			.ok_or(FormatError::TypeMismatch("blockSize"))?;
		let blocks = required(node, "blocks")?
			.as_array()
			.ok_or(FormatError::TypeMismatch("blocks"))?
			.iter()
			.map(|block| hex_field(block, "blocks"))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self::new(algorithm, hash, block_size, blocks))
	}
}

fn required<'a>(node: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, FormatError> {
	node.get(field).ok_or(FormatError::MissingField(field))
}

fn hex_field(value: &Value, field: &'static str) -> Result<Vec<u8>, FormatError> {
	value
		.as_str()
		.and_then(|text| hex::decode(text).ok())
		.ok_or(FormatError::TypeMismatch(field))
}

/// Verifies file content against its [`FileIntegrity`].
pub trait IntegrityChecker: Send + Sync {
	fn digest(&self, data: &[u8]) -> Vec<u8>;

	/// Checks the whole-file hash first, then every block hash in order.
	/// Returns `false` on the first mismatch, reporting it to `diagnostics`.
	fn check(&self, data: &[u8], integrity: &FileIntegrity, diagnostics: &dyn Diagnostics) -> bool {
		let actual = self.digest(data);
		if actual != integrity.hash() {
			diagnostics.error(format_args!(
				"whole-file hash mismatch: got {}, expected {}",
				hex::encode(&actual),
				hex::encode(integrity.hash())
			));
			return false;
		}
		if integrity.block_size() == 0 {
			diagnostics.error(format_args!("block size is zero"));
			return false;
		}
		for (idx, block) in data.chunks(integrity.block_size()).enumerate() {
			let expected = match integrity.blocks().get(idx) {
				Some(expected) => expected,
				None => {
					diagnostics.error(format_args!(
						"block {idx} has no recorded hash ({} blocks recorded)",
						integrity.blocks().len()
					));
					return false;
				}
			};
			let actual = self.digest(block);
			if actual != *expected {
				diagnostics.error(format_args!(
					"block {idx} hash mismatch: got {}, expected {}",
					hex::encode(&actual),
					hex::encode(expected)
				));
				return false;
			}
		}
		true
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Checker;

impl IntegrityChecker for Sha256Checker {
	#[inline]
	fn digest(&self, data: &[u8]) -> Vec<u8> {
		HashAlgorithm::Sha256.hash(data)
	}
}

static SHA256_CHECKER: Sha256Checker = Sha256Checker;

/// The checker registered for `algorithm`.
pub fn checker_for(algorithm: HashAlgorithm) -> &'static dyn IntegrityChecker {
	match algorithm {
		HashAlgorithm::Sha256 => &SHA256_CHECKER,
	}
}

/// Checks `data` with the checker registered for the integrity's algorithm.
pub fn check(data: &[u8], integrity: &FileIntegrity, diagnostics: &dyn Diagnostics) -> bool {
	checker_for(integrity.algorithm()).check(data, integrity, diagnostics)
}

#[cfg(test)]
mod test {
	use super::{check, FileIntegrity, HashAlgorithm};
	use crate::{
		diagnostics::{test::RecordingDiagnostics, NoDiagnostics},
		error::FormatError,
	};
	use log::Level;
	use rand::RngCore;
	use serde_json::json;

	fn random_bytes(len: usize) -> Vec<u8> {
		let mut data = vec![0_u8; len];
		rand::thread_rng().fill_bytes(&mut data);
		data
	}

	#[test]
	fn sha256_known_vector() {
		assert_eq!(
			hex::encode(HashAlgorithm::Sha256.hash(b"abc")),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
		// the thread-local hasher must be reset between calls
		assert_eq!(
			HashAlgorithm::Sha256.hash(b"abc"),
			HashAlgorithm::Sha256.hash(b"abc")
		);
	}

	#[test]
	fn valid_data_passes() {
		let data = random_bytes(10_000);
		let integrity = FileIntegrity::compute(HashAlgorithm::Sha256, 4096, &data);
		assert_eq!(integrity.blocks().len(), 3);
		assert!(check(&data, &integrity, &NoDiagnostics));
	}

	#[test]
	fn any_flipped_byte_fails() {
		let data = random_bytes(300);
		let integrity = FileIntegrity::compute(HashAlgorithm::Sha256, 64, &data);
		for idx in [0, 63, 64, 150, 299] {
			let mut corrupt = data.clone();
			corrupt[idx] ^= 0xff;
			assert!(!check(&corrupt, &integrity, &NoDiagnostics), "byte {idx}");
		}
	}

	#[test]
	fn whole_hash_mismatch_is_logged() {
		let data = random_bytes(42);
		let integrity = FileIntegrity::compute(HashAlgorithm::Sha256, 4096, &data);
		let diagnostics = RecordingDiagnostics::default();
		assert!(!check(&[], &integrity, &diagnostics));
		assert!(diagnostics.contains("whole-file hash mismatch"));
		assert_eq!(diagnostics.count(Level::Error), 1);
	}

	#[test]
	fn missing_block_hash_fails() {
		let data = random_bytes(100);
		let full = FileIntegrity::compute(HashAlgorithm::Sha256, 10, &data);
		let truncated = FileIntegrity::new(
			full.algorithm(),
			full.hash().to_vec(),
			full.block_size(),
			full.blocks()[..9].to_vec(),
		);
		let diagnostics = RecordingDiagnostics::default();
		assert!(!check(&data, &truncated, &diagnostics));
		assert!(diagnostics.contains("block 9"));
	}

	#[test]
	fn wrong_block_hash_fails() {
		let data = random_bytes(100);
		let full = FileIntegrity::compute(HashAlgorithm::Sha256, 10, &data);
		let mut blocks = full.blocks().to_vec();
		blocks.swap(2, 3);
		let swapped =
			FileIntegrity::new(full.algorithm(), full.hash().to_vec(), full.block_size(), blocks);
		let diagnostics = RecordingDiagnostics::default();
		assert!(!check(&data, &swapped, &diagnostics));
		assert!(diagnostics.contains("block 2 hash mismatch"));
	}

	#[test]
	fn parse_header_node() {
		let data = b"hello world";
		let expected = FileIntegrity::compute(HashAlgorithm::Sha256, 4096, data);
		let node = serde_json::to_value(&expected).unwrap();
		assert_eq!(node["algorithm"], "SHA256");
		assert_eq!(node["blockSize"], 4096);
		assert_eq!(FileIntegrity::from_header(&node).unwrap(), expected);
	}

	#[test]
	fn parse_errors() {
		let valid = json!({
			"algorithm": "SHA256",
			"hash": "00ff",
			"blockSize": 4096,
			"blocks": ["00ff"],
		});
		for field in ["algorithm", "hash", "blockSize", "blocks"] {
			let mut node = valid.clone();
			node.as_object_mut().unwrap().remove(field);
			assert_eq!(
				FileIntegrity::from_header(&node),
				Err(FormatError::MissingField(field))
			);
		}

		let mut node = valid.clone();
		node["blockSize"] = json!("4096");
		assert_eq!(
			FileIntegrity::from_header(&node),
			Err(FormatError::TypeMismatch("blockSize"))
		);

		let mut node = valid.clone();
		node["blocks"] = json!([1, 2]);
		assert_eq!(
			FileIntegrity::from_header(&node),
			Err(FormatError::TypeMismatch("blocks"))
		);

		let mut node = valid;
		node["algorithm"] = json!("MD5");
		assert_eq!(
			FileIntegrity::from_header(&node),
			Err(FormatError::UnsupportedAlgorithm("MD5".to_string()))
		);

		assert_eq!(
			FileIntegrity::from_header(&json!([])),
			Err(FormatError::TypeMismatch("integrity"))
		);
	}
}
