// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	error::FormatError,
	integrity::FileIntegrity,
	path::{is_valid_name, join},
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr};

/// A node of the header tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
	File(FileEntry),
	Folder(FolderEntry),
}

impl Entry {
	#[inline]
	pub const fn as_file(&self) -> Option<&FileEntry> {
		match self {
			Self::File(file) => Some(file),
			Self::Folder(_) => None,
		}
	}

	#[inline]
	pub const fn as_folder(&self) -> Option<&FolderEntry> {
		match self {
			Self::Folder(folder) => Some(folder),
			Self::File(_) => None,
		}
	}
}

impl From<FileEntry> for Entry {
	fn from(file: FileEntry) -> Self {
		Self::File(file)
	}
}

impl From<FolderEntry> for Entry {
	fn from(folder: FolderEntry) -> Self {
		Self::Folder(folder)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
	size: u64,
	offset: Option<u64>,
	executable: bool,
	integrity: Option<FileIntegrity>,
}

impl FileEntry {
	/// A file stored inside the content region at `offset`.
	pub const fn packed(
		offset: u64,
		size: u64,
		executable: bool,
		integrity: Option<FileIntegrity>,
	) -> Self {
		Self {
			size,
			offset: Some(offset),
			executable,
			integrity,
		}
	}

	/// A file listed in the tree whose bytes live beside the archive.
	pub const fn unpacked(size: u64, executable: bool, integrity: Option<FileIntegrity>) -> Self {
		Self {
			size,
			offset: None,
			executable,
			integrity,
		}
	}

	/// The total size of the file.
	#[inline]
	pub const fn size(&self) -> u64 {
		self.size
	}

	/// The offset from the start of the content region, or `None` if the
	/// file is unpacked.
	#[inline]
	pub const fn offset(&self) -> Option<u64> {
		self.offset
	}

	#[inline]
	pub const fn is_unpacked(&self) -> bool {
		self.offset.is_none()
	}

	/// Whether this file is executable or not.
	#[inline]
	pub const fn executable(&self) -> bool {
		self.executable
	}

	/// Integrity details of the file, such as hashes.
	#[inline]
	pub const fn integrity(&self) -> Option<&FileIntegrity> {
		self.integrity.as_ref()
	}

	pub(crate) fn set_offset(&mut self, offset: u64) {
		self.offset = Some(offset);
	}

	fn from_header(node: &Map<String, Value>) -> Result<Self, FormatError> {
		let size = node
			.get("size")
			.ok_or(FormatError::MissingField("size"))?
			.as_u64()
			.ok_or(FormatError::TypeMismatch("size"))?;
		let unpacked = optional_bool(node, "unpacked")?;
		let executable = optional_bool(node, "executable")?;
		let offset = match node.get("offset") {
			_ if unpacked => None,
			Some(offset) => Some(
				offset
					.as_str()
					.and_then(|text| text.parse::<u64>().ok())
					.ok_or(FormatError::TypeMismatch("offset"))?,
			),
			None => return Err(FormatError::MissingField("offset")),
		};
		let integrity = node
			.get("integrity")
			.map(FileIntegrity::from_header)
			.transpose()?;
		Ok(Self {
			size,
			offset,
			executable,
			integrity,
		})
	}
}

fn optional_bool(node: &Map<String, Value>, field: &'static str) -> Result<bool, FormatError> {
	match node.get(field) {
		None => Ok(false),
		Some(value) => value.as_bool().ok_or(FormatError::TypeMismatch(field)),
	}
}

/// Wire shape of a file node. Offsets go out as decimal strings.
#[serde_as]
#[derive(Serialize)]
struct FileNode<'a> {
	size: u64,
	#[serde_as(as = "Option<DisplayFromStr>")]
	#[serde(skip_serializing_if = "Option::is_none")]
	offset: Option<u64>,
	#[serde(skip_serializing_if = "is_false")]
	unpacked: bool,
	#[serde(skip_serializing_if = "is_false")]
	executable: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	integrity: Option<&'a FileIntegrity>,
}

impl Serialize for FileEntry {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		FileNode {
			size: self.size,
			offset: self.offset,
			unpacked: self.is_unpacked(),
			executable: self.executable,
			integrity: self.integrity.as_ref(),
		}
		.serialize(serializer)
	}
}

const fn is_false(b: &bool) -> bool {
	!*b
}

/// A directory: named children kept in insertion order.
///
/// Two folders are equal when they hold equal children under the same
/// names, whatever order the children were inserted in.
#[derive(Debug, Clone, Default)]
pub struct FolderEntry {
	children: Vec<(String, Entry)>,
}

impl PartialEq for FolderEntry {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len()
			&& self
				.iter()
				.all(|(name, entry)| other.get(name) == Some(entry))
	}
}

impl Eq for FolderEntry {}

impl FolderEntry {
	pub fn new() -> Self {
		Self::default()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.children.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.children.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&Entry> {
		self.position(name).map(|idx| &self.children[idx].1)
	}

	pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
		self.position(name).map(|idx| &mut self.children[idx].1)
	}

	/// Children in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
		self.children.iter().map(|(name, entry)| (name.as_str(), entry))
	}

	/// Children in ascending name order.
	pub fn sorted(&self) -> Vec<(&str, &Entry)> {
		let mut children = self.iter().collect::<Vec<_>>();
		children.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
		children
	}

	/// Adds or replaces a child, returning the entry it replaced.
	/// A replaced child keeps its position.
	pub(crate) fn insert(&mut self, name: String, entry: Entry) -> Option<Entry> {
		match self.position(&name) {
			Some(idx) => Some(std::mem::replace(&mut self.children[idx].1, entry)),
			None => {
				self.children.push((name, entry));
				None
			}
		}
	}

	pub(crate) fn remove(&mut self, name: &str) -> Option<Entry> {
		self.position(name).map(|idx| self.children.remove(idx).1)
	}

	pub(crate) fn position(&self, name: &str) -> Option<usize> {
		self.children.iter().position(|(child, _)| child == name)
	}

	pub(crate) fn child_at(&self, idx: usize) -> Option<&Entry> {
		self.children.get(idx).map(|(_, entry)| entry)
	}

	pub(crate) fn children_mut(&mut self) -> &mut [(String, Entry)] {
		&mut self.children
	}

	/// Depth-first pre-order traversal of the folders. The root comes first
	/// with the path `"."`; every call starts a fresh traversal.
	pub fn walk(&self) -> Walk<'_> {
		Walk {
			stack: vec![(".".to_string(), self)],
		}
	}

	/// Parses the JSON header payload. The root must be a folder node.
	pub fn decode(json: &[u8]) -> Result<Self, FormatError> {
		let value = serde_json::from_slice::<Value>(json)
			.map_err(|err| FormatError::MalformedTree(err.to_string()))?;
		match classify(&value)? {
			Node::Folder(files) => Self::from_header(files),
			Node::File(_) => Err(FormatError::MalformedTree(
				"root node is not a folder".to_string(),
			)),
		}
	}

	/// Serializes this tree as the compact JSON header payload, children in
	/// ascending name order.
	pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}

	fn from_header(files: &Map<String, Value>) -> Result<Self, FormatError> {
		let mut folder = Self::new();
		for (name, node) in files {
			if !is_valid_name(name) {
				return Err(FormatError::MalformedTree(format!(
					"invalid entry name {name:?}"
				)));
			}
			let entry = match classify(node)? {
				Node::Folder(files) => Entry::Folder(Self::from_header(files)?),
				Node::File(file) => Entry::File(FileEntry::from_header(file)?),
			};
			folder.children.push((name.clone(), entry));
		}
		Ok(folder)
	}
}

enum Node<'a> {
	Folder(&'a Map<String, Value>),
	File(&'a Map<String, Value>),
}

/// A node whose only key is `files` is a folder; anything else without a
/// `files` key is a file.
fn classify(value: &Value) -> Result<Node<'_>, FormatError> {
	let node = value
		.as_object()
		.ok_or_else(|| FormatError::MalformedTree(format!("expected an object, got {value}")))?;
	match node.get("files") {
		Some(Value::Object(files)) if node.len() == 1 => Ok(Node::Folder(files)),
		Some(_) => Err(FormatError::MalformedTree(
			"`files` must be the only key of a folder and hold an object".to_string(),
		)),
		None => Ok(Node::File(node)),
	}
}

impl Serialize for FolderEntry {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		struct Sorted<'a>(&'a FolderEntry);

		impl Serialize for Sorted<'_> {
			fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
				serializer.collect_map(self.0.sorted())
			}
		}

		let mut map = serializer.serialize_map(Some(1))?;
		map.serialize_entry("files", &Sorted(self))?;
		map.end()
	}
}

/// One step of [`FolderEntry::walk`]: a folder's path and its direct
/// children split into folders and files, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry<'a> {
	pub path: String,
	pub folders: Vec<(&'a str, &'a FolderEntry)>,
	pub files: Vec<(&'a str, &'a FileEntry)>,
}

pub struct Walk<'a> {
	stack: Vec<(String, &'a FolderEntry)>,
}

impl<'a> Iterator for Walk<'a> {
	type Item = WalkEntry<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let (path, folder) = self.stack.pop()?;
		let mut folders = Vec::new();
		let mut files = Vec::new();
		for (name, entry) in folder.iter() {
			match entry {
				Entry::Folder(child) => folders.push((name, child)),
				Entry::File(file) => files.push((name, file)),
			}
		}
		self.stack.extend(
			folders
				.iter()
				.rev()
				.map(|(name, child)| (join(&path, name), *child)),
		);
		Some(WalkEntry {
			path,
			folders,
			files,
		})
	}
}

#[cfg(test)]
mod test {
	use super::{Entry, FileEntry, FolderEntry};
	use crate::{
		error::FormatError,
		integrity::{FileIntegrity, HashAlgorithm},
	};
	use serde_json::{json, Value};

	static HEADER_JSON: &str = include_str!("../data/header.json");

	fn decode(value: Value) -> Result<FolderEntry, FormatError> {
		FolderEntry::decode(value.to_string().as_bytes())
	}

	#[test]
	fn decode_fixture() {
		let root = FolderEntry::decode(HEADER_JSON.as_bytes()).expect("failed to decode header");
		assert_eq!(
			root.iter().map(|(name, _)| name).collect::<Vec<_>>(),
			["package.json", "lib", "native.node"]
		);
		let native = root.get("native.node").and_then(Entry::as_file).unwrap();
		assert!(native.is_unpacked());
		assert!(native.executable());
		assert_eq!(native.offset(), None);
		let lib = root.get("lib").and_then(Entry::as_folder).unwrap();
		let index = lib.get("index.js").and_then(Entry::as_file).unwrap();
		assert_eq!(index.offset(), Some(17));
		assert_eq!(index.integrity().unwrap().algorithm(), HashAlgorithm::Sha256);
	}

	#[test]
	fn folder_and_file_children() {
		let root = decode(json!({"files": {
			"a.bin": {"size": 1, "offset": "0"},
			"b": {"files": {"c.txt": {"size": 2, "offset": "1"}}},
		}}))
		.unwrap();
		assert_eq!(root.len(), 2);
		assert!(matches!(root.get("a.bin"), Some(Entry::File(_))));
		assert!(matches!(root.get("b"), Some(Entry::Folder(_))));

		let steps = root.walk().collect::<Vec<_>>();
		assert_eq!(steps.len(), 2);
		assert_eq!(steps[0].path, ".");
		assert_eq!(steps[0].folders.len(), 1);
		assert_eq!(steps[0].files.len(), 1);
		assert_eq!(steps[1].path, "b");
		assert_eq!(steps[1].files[0].0, "c.txt");
	}

	#[test]
	fn walk_is_preorder_and_restartable() {
		let root = decode(json!({"files": {
			"z": {"files": {"deep": {"files": {}}}},
			"a": {"files": {}},
		}}))
		.unwrap();
		let paths = root.walk().map(|step| step.path).collect::<Vec<_>>();
		assert_eq!(paths, [".", "z", "z/deep", "a"]);
		assert_eq!(root.walk().count(), 4);
	}

	#[test]
	fn encode_is_sorted_with_string_offsets() {
		let mut root = FolderEntry::new();
		root.insert("b.txt".into(), FileEntry::packed(3, 2, false, None).into());
		root.insert("a.txt".into(), FileEntry::packed(0, 3, true, None).into());
		root.insert("c.node".into(), FileEntry::unpacked(9, false, None).into());
		let json = String::from_utf8(root.encode().unwrap()).unwrap();
		assert_eq!(
			json,
			r#"{"files":{"a.txt":{"size":3,"offset":"0","executable":true},"b.txt":{"size":2,"offset":"3"},"c.node":{"size":9,"unpacked":true}}}"#
		);
	}

	#[test]
	fn encode_then_decode_keeps_integrity() {
		let integrity = FileIntegrity::compute(HashAlgorithm::Sha256, 4, b"0123456789");
		let mut nested = FolderEntry::new();
		nested.insert(
			"digits".into(),
			FileEntry::packed(0, 10, false, Some(integrity)).into(),
		);
		let mut root = FolderEntry::new();
		root.insert("nested".into(), nested.into());
		let decoded = FolderEntry::decode(&root.encode().unwrap()).unwrap();
		assert_eq!(decoded, root);
	}

	#[test]
	fn large_offsets_survive() {
		let root = decode(json!({"files": {
			"big": {"size": 1, "offset": "18446744073709551614"},
		}}))
		.unwrap();
		let big = root.get("big").and_then(Entry::as_file).unwrap();
		assert_eq!(big.offset(), Some(u64::MAX - 1));
	}

	#[test]
	fn unpacked_ignores_offset() {
		let root = decode(json!({"files": {
			"x": {"size": 4, "offset": "12", "unpacked": true},
		}}))
		.unwrap();
		assert!(root.get("x").and_then(Entry::as_file).unwrap().is_unpacked());
	}

	#[test]
	fn field_errors() {
		assert_eq!(
			decode(json!({"files": {"x": {"offset": "0"}}})),
			Err(FormatError::MissingField("size"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1}}})),
			Err(FormatError::MissingField("offset"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": "1", "offset": "0"}}})),
			Err(FormatError::TypeMismatch("size"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1, "offset": 0}}})),
			Err(FormatError::TypeMismatch("offset"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1, "offset": "-3"}}})),
			Err(FormatError::TypeMismatch("offset"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1, "offset": "0", "executable": 1}}})),
			Err(FormatError::TypeMismatch("executable"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1, "unpacked": "yes"}}})),
			Err(FormatError::TypeMismatch("unpacked"))
		);
		assert_eq!(
			decode(json!({"files": {"x": {"size": 1, "offset": "0", "integrity": {
				"algorithm": "CRC32", "hash": "", "blockSize": 1, "blocks": []
			}}}})),
			Err(FormatError::UnsupportedAlgorithm("CRC32".to_string()))
		);
	}

	#[test]
	fn malformed_trees() {
		for bad in [
			json!([]),
			json!({"size": 1, "offset": "0"}),
			json!({"files": {"x": 5}}),
			json!({"files": {"x": {"files": {}, "size": 3}}}),
			json!({"files": {"x": {"files": []}}}),
			json!({"files": {"..": {"files": {}}}}),
			json!({"files": {"a/b": {"size": 1, "offset": "0"}}}),
		] {
			assert!(
				matches!(decode(bad.clone()), Err(FormatError::MalformedTree(_))),
				"{bad} should be malformed"
			);
		}
		assert!(matches!(
			FolderEntry::decode(b"{\"files\":"),
			Err(FormatError::MalformedTree(_))
		));
	}
}
