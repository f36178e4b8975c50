// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	diagnostics::{Diagnostics, NoDiagnostics},
	entry::{Entry, FileEntry, FolderEntry, Walk},
	error::{AccessError, Error, Result},
	header::{Alignment, Header},
	integrity::{self, FileIntegrity, HashAlgorithm, DEFAULT_BLOCK_SIZE},
	path::{join, new_entry_segments, normalize},
	unpacked::UnpackedStore,
};
use std::{borrow::Cow, collections::HashMap, fmt, io::Write, sync::Arc};

/// Where an [`Archive`] is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveState {
	/// Decoded from bytes and not modified since.
	Decoded,
	/// Created empty or modified after decoding.
	Built,
}

/// A borrowed node of the archive tree. The root is always a folder.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryRef<'a> {
	File(&'a FileEntry),
	Folder(&'a FolderEntry),
}

impl<'a> From<&'a Entry> for EntryRef<'a> {
	fn from(entry: &'a Entry) -> Self {
		match entry {
			Entry::File(file) => Self::File(file),
			Entry::Folder(folder) => Self::Folder(folder),
		}
	}
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReadOptions {
	/// Fail with [`AccessError::ChecksumMismatch`] instead of warning when
	/// the integrity check fails.
	pub strict: bool,
}

impl ReadOptions {
	pub const STRICT: Self = Self { strict: true };
}

/// An asar archive held in memory: the header tree, the content region the
/// packed files point into, and a path index over the tree.
///
/// ```rust,no_run
/// use asar_archive::{Archive, ReadOptions, Result};
/// use std::fs;
///
/// fn main() -> Result<()> {
/// 	let archive = Archive::decode(&fs::read("archive.asar")?)?;
/// 	let contents = archive.read_file("/hello.txt", ReadOptions::STRICT)?;
/// 	println!("{}", String::from_utf8_lossy(contents));
/// 	Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Archive {
	alignment: Alignment,
	root: FolderEntry,
	content: Vec<u8>,
	/// Normalized path to the child positions leading to it from the root.
	index: HashMap<String, Vec<usize>>,
	state: ArchiveState,
	diagnostics: Arc<dyn Diagnostics>,
}

impl Archive {
	/// An empty archive with the default alignment.
	pub fn new() -> Self {
		Self::with_alignment(Alignment::default())
	}

	pub fn with_alignment(alignment: Alignment) -> Self {
		Self {
			alignment,
			root: FolderEntry::new(),
			content: Vec::new(),
			index: HashMap::new(),
			state: ArchiveState::Built,
			diagnostics: Arc::new(NoDiagnostics),
		}
	}

	/// Decodes an archive, copying its content region.
	pub fn decode(data: &[u8]) -> Result<Self> {
		Self::decode_with(data, Arc::new(NoDiagnostics))
	}

	/// Decodes an archive, reporting packed files that point past the end of
	/// the content region to `diagnostics`. Such files only fail once read.
	pub fn decode_with(data: &[u8], diagnostics: Arc<dyn Diagnostics>) -> Result<Self> {
		let Header {
			alignment,
			root,
			content_offset,
		} = Header::decode(data)?;
		let mut archive = Self {
			alignment,
			root,
			content: data[content_offset..].to_vec(),
			index: HashMap::new(),
			state: ArchiveState::Decoded,
			diagnostics,
		};
		archive.reindex();
		for (path, file) in archive.files() {
			if let Some(offset) = file.offset() {
				if offset.saturating_add(file.size()) > archive.content.len() as u64 {
					archive.diagnostics.warn(format_args!(
						"'{path}' extends past the {} byte content region",
						archive.content.len()
					));
				}
			}
		}
		Ok(archive)
	}

	/// Replaces the sink that integrity warnings are reported to.
	pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
		self.diagnostics = diagnostics;
		self
	}

	#[inline]
	pub const fn alignment(&self) -> Alignment {
		self.alignment
	}

	#[inline]
	pub const fn root(&self) -> &FolderEntry {
		&self.root
	}

	/// The raw content region, as currently laid out.
	#[inline]
	pub fn content(&self) -> &[u8] {
		&self.content
	}

	#[inline]
	pub const fn state(&self) -> ArchiveState {
		self.state
	}

	/// Finds the node at `path`. `/a/b` and `a/b` are the same node, and
	/// `/` is the root.
	pub fn lookup(&self, path: &str) -> Result<EntryRef<'_>> {
		let key = normalize(path);
		if key.is_empty() {
			return Ok(EntryRef::Folder(&self.root));
		}
		self.index
			.get(&key)
			.and_then(|positions| self.resolve(positions))
			.ok_or_else(|| Error::NotFound(path.to_string()))
	}

	/// Looks up `path` and requires it to be a file.
	pub fn file(&self, path: &str) -> Result<&FileEntry> {
		match self.lookup(path)? {
			EntryRef::File(file) => Ok(file),
			EntryRef::Folder(_) => Err(Error::IsADirectory(path.to_string())),
		}
	}

	/// Reads a packed file's bytes, verifying them when the header carries
	/// integrity details.
	pub fn read_file(&self, path: &str, options: ReadOptions) -> Result<&[u8]> {
		let file = self.file(path)?;
		self.read_entry(&normalize(path), file, options)
	}

	/// Reads the bytes of `file`, which lives at `path`.
	pub fn read_entry(&self, path: &str, file: &FileEntry, options: ReadOptions) -> Result<&[u8]> {
		let offset = file
			.offset()
			.ok_or_else(|| AccessError::Unpacked(path.to_string()))?;
		let data = slice(&self.content, offset, file.size())?;
		self.verify(path, file, data, options)?;
		Ok(data)
	}

	/// Like [`read_file`](Self::read_file), but resolves unpacked files
	/// through `store`. Their bytes are verified the same way.
	pub fn read_file_with<'a>(
		&'a self,
		path: &str,
		store: &dyn UnpackedStore,
		options: ReadOptions,
	) -> Result<Cow<'a, [u8]>> {
		let file = self.file(path)?;
		let path = normalize(path);
		if !file.is_unpacked() {
			return self.read_entry(&path, file, options).map(Cow::Borrowed);
		}
		let data = store.read(&path)?;
		if data.len() as u64 != file.size() {
			self.diagnostics.warn(format_args!(
				"unpacked '{path}' is {} bytes, header says {}",
				data.len(),
				file.size()
			));
		}
		self.verify(&path, file, &data, options)?;
		Ok(Cow::Owned(data))
	}

	fn verify(&self, path: &str, file: &FileEntry, data: &[u8], options: ReadOptions) -> Result<()> {
		match file.integrity() {
			Some(details) => {
				if !integrity::check(data, details, &*self.diagnostics) {
					if options.strict {
						return Err(AccessError::ChecksumMismatch(path.to_string()).into());
					}
					self.diagnostics.warn(format_args!(
						"integrity check failed for '{path}', returning unverified contents"
					));
				}
			}
			None => self.diagnostics.warn(format_args!(
				"'{path}' has no integrity metadata, reading it unchecked"
			)),
		}
		Ok(())
	}

	/// Walks the tree depth-first, see [`FolderEntry::walk`].
	#[inline]
	pub fn walk(&self) -> Walk<'_> {
		self.root.walk()
	}

	/// Every file in walk order, with its normalized path.
	pub fn files(&self) -> Vec<(String, &FileEntry)> {
		self.walk()
			.flat_map(|step| {
				let prefix = step.path;
				step.files
					.into_iter()
					.map(move |(name, file)| (join(&prefix, name), file))
			})
			.collect()
	}

	/// Every folder below the root in walk order.
	pub fn folders(&self) -> Vec<String> {
		self.walk()
			.skip(1)
			.map(|step| step.path)
			.collect()
	}

	/// Adds a packed file, hashing it with SHA256. The bytes are appended to
	/// the content region; missing parent folders are created.
	pub fn insert_file(&mut self, path: &str, bytes: &[u8], executable: bool) -> Result<()> {
		let integrity = FileIntegrity::compute(HashAlgorithm::Sha256, DEFAULT_BLOCK_SIZE, bytes);
		let file = FileEntry::packed(
			self.content.len() as u64,
			bytes.len() as u64,
			executable,
			Some(integrity),
		);
		self.insert_entry(path, file.into())?;
		self.content.extend_from_slice(bytes);
		Ok(())
	}

	/// Adds a file whose bytes are kept outside the archive.
	pub fn insert_unpacked(
		&mut self,
		path: &str,
		size: u64,
		executable: bool,
		integrity: Option<FileIntegrity>,
	) -> Result<()> {
		self.insert_entry(path, FileEntry::unpacked(size, executable, integrity).into())
	}

	/// Adds an empty folder, or does nothing if it already exists.
	pub fn insert_folder(&mut self, path: &str) -> Result<()> {
		match self.lookup(path) {
			Ok(EntryRef::Folder(_)) => Ok(()),
			Ok(EntryRef::File(_)) => Err(Error::AlreadyExists(normalize(path))),
			Err(_) => self.insert_entry(path, FolderEntry::new().into()),
		}
	}

	fn insert_entry(&mut self, path: &str, entry: Entry) -> Result<()> {
		let segments = new_entry_segments(path)?;
		let (name, parents) = segments
			.split_last()
			.ok_or_else(|| Error::InvalidPath(path.to_string()))?;
		let mut folder = &mut self.root;
		let mut walked = String::new();
		for parent in parents {
			walked = join(&walked, parent);
			if folder.get(parent).is_none() {
				folder.insert(parent.to_string(), FolderEntry::new().into());
			}
			folder = match folder.get_mut(parent) {
				Some(Entry::Folder(child)) => child,
				_ => return Err(Error::NotADirectory(walked)),
			};
		}
		if folder.get(name).is_some() {
			return Err(Error::AlreadyExists(join(&walked, name)));
		}
		folder.insert(name.to_string(), entry);
		self.touch();
		Ok(())
	}

	/// Removes the node at `path`. Bytes it occupied stay in the content
	/// region until the next [`resync_offsets`](Self::resync_offsets).
	pub fn remove(&mut self, path: &str) -> Result<Entry> {
		let key = normalize(path);
		let not_found = || Error::NotFound(path.to_string());
		let (parent, name) = match key.rsplit_once('/') {
			Some((parent, name)) => (parent, name),
			None if key.is_empty() => return Err(Error::InvalidPath(path.to_string())),
			None => ("", key.as_str()),
		};
		let positions = match parent {
			"" => Vec::new(),
			parent => self.index.get(parent).cloned().ok_or_else(not_found)?,
		};
		let mut folder = &mut self.root;
		for idx in positions {
			folder = match folder.children_mut().get_mut(idx) {
				Some((_, Entry::Folder(child))) => child,
				_ => return Err(not_found()),
			};
		}
		let removed = folder.remove(name).ok_or_else(not_found)?;
		self.touch();
		Ok(removed)
	}

	/// Reassigns every packed file's offset as the running total of the
	/// sizes before it, in ascending-name depth-first order, and moves the
	/// bytes to match. Afterwards the content region is exactly the packed
	/// files back to back, with nothing removed or replaced left behind.
	///
	/// On error the archive is left untouched.
	pub fn resync_offsets(&mut self) -> Result<()> {
		let mut root = self.root.clone();
		let mut content = Vec::with_capacity(self.content.len());
		resync_folder(&mut root, "", &self.content, &mut content)?;
		log::debug!(
			"resynced content region: {} -> {} bytes",
			self.content.len(),
			content.len()
		);
		self.root = root;
		self.content = content;
		Ok(())
	}

	/// Resyncs offsets and encodes the whole archive.
	pub fn serialize(&mut self) -> Result<Vec<u8>> {
		self.resync_offsets()?;
		let mut out = Header::encode(self.alignment, &self.root)?;
		out.extend_from_slice(&self.content);
		Ok(out)
	}

	/// Serializes the archive into `writer`, returning the bytes written.
	pub fn write_to<W: Write>(&mut self, mut writer: W) -> Result<usize> {
		let bytes = self.serialize()?;
		writer.write_all(&bytes)?;
		writer.flush()?;
		Ok(bytes.len())
	}

	fn touch(&mut self) {
		self.state = ArchiveState::Built;
		self.reindex();
	}

	fn reindex(&mut self) {
		let mut index = HashMap::new();
		index_folder(&self.root, "", &mut Vec::new(), &mut index);
		self.index = index;
	}

	fn resolve(&self, positions: &[usize]) -> Option<EntryRef<'_>> {
		let mut current = EntryRef::Folder(&self.root);
		for idx in positions {
			current = match current {
				EntryRef::Folder(folder) => folder.child_at(*idx)?.into(),
				EntryRef::File(_) => return None,
			};
		}
		Some(current)
	}
}

impl Default for Archive {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Archive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Archive")
			.field("alignment", &self.alignment)
			.field("state", &self.state)
			.field("root", &self.root)
			.field("content_len", &self.content.len())
			.finish_non_exhaustive()
	}
}

fn index_folder(
	folder: &FolderEntry,
	prefix: &str,
	positions: &mut Vec<usize>,
	index: &mut HashMap<String, Vec<usize>>,
) {
	for (idx, (name, entry)) in folder.iter().enumerate() {
		let path = join(prefix, name);
		positions.push(idx);
		if let Entry::Folder(child) = entry {
			index_folder(child, &path, positions, index);
		}
		index.insert(path, positions.clone());
		positions.pop();
	}
}

fn resync_folder(
	folder: &mut FolderEntry,
	prefix: &str,
	old: &[u8],
	new: &mut Vec<u8>,
) -> Result<()> {
	let children = folder.children_mut();
	let mut order = (0..children.len()).collect::<Vec<_>>();
	order.sort_unstable_by(|a, b| children[*a].0.cmp(&children[*b].0));
	for idx in order {
		let (name, entry) = &mut children[idx];
		match entry {
			Entry::Folder(child) => resync_folder(child, &join(prefix, name.as_str()), old, new)?,
			Entry::File(file) => {
				if let Some(offset) = file.offset() {
					let bytes = slice(old, offset, file.size())?;
					file.set_offset(new.len() as u64);
					new.extend_from_slice(bytes);
				}
			}
		}
	}
	Ok(())
}

fn slice(content: &[u8], offset: u64, size: u64) -> std::result::Result<&[u8], AccessError> {
	let out_of_range = || AccessError::OutOfRange {
		offset,
		size,
		len: content.len(),
	};
	let start = usize::try_from(offset).map_err(|_| out_of_range())?;
	let len = usize::try_from(size).map_err(|_| out_of_range())?;
	let end = start
		.checked_add(len)
		.filter(|end| *end <= content.len())
		.ok_or_else(out_of_range)?;
	Ok(&content[start..end])
}
