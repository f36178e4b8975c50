// SPDX-License-Identifier: Apache-2.0 OR MIT
#![cfg(feature = "write")]

use asar_archive::{
	pack, Archive, Error, PackOptions, ReadOptions, UnpackedDir, UnpackedStore,
};
use include_dir::{include_dir, Dir};
use std::{
	fs,
	path::{Path, PathBuf},
};

static ASAR_CONTENTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/data/contents");

fn contents_dir() -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR")).join("data/contents")
}

fn pack_to(out_dir: &Path, name: &str, options: &PackOptions) -> (PathBuf, Archive) {
	let output = out_dir.join(name);
	pack(&contents_dir(), &output, options).expect("failed to pack fixture");
	let bytes = fs::read(&output).expect("failed to read packed archive");
	(output, Archive::decode(&bytes).expect("failed to decode packed archive"))
}

#[test]
fn pack_and_read_back() {
	let tmp = tempfile::tempdir().unwrap();
	let options = PackOptions {
		unpack: Some("**/*.node".to_string()),
		exclude_hidden: true,
		..Default::default()
	};
	let (output, archive) = pack_to(tmp.path(), "app.asar", &options);

	let files = archive.files();
	assert_eq!(files.len(), 6);
	for (path, file) in &files {
		let real_file = ASAR_CONTENTS
			.get_file(path)
			.unwrap_or_else(|| panic!("archive contains unknown file {path}"));
		assert_eq!(file.size(), real_file.contents().len() as u64);
		if file.is_unpacked() {
			continue;
		}
		assert_eq!(
			archive.read_file(path, ReadOptions::STRICT).unwrap(),
			real_file.contents()
		);
	}

	let addon = archive.file("/assets/addon.node").unwrap();
	assert!(addon.is_unpacked());
	let store = UnpackedDir::for_archive(&output);
	assert_eq!(
		store.read("assets/addon.node").unwrap(),
		ASAR_CONTENTS.get_file("assets/addon.node").unwrap().contents()
	);
	assert_eq!(
		&*archive
			.read_file_with("assets/addon.node", &store, ReadOptions::STRICT)
			.unwrap(),
		ASAR_CONTENTS.get_file("assets/addon.node").unwrap().contents()
	);

	assert!(archive.lookup(".env").is_err());
	assert!(archive.lookup(".cache").is_err());
}

#[test]
fn hidden_files_are_kept_by_default() {
	let tmp = tempfile::tempdir().unwrap();
	let (_, archive) = pack_to(tmp.path(), "all.asar", &PackOptions::default());
	assert_eq!(archive.read_file("/.env", ReadOptions::STRICT).unwrap(), b"hidden\n");
	assert!(archive.file(".cache/entry").is_ok());
	assert!(archive.files().iter().all(|(_, file)| !file.is_unpacked()));
}

#[test]
fn unpack_dir_keeps_whole_directory_outside() {
	let tmp = tempfile::tempdir().unwrap();
	let options = PackOptions {
		unpack_dir: Some("assets".to_string()),
		exclude_hidden: true,
		..Default::default()
	};
	let (output, archive) = pack_to(tmp.path(), "dirs.asar", &options);
	assert!(archive.file("assets/addon.node").unwrap().is_unpacked());
	assert!(archive.file("assets/nested/blob.bin").unwrap().is_unpacked());
	assert!(!archive.file("lib/index.js").unwrap().is_unpacked());
	assert!(output
		.with_file_name("dirs.asar.unpacked/assets/nested/blob.bin")
		.is_file());
}

#[test]
fn ordering_changes_tree_order_not_layout() {
	let tmp = tempfile::tempdir().unwrap();
	let ordering = tmp.path().join("order.txt");
	fs::write(&ordering, "/lib/util.js\npackage.json\nmissing.txt\n").unwrap();

	let plain = PackOptions {
		exclude_hidden: true,
		..Default::default()
	};
	let ordered = PackOptions {
		ordering: Some(ordering),
		..plain.clone()
	};
	let (plain_path, plain_archive) = pack_to(tmp.path(), "plain.asar", &plain);
	let (ordered_path, ordered_archive) = pack_to(tmp.path(), "ordered.asar", &ordered);

	let root_files = |archive: &Archive| {
		archive
			.walk()
			.next()
			.unwrap()
			.files
			.into_iter()
			.map(|(name, _)| name.to_string())
			.collect::<Vec<_>>()
	};
	assert_eq!(root_files(&plain_archive), ["hello.txt", "package.json"]);
	assert_eq!(root_files(&ordered_archive), ["hello.txt", "package.json"]);
	assert_eq!(
		fs::read(plain_path).unwrap(),
		fs::read(ordered_path).unwrap()
	);
}

#[test]
fn repack_into_source_skips_previous_output() {
	let tmp = tempfile::tempdir().unwrap();
	let source = tmp.path().join("app");
	fs::create_dir_all(source.join("lib")).unwrap();
	fs::write(source.join("lib/index.js"), "module.exports = 1;\n").unwrap();
	fs::write(source.join("addon.node"), [0x7f, b'E', b'L', b'F']).unwrap();
	let output = source.join("app.asar");
	let options = PackOptions {
		unpack: Some("*.node".to_string()),
		..Default::default()
	};

	for _ in 0..2 {
		pack(&source, &output, &options).unwrap();
		let archive = Archive::decode(&fs::read(&output).unwrap()).unwrap();
		let mut paths = archive
			.files()
			.into_iter()
			.map(|(path, _)| path)
			.collect::<Vec<_>>();
		paths.sort();
		assert_eq!(paths, ["addon.node", "lib/index.js"]);
		assert!(archive.folders().iter().all(|folder| folder == "lib"));
	}
	assert!(source.join("app.asar.unpacked/addon.node").is_file());
}

#[test]
fn invalid_glob() {
	let tmp = tempfile::tempdir().unwrap();
	let options = PackOptions {
		unpack: Some("{unclosed".to_string()),
		..Default::default()
	};
	let result = pack(&contents_dir(), &tmp.path().join("bad.asar"), &options);
	assert!(matches!(result, Err(Error::Glob(_))));
}
