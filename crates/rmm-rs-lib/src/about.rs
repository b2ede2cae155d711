//! Reads a package's metadata from its `About/About.xml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;

use crate::package::{normalize_ids, Package};

/// Marker file excluding a package from bulk updates.
pub const IGNORE_MARKER: &str = ".rmm_ignore";

/// Top level fields of an About.xml, keys are lower-cased element names.
#[derive(Debug, Default)]
struct AboutXml {
	fields: HashMap<String, String>,
	lists: HashMap<String, Vec<String>>,
}

impl AboutXml {
	fn add_text(&mut self, path: &[String], text: &str) {
		if text.is_empty() {
			return;
		}
		match path {
			[_, field] => self.fields.entry(field.clone()).or_default().push_str(text),
			[_, field, li] if li == "li" => self.lists.entry(field.clone()).or_default().push(text.to_string()),
			_ => {},
		}
	}

	fn field(&self, name: &str) -> Option<&str> {
		self.fields.get(name).map(String::as_str).filter(|s| !s.is_empty())
	}

	fn list(&self, name: &str) -> &[String] {
		self.lists.get(name).map(Vec::as_slice).unwrap_or_default()
	}
}

fn parse_about_xml(xml: &str) -> crate::Result<AboutXml> {
	let mut reader = quick_xml::Reader::from_str(xml);
	reader.trim_text(true);

	let mut about = AboutXml::default();
	let mut path = Vec::<String>::new();
	loop {
		match reader.read_event()? {
			Event::Start(e) => path.push(String::from_utf8_lossy(e.name().as_ref()).to_lowercase()),
			Event::End(_) => { path.pop(); },
			Event::Text(t) => about.add_text(&path, t.unescape()?.trim()),
			Event::CData(c) => about.add_text(&path, String::from_utf8_lossy(&c.into_inner()).trim()),
			Event::Eof => break,
			_ => {},
		}
	}
	Ok(about)
}

/// Builds a package from the contents of an About.xml.
///
/// Returns `Ok(None)` when no package id is declared and none can be inferred from the name and author.
pub fn parse_about(xml: &str) -> crate::Result<Option<Package>> {
	let about = parse_about_xml(xml)?;

	let author = about.field("author")
		.map(str::to_string)
		.or_else(|| {
			let authors = if about.list("author").is_empty() { about.list("authors") } else { about.list("author") };
			(!authors.is_empty()).then(|| authors.join(", "))
		})
		.unwrap_or_else(|| String::from("Unknown"));
	let name = about.field("name").map(str::to_string);

	let id = match about.field("packageid") {
		Some(id) => id.to_lowercase(),
		None => match &name {
			/* Older packages don't declare an id, the game falls back to something similar */
			Some(name) if author != "Unknown" => format!("{}.{}", name, author).to_lowercase(),
			_ => return Ok(None),
		},
	};

	Ok(Some(Package {
		id: Some(id),
		name,
		author,
		load_before: normalize_ids(about.list("loadbefore")).collect(),
		load_after: normalize_ids(about.list("loadafter")).collect(),
		incompatible_with: normalize_ids(about.list("incompatiblewith")).collect(),
		supported_versions: about.list("supportedversions").to_vec(),
		..Default::default()
	}))
}

/// Finds a child of `dir` by name, ignoring ASCII case.
fn find_child_ignore_case(dir: &Path, name: &str) -> Option<PathBuf> {
	let exact = dir.join(name);
	if exact.exists() {
		return Some(exact);
	}
	dir.read_dir().ok()?
		.filter_map(|e| e.ok())
		.find(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(name))
		.map(|e| e.path())
}

/// Reads the content service id from `About/PublishedFileId.txt`.
pub fn read_content_id(package_dir: &Path) -> Option<u64> {
	let about_dir = find_child_ignore_case(package_dir, "About")?;
	let text = std::fs::read_to_string(about_dir.join("PublishedFileId.txt")).ok()?;
	let text: String = text.chars().filter(char::is_ascii).collect();
	text.trim().parse().ok()
}

/// Reads the package installed in `package_dir`.
///
/// Anything that isn't a readable package is logged and treated as absent.
pub fn read_package(package_dir: &Path) -> Option<Package> {
	let about_path = find_child_ignore_case(package_dir, "About")
		.and_then(|about_dir| find_child_ignore_case(&about_dir, "About.xml"));

	let about_path = match about_path {
		Some(p) => p,
		None => {
			log::debug!("No About.xml found in {}", package_dir.display());
			return None;
		}
	};

	let xml = match std::fs::read_to_string(&about_path) {
		Ok(xml) => xml,
		Err(e) => {
			log::warn!("Ignoring {}: {}", package_dir.display(), e);
			return None;
		}
	};

	let mut package = match parse_about(xml.trim_start_matches('\u{feff}')) {
		Ok(Some(p)) => p,
		Ok(None) => {
			log::warn!("Ignoring {}: no package id declared or inferable", package_dir.display());
			return None;
		},
		Err(e) => {
			log::warn!("Ignoring {}: {} contains invalid XML: {}", package_dir.display(), about_path.display(), e);
			return None;
		}
	};

	package.content_id = read_content_id(package_dir);
	package.ignored = package_dir.join(IGNORE_MARKER).is_file();
	package.dir_name = package_dir.file_name().map(|n| n.to_string_lossy().to_string());

	log::trace!("Read package {} from {}", package.id_str(), package_dir.display());
	Some(package)
}
