//! The game's `ModsConfig.xml`, listing the active packages in activation order.

use std::collections::HashSet;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const ACTIVE_MODS: &[u8] = b"activeMods";

#[derive(Debug, Clone, Default)]
pub struct ModsConfig {
	pub version: Option<String>,
	pub known_expansions: Vec<String>,
	active: Vec<String>,
	/* Document as it was read, everything but the active list is written back untouched */
	source: Option<String>,
}

fn dedup_ids<S: AsRef<str>>(ids: impl IntoIterator<Item = S>) -> Vec<String> {
	let mut seen = HashSet::<String>::new();
	crate::package::normalize_ids(ids)
		.filter(|id| seen.insert(id.clone()))
		.collect()
}

impl ModsConfig {
	pub fn from_xml(xml: &str) -> crate::Result<Self> {
		let xml = xml.trim_start_matches('\u{feff}');
		let mut reader = Reader::from_str(xml);
		reader.trim_text(true);

		let mut config = ModsConfig::default();
		let mut active = Vec::<String>::new();
		let mut path = Vec::<String>::new();
		loop {
			match reader.read_event()? {
				Event::Start(e) => path.push(String::from_utf8_lossy(e.name().as_ref()).to_lowercase()),
				Event::End(_) => { path.pop(); },
				Event::Text(t) => {
					let text = t.unescape()?;
					let p: Vec<&str> = path.iter().map(String::as_str).collect();
					match p.as_slice() {
						[_, "version"] => config.version = Some(text.trim().to_string()),
						[_, "activemods", "li"] => active.push(text.to_string()),
						[_, "knownexpansions", "li"] => config.known_expansions.push(text.trim().to_lowercase()),
						_ => {},
					}
				},
				Event::Eof => break,
				_ => {},
			}
		}

		config.active = dedup_ids(active);
		config.source = Some(xml.to_string());
		Ok(config)
	}

	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file can't be read.
	/// - [`Xml`](crate::Error::Xml) when the file isn't valid XML.
	pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
		let path = path.as_ref();
		let config = Self::from_xml(&std::fs::read_to_string(path)?)?;
		log::debug!("Read {} active packages from {}", config.active.len(), path.display());
		Ok(config)
	}

	pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, self.to_xml()?)?;
		log::info!("Wrote {} active packages to {}", self.active.len(), path.display());
		Ok(())
	}

	/// Serializes the config, replacing only the children of `<activeMods>` in the document that was read.
	pub fn to_xml(&self) -> crate::Result<String> {
		let source = match &self.source {
			Some(s) => s.clone(),
			None => self.fresh_document(),
		};
		rewrite_active(&source, &self.active)
	}

	fn fresh_document(&self) -> String {
		let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?><ModsConfigData>");
		if let Some(version) = &self.version {
			xml.push_str(&format!("<version>{}</version>", quick_xml::escape::escape(version)));
		}
		xml.push_str("<activeMods/><knownExpansions>");
		for id in &self.known_expansions {
			xml.push_str(&format!("<li>{}</li>", quick_xml::escape::escape(id)));
		}
		xml.push_str("</knownExpansions></ModsConfigData>");
		xml
	}

	/// Active ids in activation order.
	pub fn active(&self) -> &[String] {
		&self.active
	}

	pub fn is_active(&self, id: &str) -> bool {
		let id = id.to_lowercase();
		self.active.iter().any(|a| *a == id)
	}

	/// Appends `id` to the end of the active list, returns `false` if it was already active.
	pub fn enable(&mut self, id: &str) -> bool {
		if self.is_active(id) {
			return false;
		}
		self.active.push(id.trim().to_lowercase());
		true
	}

	/// Returns `false` if `id` wasn't active.
	pub fn disable(&mut self, id: &str) -> bool {
		let id = id.to_lowercase();
		let before = self.active.len();
		self.active.retain(|a| *a != id);
		before != self.active.len()
	}

	pub fn set_active<S: AsRef<str>>(&mut self, ids: impl IntoIterator<Item = S>) {
		self.active = dedup_ids(ids);
	}
}

fn write_active_items(writer: &mut Writer<Vec<u8>>, active: &[String]) -> crate::Result<()> {
	for id in active {
		writer.write_event(Event::Start(BytesStart::new("li")))?;
		writer.write_event(Event::Text(BytesText::new(id)))?;
		writer.write_event(Event::End(BytesEnd::new("li")))?;
	}
	Ok(())
}

fn write_active_block(writer: &mut Writer<Vec<u8>>, active: &[String]) -> crate::Result<()> {
	writer.write_event(Event::Start(BytesStart::new("activeMods")))?;
	write_active_items(writer, active)?;
	writer.write_event(Event::End(BytesEnd::new("activeMods")))?;
	Ok(())
}

/// Copies `xml` replacing the contents of the root's `<activeMods>`, adding one if the document has none.
fn rewrite_active(xml: &str, active: &[String]) -> crate::Result<String> {
	let mut reader = Reader::from_str(xml);
	reader.trim_text(true);
	let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

	let mut depth = 0usize;
	let mut skip_depth: Option<usize> = None;
	let mut written = false;
	loop {
		match reader.read_event()? {
			Event::Eof => break,
			Event::Start(e) => {
				depth += 1;
				if skip_depth.is_some() {
					continue;
				}
				let is_active_list = depth == 2 && e.name().as_ref().eq_ignore_ascii_case(ACTIVE_MODS);
				writer.write_event(Event::Start(e))?;
				if is_active_list {
					write_active_items(&mut writer, active)?;
					skip_depth = Some(depth);
					written = true;
				}
			},
			Event::End(e) => {
				if let Some(d) = skip_depth {
					if depth == d {
						skip_depth = None;
						writer.write_event(Event::End(e))?;
					}
					depth -= 1;
					continue;
				}
				if depth == 1 && !written {
					write_active_block(&mut writer, active)?;
					written = true;
				}
				depth = depth.saturating_sub(1);
				writer.write_event(Event::End(e))?;
			},
			Event::Empty(e) => {
				if skip_depth.is_some() {
					continue;
				}
				if depth == 1 && e.name().as_ref().eq_ignore_ascii_case(ACTIVE_MODS) {
					write_active_block(&mut writer, active)?;
					written = true;
				} else {
					writer.write_event(Event::Empty(e))?;
				}
			},
			e => {
				if skip_depth.is_none() {
					writer.write_event(e)?;
				}
			},
		}
	}

	String::from_utf8(writer.into_inner()).map_err(|e| crate::Error::Parse(e.to_string()))
}
