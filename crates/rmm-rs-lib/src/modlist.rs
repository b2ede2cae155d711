//! Plain text lists of packages for sharing a setup.
//!
//! Two formats exist:
//! - [`ModListFormat::V1`] - `<content id># <name> by <author>`, one package per line.
//! - [`ModListFormat::V2`] - `<package id>,<content id>,<repo url>`, any field may be empty.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::package::Package;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModListFormat {
	V1,
	#[default] V2,
}

fn v1_line_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"(?m)^\s?[0-9]+\s?#.*$").expect("v1 line pattern is valid"))
}

fn name_by_author_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"^(.*) by (.*)$").expect("name pattern is valid"))
}

/// Guesses the format, any line starting with a content id and `#` means v1.
pub fn detect_format(text: &str) -> ModListFormat {
	if v1_line_pattern().is_match(text) {
		ModListFormat::V1
	} else {
		ModListFormat::V2
	}
}

fn parse_content_id(s: &str) -> Option<u64> {
	let s: String = s.chars().filter(char::is_ascii).collect();
	s.trim().parse().ok()
}

fn parse_v1_line(line: &str) -> Option<Package> {
	let (content_id, rest) = match line.split_once('#') {
		Some((c, r)) => (c, Some(r.trim())),
		None => (line, None),
	};
	let content_id = parse_content_id(content_id)?;

	let mut package = Package { content_id: Some(content_id), author: String::from("Unknown"), ..Default::default() };
	if let Some(captures) = rest.and_then(|r| name_by_author_pattern().captures(r)) {
		package.name = Some(captures[1].trim().to_string());
		package.author = captures[2].trim().to_string();
	}
	Some(package)
}

fn parse_v2_line(line: &str) -> Option<Package> {
	let mut fields = line.splitn(3, ',').map(str::trim);
	let id = fields.next().filter(|s| !s.is_empty());
	let content_id = fields.next().and_then(parse_content_id);
	let repo_url = fields.next().filter(|s| !s.is_empty()).map(str::to_string);

	if id.is_none() && content_id.is_none() {
		return None;
	}

	let mut package = match id {
		Some(id) => Package::new(id),
		None => Package { author: String::from("Unknown"), ..Default::default() },
	};
	package.content_id = content_id;
	package.repo_url = repo_url;
	Some(package)
}

/// Parses a list in the given format. Lines which can't be read are logged and skipped.
pub fn parse_as(text: &str, format: ModListFormat) -> Vec<Package> {
	let parse_line = match format {
		ModListFormat::V1 => parse_v1_line,
		ModListFormat::V2 => parse_v2_line,
	};

	text.lines()
		.filter(|l| !l.trim().is_empty())
		.filter_map(|l| {
			let parsed = parse_line(l);
			if parsed.is_none() {
				log::warn!("Unable to import line: {}", l);
			}
			parsed
		})
		.collect()
}

pub fn parse(text: &str) -> Vec<Package> {
	parse_as(text, detect_format(text))
}

pub fn format_line(package: &Package, format: ModListFormat) -> String {
	match format {
		ModListFormat::V1 => format!(
			"{}# {} by {}",
			package.content_id.map(|c| c.to_string()).unwrap_or_default(),
			package.name.as_deref().unwrap_or_else(|| package.id_str()),
			package.author,
		),
		ModListFormat::V2 => format!(
			"{},{},{}",
			package.id_str(),
			package.content_id.map(|c| c.to_string()).unwrap_or_default(),
			package.repo_url.as_deref().unwrap_or_default(),
		),
	}
}

pub fn serialize<'a>(packages: impl IntoIterator<Item = &'a Package>, format: ModListFormat) -> String {
	packages.into_iter()
		.map(|p| format_line(p, format) + "\n")
		.collect()
}

pub fn read(path: impl AsRef<Path>) -> crate::Result<Vec<Package>> {
	let text = std::fs::read_to_string(path)?;
	Ok(parse(&text))
}

pub fn write<'a>(path: impl AsRef<Path>, packages: impl IntoIterator<Item = &'a Package>, format: ModListFormat) -> crate::Result<()> {
	std::fs::write(path, serialize(packages, format))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_v1() {
		assert_eq!(detect_format("2009463077# Harmony by Andreas Pardeike\n"), ModListFormat::V1);
		assert_eq!(detect_format("brrainz.harmony,2009463077,\n"), ModListFormat::V2);
	}

	#[test]
	fn reads_v1_lines() {
		let packages = parse("2009463077# Harmony by Andreas Pardeike\n818773962\nnot a line\n");
		assert_eq!(packages.len(), 2);
		assert_eq!(packages[0].content_id, Some(2009463077));
		assert_eq!(packages[0].name.as_deref(), Some("Harmony"));
		assert_eq!(packages[0].author, "Andreas Pardeike");
		assert!(packages[0].id.is_none());
		assert_eq!(packages[1].content_id, Some(818773962));
	}

	#[test]
	fn reads_v2_lines_with_empty_fields() {
		let packages = parse("Brrainz.Harmony,2009463077,\nlocal.mod,,https://example.com/repo\n,,\n");
		assert_eq!(packages.len(), 2);
		assert_eq!(packages[0].id_str(), "brrainz.harmony");
		assert_eq!(packages[0].content_id, Some(2009463077));
		assert!(packages[0].repo_url.is_none());
		assert_eq!(packages[1].content_id, None);
		assert_eq!(packages[1].repo_url.as_deref(), Some("https://example.com/repo"));
	}

	#[test]
	fn writes_both_formats() {
		let p = Package::new("brrainz.harmony").with_name("Harmony").with_author("Brrainz").with_content_id(2009463077);
		assert_eq!(format_line(&p, ModListFormat::V2), "brrainz.harmony,2009463077,");
		assert_eq!(format_line(&p, ModListFormat::V1), "2009463077# Harmony by Brrainz");
	}
}
