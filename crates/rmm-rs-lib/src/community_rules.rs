//! Externally curated ordering rules.
//!
//! The rule database is distributed as a package on the content service. Its `communityRules.json` maps
//! package ids to extra `loadBefore`/`loadAfter` lists for packages that don't declare enough of their own.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::package::normalize_ids;

/// Content id of the package holding the rule database.
pub const RULES_CONTENT_ID: u64 = 1847679158;
/// Directory name of the rule database package once installed.
pub const RULES_PACKAGE_DIR: &str = "rupal.rimpymodmanagerdatabase";

/// Location of the rules file inside a mods directory.
pub fn rules_path(mods_dir: impl AsRef<Path>) -> PathBuf {
	mods_dir.as_ref().join(RULES_PACKAGE_DIR).join("db").join("communityRules.json")
}

/// Finds an installed rules file, the package may be installed under its package id or its content id.
pub fn find_rules_file(mods_dir: impl AsRef<Path>) -> Option<PathBuf> {
	let mods_dir = mods_dir.as_ref();
	[rules_path(mods_dir), mods_dir.join(RULES_CONTENT_ID.to_string()).join("db").join("communityRules.json")]
		.into_iter()
		.find(|p| p.is_file())
}

/// A list of ids stored either as an array or as an object keyed by id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdList {
	List(Vec<Option<String>>),
	Keyed(BTreeMap<String, serde_json::Value>),
}

impl Default for IdList {
	fn default() -> Self {
		IdList::List(Vec::new())
	}
}

impl IdList {
	fn into_ids(self) -> BTreeSet<String> {
		match self {
			IdList::List(v) => normalize_ids(v.into_iter().flatten()).collect(),
			IdList::Keyed(m) => normalize_ids(m.into_keys()).collect(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RawRule {
	#[serde(default, rename = "loadBefore")]
	load_before: IdList,
	#[serde(default, rename = "loadAfter")]
	load_after: IdList,
}

#[derive(Debug, Deserialize)]
struct RawRules {
	#[serde(default)]
	timestamp: Option<u64>,
	#[serde(default)]
	rules: BTreeMap<String, RawRule>,
}

/// Extra constraints for a single package, same meaning as the fields on [`Package`](crate::Package).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
	pub load_before: BTreeSet<String>,
	pub load_after: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunityRules {
	pub timestamp: Option<u64>,
	entries: BTreeMap<String, RuleEntry>,
}

impl CommunityRules {
	pub fn from_json(json: &str) -> crate::Result<Self> {
		let raw: RawRules = serde_json::from_str(json)?;
		let mut entries = BTreeMap::<String, RuleEntry>::new();
		for (id, rule) in raw.rules {
			let id = id.trim().to_lowercase();
			if id.is_empty() {
				continue;
			}
			/* Ids differing only by case end up merged */
			let entry = entries.entry(id).or_default();
			entry.load_before.extend(rule.load_before.into_ids());
			entry.load_after.extend(rule.load_after.into_ids());
		}
		Ok(Self { timestamp: raw.timestamp, entries })
	}

	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file can't be read.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is not a rules document.
	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let json = std::fs::read_to_string(path)?;
		Self::from_json(&json)
	}

	/// Loads the rules, an absent or broken file gives an empty table.
	pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
		let path = path.as_ref();
		match Self::load_from_file(path) {
			Ok(rules) => {
				log::debug!("Loaded {} community rules from {}", rules.len(), path.display());
				rules
			},
			Err(e) => {
				log::warn!("Community rules unavailable ({}), sorting with declared constraints only", e);
				Self::default()
			}
		}
	}

	pub fn get(&self, id: &str) -> Option<&RuleEntry> {
		self.entries.get(id)
	}

	pub fn insert(&mut self, id: impl AsRef<str>, entry: RuleEntry) {
		self.entries.insert(id.as_ref().to_lowercase(), entry);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_keyed_and_listed_ids() {
		let rules = CommunityRules::from_json(r#"{
			"timestamp": 1700000000,
			"rules": {
				"Some.Mod": {
					"loadAfter": { "Other.Mod": { "name": ["Other"], "comment": ["why"] } },
					"loadBefore": ["third.mod", null, ""]
				},
				"bare.mod": {}
			}
		}"#).unwrap();

		assert_eq!(rules.timestamp, Some(1700000000));
		let entry = rules.get("some.mod").unwrap();
		assert!(entry.load_after.contains("other.mod"));
		assert_eq!(entry.load_before.iter().collect::<Vec<_>>(), vec!["third.mod"]);
		assert_eq!(rules.get("bare.mod"), Some(&RuleEntry::default()));
	}

	#[test]
	fn missing_file_is_empty() {
		let rules = CommunityRules::load_or_empty("/definitely/not/here/communityRules.json");
		assert!(rules.is_empty());
	}

	#[test]
	fn rules_file_under_either_name() {
		let dir = tempfile::tempdir().unwrap();
		assert!(find_rules_file(dir.path()).is_none());

		let by_content_id = dir.path().join("1847679158").join("db");
		std::fs::create_dir_all(&by_content_id).unwrap();
		std::fs::write(by_content_id.join("communityRules.json"), "{}").unwrap();
		assert_eq!(find_rules_file(dir.path()), Some(by_content_id.join("communityRules.json")));

		std::fs::create_dir_all(rules_path(dir.path()).parent().unwrap()).unwrap();
		std::fs::write(rules_path(dir.path()), "{}").unwrap();
		assert_eq!(find_rules_file(dir.path()), Some(rules_path(dir.path())));
	}

	#[test]
	fn not_a_rules_document() {
		assert!(CommunityRules::from_json("[1, 2, 3]").is_err());
	}
}
