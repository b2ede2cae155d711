//! Various types associated with packages.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::workshop::WorkshopResult;

/// Whether a package is part of the active load order.
///
/// Not intrinsic to a package, it is assigned by comparing against the active ids of a [`ModsConfig`](crate::ModsConfig).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnabledState {
	#[default] Unknown,
	Active,
	Inactive,
}

/// An installed package ("mod") and the metadata used to order it.
///
/// Ordering fields always hold lower-cased package ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
	/// Lower-cased package id. `None` only for stubs created from search results or mod lists.
	pub id: Option<String>,
	pub name: Option<String>,
	pub author: String,
	/// Id on the content sharing service.
	pub content_id: Option<u64>,
	/// Ids which have to load later than this package.
	pub load_before: BTreeSet<String>,
	/// Ids which have to load earlier than this package.
	pub load_after: BTreeSet<String>,
	/// Ids which can't be active at the same time as this package.
	pub incompatible_with: BTreeSet<String>,
	pub supported_versions: Vec<String>,
	/// Name of the directory the package is installed in.
	pub dir_name: Option<String>,
	/// Package has a `.rmm_ignore` marker and is skipped by bulk updates.
	pub ignored: bool,
	pub repo_url: Option<String>,
	pub enabled: EnabledState,
}

impl Package {
	/// Creates a package with only an id, the id is lower-cased.
	pub fn new(id: impl AsRef<str>) -> Self {
		Self {
			id: Some(id.as_ref().to_lowercase()),
			author: String::from("Unknown"),
			..Default::default()
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_author(mut self, author: impl Into<String>) -> Self {
		self.author = author.into();
		self
	}

	pub fn with_content_id(mut self, content_id: u64) -> Self {
		self.content_id = Some(content_id);
		self
	}

	pub fn load_before<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		self.load_before.extend(normalize_ids(ids));
		self
	}

	pub fn load_after<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		self.load_after.extend(normalize_ids(ids));
		self
	}

	pub fn incompatible_with<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		self.incompatible_with.extend(normalize_ids(ids));
		self
	}

	/// Package id, or an empty string for stubs.
	pub fn id_str(&self) -> &str {
		self.id.as_deref().unwrap_or_default()
	}

	/// Human readable title: the package id, falling back to "name by author".
	pub fn title(&self) -> String {
		match (&self.id, &self.name) {
			(Some(id), _) => id.clone(),
			(None, Some(name)) => format!("{} by {}", name, self.author),
			(None, None) => self.content_id.map(|c| c.to_string()).unwrap_or_else(|| String::from("unknown")),
		}
	}

	/// Checks if a package matches a term by name, author or content id.
	pub fn matches_term(&self, term: &str) -> bool {
		let term_lower = term.to_lowercase();
		self.name.as_ref().map_or(false, |n| n.to_lowercase().contains(&term_lower))
			|| self.author.to_lowercase().contains(&term_lower)
			|| self.content_id.map_or(false, |c| c.to_string() == term)
	}

	/// Has no ordering declarations at all.
	pub fn is_unconstrained(&self) -> bool {
		self.load_before.is_empty() && self.load_after.is_empty()
	}
}

impl PartialEq for Package {
	/// Packages are equal when they share a package id, or when either lacks one and they share a content id.
	fn eq(&self, other: &Self) -> bool {
		match (&self.id, &other.id) {
			(Some(a), Some(b)) => a == b,
			_ => self.content_id.is_some() && self.content_id == other.content_id,
		}
	}
}

/// Lower-cases ids and drops empty entries.
pub fn normalize_ids<S: AsRef<str>>(ids: impl IntoIterator<Item = S>) -> impl Iterator<Item = String> {
	ids.into_iter()
		.map(|s| s.as_ref().trim().to_lowercase())
		.filter(|s| !s.is_empty())
}

/// Either a package found on disk or a remote search result that has not been installed.
#[derive(Debug, Clone)]
pub enum PackageRef {
	Local(Package),
	Workshop(WorkshopResult),
}

impl PackageRef {
	pub fn content_id(&self) -> Option<u64> {
		match self {
			PackageRef::Local(p) => p.content_id,
			PackageRef::Workshop(w) => Some(w.content_id),
		}
	}

	pub fn title(&self) -> String {
		match self {
			PackageRef::Local(p) => p.title(),
			PackageRef::Workshop(w) => format!("{} by {}", w.name.as_deref().unwrap_or("unknown"), w.author.as_deref().unwrap_or("unknown")),
		}
	}

	/// Converts into a package, search results become id-less stubs carrying only their service metadata.
	pub fn into_package(self) -> Package {
		match self {
			PackageRef::Local(p) => p,
			PackageRef::Workshop(w) => Package::from(w),
		}
	}
}

impl From<WorkshopResult> for Package {
	fn from(value: WorkshopResult) -> Self {
		Package {
			id: None,
			name: value.name,
			author: value.author.unwrap_or_else(|| String::from("Unknown")),
			content_id: Some(value.content_id),
			..Default::default()
		}
	}
}

impl From<Package> for PackageRef {
	fn from(value: Package) -> Self {
		PackageRef::Local(value)
	}
}

impl From<WorkshopResult> for PackageRef {
	fn from(value: WorkshopResult) -> Self {
		PackageRef::Workshop(value)
	}
}
