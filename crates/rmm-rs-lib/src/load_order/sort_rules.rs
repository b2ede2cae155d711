//! Fixed ordering knowledge that doesn't come from package metadata.

/// Two packages which must be ordered a specific way, but only when both are active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOverride {
	pub first: String,
	pub second: String,
}

impl PairOverride {
	pub fn new(first: impl AsRef<str>, second: impl AsRef<str>) -> Self {
		Self { first: first.as_ref().to_lowercase(), second: second.as_ref().to_lowercase() }
	}
}

/// Tables used when building the constraint graph.
///
/// Constructed once and never mutated by the sort, [`Default`] holds the built in tables.
#[derive(Debug, Clone)]
pub struct SortRules {
	/// Packages which always load first, in this exact order.
	pub priority: Vec<String>,
	/// Compatibility shims which have to be ordered after every other active package.
	pub shims: Vec<String>,
	pub pair_overrides: Vec<PairOverride>,
	/// Packages shipped with the game. They count as installed even though they aren't in the mods directory.
	pub known_expansions: Vec<String>,
	/// Number of cycle breaking attempts before the sort gives up.
	pub max_attempts: usize,
}

pub const CORE_ID: &str = "ludeon.rimworld";

pub const EXPANSION_IDS: &[&str] = &[
	CORE_ID,
	"ludeon.rimworld.royalty",
	"ludeon.rimworld.ideology",
	"ludeon.rimworld.biotech",
	"ludeon.rimworld.anomaly",
];

/// Packages that patch the game itself and have to load before the core.
pub const BEFORE_CORE_IDS: &[&str] = &[
	"brrainz.harmony",
	"me.samboycoding.betterloading",
];

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

impl Default for SortRules {
	fn default() -> Self {
		Self {
			priority: BEFORE_CORE_IDS.iter().chain(EXPANSION_IDS).map(|s| s.to_string()).collect(),
			shims: vec![String::from("krkr.rocketman")],
			pair_overrides: vec![PairOverride::new("murmur.walllight", "juanlopez2008.lightsout")],
			known_expansions: EXPANSION_IDS.iter().map(|s| s.to_string()).collect(),
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}
}

impl SortRules {
	/// Rules with no built in tables, only package declarations are used.
	pub fn empty() -> Self {
		Self {
			priority: Vec::new(),
			shims: Vec::new(),
			pair_overrides: Vec::new(),
			known_expansions: Vec::new(),
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}

	pub fn with_priority<S: AsRef<str>>(mut self, priority: impl IntoIterator<Item = S>) -> Self {
		self.priority = priority.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
		self
	}

	pub fn with_shims<S: AsRef<str>>(mut self, shims: impl IntoIterator<Item = S>) -> Self {
		self.shims = shims.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
		self
	}

	pub fn with_pair_overrides(mut self, overrides: impl IntoIterator<Item = PairOverride>) -> Self {
		self.pair_overrides = overrides.into_iter().collect();
		self
	}

	pub fn with_known_expansions<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		self.known_expansions = ids.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
		self
	}

	pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
		self.max_attempts = max_attempts;
		self
	}
}
