//! Paths and flags used by the rest of the library.
//!
//! A [`Config`] is built once and passed by reference; nothing in the library keeps its own copy of these paths.
//! Directories are resolved with the preference *explicit argument > environment variable > platform defaults*.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

/// Environment variable pointing at the game's `Mods` directory.
pub const ENV_MODS_PATH: &str = "RMM_PATH";
/// Environment variable pointing at the workshop content directory.
pub const ENV_WORKSHOP_PATH: &str = "RMM_WORKSHOP_PATH";
/// Environment variable pointing at the game's user directory (containing `Config` and `Saves`).
pub const ENV_USER_PATH: &str = "RMM_USER_PATH";

/// Content service app id of the game.
pub const GAME_APP_ID: u64 = 294100;

const DEFAULT_GAME_PATHS: &[(&str, &str)] = &[
	("~/GOG Games/RimWorld", "linux"),
	("~/games/rimworld", "linux"),
	("~/.local/share/Steam/steamapps/common/RimWorld", "linux"),
	("/Applications/RimWorld.app/Mods", "macos"),
	("~/Library/Application Support/Steam/steamapps/common/RimWorld", "macos"),
	("C:/GOG Games/RimWorld/Mods", "windows"),
	("C:/Program Files (x86)/Steam/steamapps/common/RimWorld", "windows"),
	("C:/Program Files/Steam/steamapps/common/RimWorld", "windows"),
];

const DEFAULT_WORKSHOP_PATHS: &[(&str, &str)] = &[
	("~/.local/share/Steam/steamapps/workshop/content/294100", "linux"),
	("~/Library/Application Support/Steam/steamapps/workshop/content/294100", "macos"),
	("C:/Program Files (x86)/Steam/steamapps/common/workshop/content/294100", "windows"),
	("C:/Program Files/Steam/steamapps/common/workshop/content/294100", "windows"),
];

const DEFAULT_USER_PATHS: &[(&str, &str)] = &[
	("~/Library/Application Support/RimWorld/", "macos"),
	("~/.config/unity3d/Ludeon Studios/RimWorld by Ludeon Studios", "linux"),
	("~/AppData/LocalLow/Ludeon Studios/RimWorld by Ludeon Studios", "windows"),
];

/* Searching a whole drive for the game is not reasonable, keep the walk shallow */
const SEARCH_DEPTH: usize = 5;

/// Paths given explicitly by the user, usually from the command line.
#[derive(Debug, Default, Clone)]
pub struct PathOverrides {
	pub mods_dir: Option<PathBuf>,
	pub workshop_dir: Option<PathBuf>,
	pub user_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	mods_dir: Option<PathBuf>,
	workshop_dir: Option<PathBuf>,
	user_dir: Option<PathBuf>,
	cache_dir: PathBuf,
	data_dir: PathBuf,
	/// Install packages into directories named after their package id instead of their content id.
	use_human_names: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			mods_dir: None,
			workshop_dir: None,
			user_dir: None,
			cache_dir: default_base_dir("XDG_CACHE_HOME", ".cache").join("rmm-rs"),
			data_dir: default_data_dir(),
			use_human_names: true,
		}
	}
}

fn home_dir() -> Option<PathBuf> {
	#[cfg(target_os = "windows")]
	let home = std::env::var_os("USERPROFILE");
	#[cfg(not(target_os = "windows"))]
	let home = std::env::var_os("HOME");
	home.map(PathBuf::from)
}

fn default_base_dir(xdg_var: &str, home_relative: &str) -> PathBuf {
	#[cfg(target_os = "windows")]
	{
		let _ = (xdg_var, home_relative);
		std::env::var_os("APPDATA").map(PathBuf::from).unwrap_or_else(std::env::temp_dir)
	}

	#[cfg(not(target_os = "windows"))]
	{
		if let Some(e) = std::env::var_os(xdg_var) {
			PathBuf::from(e)
		} else {
			home_dir().map(|h| h.join(home_relative)).unwrap_or_else(std::env::temp_dir)
		}
	}
}

fn default_data_dir() -> PathBuf {
	default_base_dir("XDG_DATA_HOME", ".local/share").join("rmm-rs")
}

/// Expands a leading `~` and strips the stray quotes windows shells like to leave behind.
pub fn sanitize_path(path: impl AsRef<str>) -> PathBuf {
	let path = path.as_ref().trim().trim_matches('"');
	if let Some(rest) = path.strip_prefix("~/") {
		if let Some(home) = home_dir() {
			return home.join(rest);
		}
	} else if path == "~" {
		if let Some(home) = home_dir() {
			return home;
		}
	}
	PathBuf::from(path)
}

fn current_platform() -> &'static str {
	std::env::consts::OS
}

/// `Mods` directory sitting next to the game's `Version.txt`.
fn is_mods_dir(p: &Path) -> bool {
	p.file_name().map_or(false, |n| n == "Mods")
		&& p.parent().map_or(false, |parent| parent.join("Version.txt").is_file())
}

fn is_workshop_dir(p: &Path) -> bool {
	let mut parts = p.components().rev().map(|c| c.as_os_str().to_string_lossy().to_string());
	parts.next().as_deref() == Some("294100")
		&& parts.next().as_deref() == Some("content")
		&& parts.next().as_deref() == Some("workshop")
}

fn is_user_dir(p: &Path) -> bool {
	p.join("Config").is_dir() && p.join("Saves").is_dir()
}

/// Walks `root` looking for the first directory accepted by `f`.
fn search_root(root: &Path, f: fn(&Path) -> bool) -> Option<PathBuf> {
	if !root.exists() {
		return None;
	}
	walkdir::WalkDir::new(root)
		.max_depth(SEARCH_DEPTH)
		.sort_by_file_name()
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_dir())
		.map(|e| e.into_path())
		.find(|p| f(p))
}

fn search_defaults(defaults: &[(&str, &str)], f: fn(&Path) -> bool) -> Option<PathBuf> {
	defaults.iter()
		.filter(|(_, platform)| *platform == current_platform())
		.find_map(|(path, _)| search_root(&sanitize_path(path), f))
}

pub fn find_mods_dir(root: impl AsRef<Path>) -> Option<PathBuf> {
	search_root(root.as_ref(), is_mods_dir)
}

pub fn find_workshop_dir(root: impl AsRef<Path>) -> Option<PathBuf> {
	search_root(root.as_ref(), is_workshop_dir)
}

pub fn find_user_dir(root: impl AsRef<Path>) -> Option<PathBuf> {
	search_root(root.as_ref(), is_user_dir)
}

/// Derives the workshop directory from a game installed through steam.
pub fn workshop_from_game_path(p: impl AsRef<Path>) -> Option<PathBuf> {
	let p = p.as_ref();
	let mut base = PathBuf::new();
	for component in p.components() {
		if component.as_os_str() == "steamapps" {
			return Some(base.join("steamapps/workshop/content").join(GAME_APP_ID.to_string()));
		}
		base.push(component);
	}
	None
}

fn resolve(explicit: Option<PathBuf>, env_var: &str, find: fn(&Path) -> Option<PathBuf>) -> Option<PathBuf> {
	if let Some(p) = explicit {
		return find(&p);
	}
	std::env::var(env_var).ok().and_then(|p| find(&sanitize_path(p)))
}

impl Config {
	/// Resolves all paths from `overrides`, environment variables and then platform defaults.
	///
	/// Paths that can't be found are left unset, operations needing them will return [`MissingPath`](crate::Error::MissingPath).
	pub fn discover(overrides: PathOverrides) -> Self {
		let mut config = Self::default();

		config.mods_dir = resolve(overrides.mods_dir, ENV_MODS_PATH, |p| find_mods_dir(p))
			.or_else(|| search_defaults(DEFAULT_GAME_PATHS, is_mods_dir));

		config.workshop_dir = resolve(overrides.workshop_dir, ENV_WORKSHOP_PATH, |p| find_workshop_dir(p))
			.or_else(|| config.mods_dir.as_ref().and_then(workshop_from_game_path))
			.or_else(|| search_defaults(DEFAULT_WORKSHOP_PATHS, is_workshop_dir));

		config.user_dir = resolve(overrides.user_dir, ENV_USER_PATH, |p| find_user_dir(p))
			.or_else(|| search_defaults(DEFAULT_USER_PATHS, is_user_dir));

		log::debug!("Resolved mods directory: {:?}", config.mods_dir);
		log::debug!("Resolved workshop directory: {:?}", config.workshop_dir);
		log::debug!("Resolved user directory: {:?}", config.user_dir);

		config
	}

	/// Loads the saved config from the default data directory.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file is missing or unreadable.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file is malformed.
	pub fn load_from_disk() -> crate::Result<Self> {
		let path = default_data_dir().join("config.json");
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(file)?)
	}

	pub fn save_to_disk(&self) -> crate::Result<()> {
		std::fs::create_dir_all(&self.data_dir)?;
		let file = std::fs::File::create(self.data_dir.join("config.json"))?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	/// Fills any unset directory of `self` from `other`.
	pub fn merge_missing(&mut self, other: Config) {
		if self.mods_dir.is_none() { self.mods_dir = other.mods_dir; }
		if self.workshop_dir.is_none() { self.workshop_dir = other.workshop_dir; }
		if self.user_dir.is_none() { self.user_dir = other.user_dir; }
	}

	pub fn mods_dir(&self) -> Option<&Path> {
		self.mods_dir.as_deref()
	}
	pub fn set_mods_dir(&mut self, mods_dir: Option<PathBuf>) {
		self.mods_dir = mods_dir;
	}
	/// Returns the mods directory or a [`MissingPath`](crate::Error::MissingPath) error.
	pub fn require_mods_dir(&self) -> crate::Result<&Path> {
		self.mods_dir().ok_or(crate::Error::MissingPath("mods directory"))
	}

	pub fn workshop_dir(&self) -> Option<&Path> {
		self.workshop_dir.as_deref()
	}
	pub fn set_workshop_dir(&mut self, workshop_dir: Option<PathBuf>) {
		self.workshop_dir = workshop_dir;
	}

	pub fn user_dir(&self) -> Option<&Path> {
		self.user_dir.as_deref()
	}
	pub fn set_user_dir(&mut self, user_dir: Option<PathBuf>) {
		self.user_dir = user_dir;
	}

	/// Location of the game's descriptor listing active packages.
	pub fn mods_config_path(&self) -> Option<PathBuf> {
		self.user_dir().map(|d| d.join("Config").join("ModsConfig.xml"))
	}

	pub fn cache_dir(&self) -> &Path {
		&self.cache_dir
	}
	pub fn set_cache_dir(&mut self, cache_dir: PathBuf) {
		self.cache_dir = cache_dir;
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}

	pub fn use_human_names(&self) -> bool {
		self.use_human_names
	}
	pub fn set_use_human_names(&mut self, use_human_names: bool) {
		self.use_human_names = use_human_names;
	}
}
