//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("fs_extra error: {0}")]
	FsExtra(#[from] fs_extra::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Contents of an About.xml for a fake package.
#[derive(Debug, Clone, Default)]
pub struct AboutFixture {
	pub package_id: String,
	pub name: String,
	pub author: String,
	pub load_before: Vec<String>,
	pub load_after: Vec<String>,
	pub incompatible_with: Vec<String>,
	pub content_id: Option<u64>,
}

impl AboutFixture {
	pub fn new(package_id: &str) -> Self {
		Self {
			package_id: package_id.to_string(),
			name: package_id.to_string(),
			author: String::from("Tester"),
			..Default::default()
		}
	}

	pub fn load_before(mut self, ids: &[&str]) -> Self {
		self.load_before.extend(ids.iter().map(|s| s.to_string()));
		self
	}

	pub fn load_after(mut self, ids: &[&str]) -> Self {
		self.load_after.extend(ids.iter().map(|s| s.to_string()));
		self
	}

	pub fn incompatible_with(mut self, ids: &[&str]) -> Self {
		self.incompatible_with.extend(ids.iter().map(|s| s.to_string()));
		self
	}

	pub fn content_id(mut self, content_id: u64) -> Self {
		self.content_id = Some(content_id);
		self
	}

	fn list(tag: &str, items: &[String]) -> String {
		if items.is_empty() {
			return String::new();
		}
		let items: String = items.iter().map(|i| format!("<li>{}</li>", i)).collect();
		format!("<{tag}>{items}</{tag}>")
	}

	pub fn to_xml(&self) -> String {
		format!(
			"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<ModMetaData><packageId>{}</packageId><name>{}</name><author>{}</author>{}{}{}</ModMetaData>",
			self.package_id,
			self.name,
			self.author,
			Self::list("loadBefore", &self.load_before),
			Self::list("loadAfter", &self.load_after),
			Self::list("incompatibleWith", &self.incompatible_with),
		)
	}

	/// Writes the package into `dir`, creating `About/About.xml` and `About/PublishedFileId.txt` when a content id is set.
	pub fn write_to(&self, dir: &Path) -> Result<()> {
		let about = dir.join("About");
		fs_extra::dir::create_all(&about, false)?;
		fs_extra::file::write_all(about.join("About.xml"), &self.to_xml())?;
		if let Some(content_id) = self.content_id {
			fs_extra::file::write_all(about.join("PublishedFileId.txt"), &content_id.to_string())?;
		}
		Ok(())
	}
}

/// A fake game setup in a temporary directory.
///
/// Contains `Mods`, a user directory with `Config` and `Saves`, and a download cache.
pub struct TestGame {
	root: tempfile::TempDir,
}

impl TestGame {
	pub fn new() -> Result<Self> {
		let root = tempfile::tempdir()?;
		let game = Self { root };
		fs_extra::dir::create_all(game.mods_dir(), false)?;
		fs_extra::dir::create_all(game.user_dir().join("Config"), false)?;
		fs_extra::dir::create_all(game.user_dir().join("Saves"), false)?;
		fs_extra::dir::create_all(game.cache_dir(), false)?;
		fs_extra::file::write_all(game.root.path().join("RimWorld").join("Version.txt"), "1.5.4104 rev435")?;
		Ok(game)
	}

	pub fn root(&self) -> &Path {
		self.root.path()
	}

	pub fn mods_dir(&self) -> PathBuf {
		self.root.path().join("RimWorld").join("Mods")
	}

	pub fn user_dir(&self) -> PathBuf {
		self.root.path().join("user")
	}

	pub fn cache_dir(&self) -> PathBuf {
		self.root.path().join("cache")
	}

	pub fn mods_config_path(&self) -> PathBuf {
		self.user_dir().join("Config").join("ModsConfig.xml")
	}

	/// Installs a fake package into the mods directory under `dir_name`.
	pub fn add_package(&self, dir_name: &str, about: &AboutFixture) -> Result<PathBuf> {
		let dir = self.mods_dir().join(dir_name);
		about.write_to(&dir)?;
		Ok(dir)
	}

	/// Puts a fake package in the download cache as if it had just been downloaded.
	pub fn add_download(&self, content_id: u64, about: &AboutFixture) -> Result<PathBuf> {
		let dir = self.cache_dir().join("downloads").join(content_id.to_string());
		about.write_to(&dir)?;
		Ok(dir)
	}

	pub fn write_mods_config(&self, active: &[&str]) -> Result<()> {
		let items: String = active.iter().map(|i| format!("<li>{}</li>", i)).collect();
		let xml = format!(
			"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<ModsConfigData><version>1.5.4104 rev435</version><activeMods>{}</activeMods><knownExpansions><li>ludeon.rimworld.royalty</li></knownExpansions></ModsConfigData>",
			items,
		);
		fs_extra::file::write_all(self.mods_config_path(), &xml)?;
		Ok(())
	}

	pub fn read_mods_config(&self) -> Result<String> {
		Ok(fs_extra::file::read_to_string(self.mods_config_path())?)
	}

	/// Config pointing at this game's directories.
	pub fn config(&self) -> rmm_rs::Config {
		let mut config = rmm_rs::Config::default();
		config.set_mods_dir(Some(self.mods_dir()));
		config.set_user_dir(Some(self.user_dir()));
		config.set_cache_dir(self.cache_dir());
		config
	}
}
