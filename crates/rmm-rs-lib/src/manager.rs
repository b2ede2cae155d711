//! High level operations combining the rest of the library.

use std::path::Path;

use crate::community_rules::{self, CommunityRules, RULES_CONTENT_ID};
use crate::load_order::{self, Conflict, LoadOrderBuilder, Resolution, SortRules};
use crate::modlist::ModListFormat;
use crate::package::{EnabledState, Package};
use crate::workshop::{SteamCmd, WorkshopResult};
use crate::{Config, ModsConfig};

/// Which packages to include in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFilter {
	#[default] All,
	Enabled,
	Disabled,
}

pub struct Manager {
	config: Config,
	mods_config: Option<ModsConfig>,
	sort_rules: SortRules,
	steamcmd: SteamCmd,
	client: reqwest::Client,
}

/// Record for a package shipped with the game, these don't live in the mods directory.
fn expansion_package(id: &str) -> Package {
	let name = match id.rsplit('.').next() {
		Some("rimworld") | None => String::from("Core"),
		Some(s) => {
			let mut c = s.chars();
			c.next().map(|f| f.to_uppercase().collect::<String>() + c.as_str()).unwrap_or_default()
		},
	};
	let mut p = Package::new(id).with_name(name).with_author("Ludeon Studios");
	p.enabled = EnabledState::Active;
	p
}

impl Manager {
	/// Creates a manager, reading the game's `ModsConfig.xml` if the user directory is known.
	///
	/// # Errors
	/// - [`Xml`](crate::Error::Xml) or [`IO`](crate::Error::IO) when an existing `ModsConfig.xml` can't be read.
	/// - [`Reqwest`](crate::Error::Reqwest) when the http client can't be created.
	pub fn new(config: Config) -> crate::Result<Self> {
		let mods_config = match config.mods_config_path() {
			Some(path) if path.is_file() => Some(ModsConfig::load(&path)?),
			Some(path) => {
				log::warn!("{} doesn't exist, starting with no active packages", path.display());
				Some(ModsConfig::default())
			},
			None => None,
		};

		Ok(Self {
			steamcmd: SteamCmd::new(config.cache_dir()),
			client: crate::workshop::build_client()?,
			config,
			mods_config,
			sort_rules: SortRules::default(),
		})
	}

	pub fn with_sort_rules(mut self, sort_rules: SortRules) -> Self {
		self.sort_rules = sort_rules;
		self
	}

	pub fn with_steamcmd(mut self, steamcmd: SteamCmd) -> Self {
		self.steamcmd = steamcmd;
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn mods_config(&self) -> Option<&ModsConfig> {
		self.mods_config.as_ref()
	}

	fn require_mods_config(&mut self) -> crate::Result<&mut ModsConfig> {
		self.mods_config.as_mut().ok_or(crate::Error::MissingPath("user directory"))
	}

	fn active_ids(&self) -> &[String] {
		self.mods_config.as_ref().map(ModsConfig::active).unwrap_or_default()
	}

	fn write_mods_config(&self) -> crate::Result<()> {
		let path = self.config.mods_config_path().ok_or(crate::Error::MissingPath("user directory"))?;
		match &self.mods_config {
			Some(mods_config) => mods_config.save(path),
			None => Err(crate::Error::MissingPath("user directory")),
		}
	}

	/// Every installed package with its enabled state resolved.
	pub fn installed_mods(&self) -> crate::Result<Vec<Package>> {
		let mut packages = crate::mod_folder::read(self.config.require_mods_dir()?)?;
		if let Some(workshop_dir) = self.config.workshop_dir().filter(|d| d.is_dir()) {
			packages.extend(crate::mod_folder::read(workshop_dir)?);
		}
		let mut packages = crate::mod_folder::dedup_by_id(packages);

		let active = self.active_ids();
		for p in packages.iter_mut() {
			p.enabled = if active.iter().any(|a| Some(a.as_str()) == p.id.as_deref()) {
				EnabledState::Active
			} else {
				EnabledState::Inactive
			};
		}
		Ok(packages)
	}

	pub fn search_installed(&self, term: &str) -> crate::Result<Vec<Package>> {
		Ok(self.installed_mods()?.into_iter().filter(|p| p.matches_term(term)).collect())
	}

	/// Looks up `ids` among installed packages, expansions get a record of their own.
	fn resolve_ids(&self, ids: &[String], installed: &[Package]) -> Vec<Package> {
		ids.iter()
			.filter_map(|id| {
				installed.iter().find(|p| p.id.as_deref() == Some(id.as_str())).cloned()
					.or_else(|| self.sort_rules.known_expansions.contains(id).then(|| expansion_package(id)))
			})
			.collect()
	}

	/// Active packages in activation order.
	pub fn enabled_mods(&self) -> crate::Result<Vec<Package>> {
		let installed = self.installed_mods()?;
		Ok(self.resolve_ids(self.active_ids(), &installed))
	}

	pub fn disabled_mods(&self) -> crate::Result<Vec<Package>> {
		Ok(self.installed_mods()?.into_iter().filter(|p| p.enabled == EnabledState::Inactive).collect())
	}

	/// Activates the ids and writes `ModsConfig.xml`, returns how many weren't already active.
	pub fn enable_mods<S: AsRef<str>>(&mut self, ids: impl IntoIterator<Item = S>) -> crate::Result<usize> {
		let mods_config = self.require_mods_config()?;
		let count = ids.into_iter().filter(|id| mods_config.enable(id.as_ref())).count();
		self.write_mods_config()?;
		Ok(count)
	}

	pub fn disable_mods<S: AsRef<str>>(&mut self, ids: impl IntoIterator<Item = S>) -> crate::Result<usize> {
		let mods_config = self.require_mods_config()?;
		let count = ids.into_iter().filter(|id| mods_config.disable(id.as_ref())).count();
		self.write_mods_config()?;
		Ok(count)
	}

	/// Loads the community rules, downloading them first if they aren't installed.
	///
	/// Never fails, missing rules only mean sorting uses the packages' own declarations.
	pub async fn community_rules(&self) -> CommunityRules {
		let mods_dir = match self.config.require_mods_dir() {
			Ok(d) => d,
			Err(e) => {
				log::warn!("Can't load community rules: {}", e);
				return CommunityRules::default();
			}
		};

		if community_rules::find_rules_file(mods_dir).is_none() {
			log::info!("Community rules not installed, downloading them");
			let installed = self.installed_mods().unwrap_or_default();
			if let Err(e) = self.download_and_install(&[RULES_CONTENT_ID], &installed).await {
				log::warn!("Failed to download community rules: {}", e);
			}
		}

		match community_rules::find_rules_file(mods_dir) {
			Some(path) => CommunityRules::load_or_empty(path),
			None => {
				log::warn!("Community rules unavailable, sorting with declared constraints only");
				CommunityRules::default()
			}
		}
	}

	/// Resolves a new load order for the active packages and writes it to `ModsConfig.xml`.
	///
	/// # Errors
	/// - [`CycleLimitExceeded`](crate::Error::CycleLimitExceeded) when the constraints can't be made consistent,
	/// nothing is written in that case.
	pub async fn sort_mods(&mut self) -> crate::Result<Resolution> {
		let installed = self.installed_mods()?;
		let rules = self.community_rules().await;

		let resolution = LoadOrderBuilder::new(&installed)
			.active_ids(self.active_ids())
			.community_rules(&rules)
			.sort_rules(self.sort_rules.clone())
			.build()
			.resolve()?;

		self.require_mods_config()?.set_active(resolution.activation_order());
		self.write_mods_config()?;
		Ok(resolution)
	}

	/// Checks the active packages for incompatibilities without changing the order.
	pub fn verify_mods(&self) -> crate::Result<bool> {
		Ok(load_order::verify_state(&self.enabled_mods()?))
	}

	pub fn conflicting_mods(&self) -> crate::Result<Vec<Conflict>> {
		Ok(load_order::find_conflicts(&self.enabled_mods()?))
	}

	/// Active packages in order followed by every inactive installed package.
	pub fn order_all_mods(&self) -> crate::Result<Vec<Package>> {
		let installed = self.installed_mods()?;
		let ids = load_order::reconcile(self.active_ids(), &installed);
		Ok(self.resolve_ids(&ids, &installed))
	}

	pub async fn search_workshop(&self, term: &str) -> crate::Result<Vec<WorkshopResult>> {
		crate::workshop::search(&self.client, term).await
	}

	pub async fn workshop_details(&self, content_ids: &[u64]) -> crate::Result<Vec<WorkshopResult>> {
		crate::workshop::details(&self.client, content_ids).await
	}

	async fn download_and_install(&self, content_ids: &[u64], installed: &[Package]) -> crate::Result<Vec<Package>> {
		let mods_dir = self.config.require_mods_dir()?;
		let download_dir = self.steamcmd.download(content_ids).await?;

		let mut packages = Vec::<Package>::new();
		for id in content_ids {
			match crate::installer::install(mods_dir, &download_dir, *id, installed, self.config.use_human_names()) {
				Ok(p) => packages.push(p),
				Err(e) => log::warn!("Failed to install {}: {}", id, e),
			}
		}
		Ok(packages)
	}

	/// Downloads the content ids and installs them, replacing any existing copies.
	pub async fn sync_mods(&self, content_ids: &[u64]) -> crate::Result<Vec<Package>> {
		let installed = self.installed_mods()?;
		let packages = self.download_and_install(content_ids, &installed).await?;
		log::info!("Installed {} of {} packages", packages.len(), content_ids.len());
		Ok(packages)
	}

	/// Re-downloads every installed package that came from the content service, skipping ignored ones.
	pub async fn update_mods(&self) -> crate::Result<Vec<Package>> {
		let installed = self.installed_mods()?;
		let ids: Vec<u64> = installed.iter()
			.filter(|p| {
				if p.ignored {
					log::info!("Skipping {}, marked as ignored", p.title());
				}
				!p.ignored
			})
			.filter_map(|p| p.content_id)
			.collect();
		self.sync_mods(&ids).await
	}

	pub fn remove_mods(&self, packages: &[Package]) -> crate::Result<usize> {
		let mods_dir = self.config.require_mods_dir()?;
		let mut removed = 0;
		for p in packages {
			removed += crate::installer::remove(mods_dir, p)?;
		}
		Ok(removed)
	}

	pub fn export_mods(&self, path: impl AsRef<Path>, filter: ExportFilter, format: ModListFormat) -> crate::Result<usize> {
		let packages = match filter {
			ExportFilter::All => self.order_all_mods()?,
			ExportFilter::Enabled => self.enabled_mods()?,
			ExportFilter::Disabled => self.disabled_mods()?,
		};
		crate::modlist::write(path, &packages, format)?;
		Ok(packages.len())
	}

	pub fn backup_mods(&self, target: impl AsRef<Path>) -> crate::Result<()> {
		crate::installer::backup(self.config.require_mods_dir()?, target.as_ref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expansion_names() {
		assert_eq!(expansion_package("ludeon.rimworld").name.as_deref(), Some("Core"));
		assert_eq!(expansion_package("ludeon.rimworld.biotech").name.as_deref(), Some("Biotech"));
	}
}
