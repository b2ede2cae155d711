//! Talking to the content sharing service.
//!
//! Searching and details go through the public web pages and API, downloads go through `steamcmd`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::config::GAME_APP_ID;

const SEARCH_URL: &str = "https://steamcommunity.com/workshop/browse/";
const DETAILS_URL: &str = "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/";
const USER_AGENT: &str = concat!("rmm-rs/", env!("CARGO_PKG_VERSION"));

/// A package found on the service that may not be installed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkshopResult {
	pub content_id: u64,
	pub name: Option<String>,
	pub author: Option<String>,
	pub description: Option<String>,
	/// Size in bytes.
	pub file_size: Option<u64>,
	/// Unix timestamps.
	pub time_created: Option<u64>,
	pub time_updated: Option<u64>,
	pub subscriptions: Option<u64>,
}

impl WorkshopResult {
	pub fn new(content_id: u64) -> Self {
		Self { content_id, ..Default::default() }
	}
}

impl PartialEq for WorkshopResult {
	fn eq(&self, other: &Self) -> bool {
		self.content_id == other.content_id
	}
}

pub fn build_client() -> crate::Result<reqwest::Client> {
	Ok(reqwest::Client::builder()
		.user_agent(USER_AGENT)
		.build()?)
}

fn search_item_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(
		r#"(?s)filedetails/\?id=(\d+).*?workshopItemTitle[^>]*>([^<]*)<.*?workshopItemAuthorName[^>]*>(?:by&nbsp;)?(?:<a[^>]*>)?([^<]*)<"#
	).expect("search pattern is valid"))
}

fn decode_entities(s: &str) -> String {
	let s = s.replace("&nbsp;", " ");
	match quick_xml::escape::unescape(&s) {
		Ok(u) => u.trim().to_string(),
		Err(_) => s.trim().to_string(),
	}
}

/// Extracts results from a browse page.
pub fn parse_search_page(html: &str) -> Vec<WorkshopResult> {
	let mut results = Vec::<WorkshopResult>::new();
	for captures in search_item_pattern().captures_iter(html) {
		let content_id = match captures[1].parse::<u64>() {
			Ok(c) => c,
			Err(_) => continue,
		};
		/* Every item links to its page more than once */
		if results.iter().any(|r| r.content_id == content_id) {
			continue;
		}
		results.push(WorkshopResult {
			content_id,
			name: Some(decode_entities(&captures[2])),
			author: Some(decode_entities(&captures[3])),
			..Default::default()
		});
	}
	results
}

pub async fn search(client: &reqwest::Client, term: &str) -> crate::Result<Vec<WorkshopResult>> {
	log::debug!("Searching workshop for {}", term);
	let html = client.get(SEARCH_URL)
		.query(&[("appid", GAME_APP_ID.to_string()), ("searchtext", term.to_string())])
		.send()
		.await?
		.error_for_status()?
		.text()
		.await?;

	let results = parse_search_page(&html);
	log::debug!("Workshop search for {} found {} results", term, results.len());
	Ok(results)
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
	response: DetailsBody,
}

#[derive(Debug, Deserialize)]
struct DetailsBody {
	#[serde(default)]
	publishedfiledetails: Vec<RawDetails>,
}

/* The API gives some numbers as strings */
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
	Int(u64),
	Text(String),
}

impl Number {
	fn value(&self) -> Option<u64> {
		match self {
			Number::Int(n) => Some(*n),
			Number::Text(s) => s.parse().ok(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RawDetails {
	publishedfileid: Number,
	#[serde(default)]
	result: u32,
	title: Option<String>,
	description: Option<String>,
	file_size: Option<Number>,
	time_created: Option<u64>,
	time_updated: Option<u64>,
	subscriptions: Option<u64>,
}

/// Reads a `GetPublishedFileDetails` response, items the service couldn't find are dropped.
pub fn parse_details(json: &str) -> crate::Result<Vec<WorkshopResult>> {
	let response: DetailsResponse = serde_json::from_str(json)?;
	Ok(response.response.publishedfiledetails.into_iter()
		.filter(|d| d.result == 1)
		.filter_map(|d| Some(WorkshopResult {
			content_id: d.publishedfileid.value()?,
			name: d.title,
			author: None,
			description: d.description,
			file_size: d.file_size.as_ref().and_then(Number::value),
			time_created: d.time_created,
			time_updated: d.time_updated,
			subscriptions: d.subscriptions,
		}))
		.collect())
}

pub async fn details(client: &reqwest::Client, content_ids: &[u64]) -> crate::Result<Vec<WorkshopResult>> {
	let mut form = vec![(String::from("itemcount"), content_ids.len().to_string())];
	for (i, id) in content_ids.iter().enumerate() {
		form.push((format!("publishedfileids[{}]", i), id.to_string()));
	}

	let json = client.post(DETAILS_URL)
		.form(&form)
		.send()
		.await?
		.error_for_status()?
		.text()
		.await?;
	parse_details(&json)
}

/// Runs `steamcmd` with its home directory inside our cache.
#[derive(Debug, Clone)]
pub struct SteamCmd {
	executable: PathBuf,
	home: PathBuf,
}

impl SteamCmd {
	pub fn new(cache_dir: impl AsRef<Path>) -> Self {
		Self {
			executable: PathBuf::from("steamcmd"),
			home: cache_dir.as_ref().join("steamcmd"),
		}
	}

	pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
		self.executable = executable.into();
		self
	}

	pub fn home(&self) -> &Path {
		&self.home
	}

	fn content_dir_candidates(&self) -> Vec<PathBuf> {
		let app_dir = |base: PathBuf| base.join("steamapps").join("workshop").join("content").join(GAME_APP_ID.to_string());
		vec![
			app_dir(self.home.join(".steam").join("steam")),
			app_dir(self.home.join(".local").join("share").join("Steam")),
			app_dir(self.home.join("Steam")),
			app_dir(self.home.join("Library").join("Application Support").join("Steam")),
			app_dir(self.home.clone()),
		]
	}

	/// Directory holding one subdirectory per downloaded content id.
	///
	/// Where steamcmd puts things depends on the platform and version, the first existing candidate wins.
	pub fn content_dir(&self) -> PathBuf {
		let candidates = self.content_dir_candidates();
		candidates.iter()
			.find(|p| p.is_dir())
			.cloned()
			.unwrap_or_else(|| candidates[0].clone())
	}

	fn args(content_ids: &[u64]) -> Vec<String> {
		let mut args = vec![String::from("+login"), String::from("anonymous")];
		for id in content_ids {
			args.push(String::from("+workshop_download_item"));
			args.push(GAME_APP_ID.to_string());
			args.push(id.to_string());
		}
		args.push(String::from("+quit"));
		args
	}

	/// Downloads the content ids and returns the directory they were downloaded to.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when steamcmd can't be started.
	/// - [`Download`](crate::Error::Download) when it fails or none of the ids were downloaded.
	pub async fn download(&self, content_ids: &[u64]) -> crate::Result<PathBuf> {
		if content_ids.is_empty() {
			return Ok(self.content_dir());
		}

		tokio::fs::create_dir_all(&self.home).await?;
		log::info!("Downloading {} packages with steamcmd", content_ids.len());

		let output = tokio::process::Command::new(&self.executable)
			.env("HOME", &self.home)
			.current_dir(&self.home)
			.args(Self::args(content_ids))
			.output()
			.await?;

		for line in String::from_utf8_lossy(&output.stdout).lines() {
			log::debug!("steamcmd: {}", line);
		}
		if !output.status.success() {
			return Err(crate::Error::Download(format!("steamcmd exited with {}", output.status)));
		}

		let content_dir = self.content_dir();
		let missing: Vec<u64> = content_ids.iter().copied().filter(|id| !content_dir.join(id.to_string()).is_dir()).collect();
		if missing.len() == content_ids.len() {
			return Err(crate::Error::Download(format!("nothing was downloaded to {}", content_dir.display())));
		}
		for id in missing {
			log::warn!("Package {} was not downloaded", id);
		}

		Ok(content_dir)
	}
}
