//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("XML error: {0}")]
	Xml(#[from] quick_xml::Error),
	#[error("zip error: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("directory walk error: {0}")]
	WalkDir(#[from] walkdir::Error),
	#[error("copy error: {0}")]
	FsExtra(#[from] fs_extra::error::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("validation error: {0}")]
	Validation(String),
	#[error("path not configured: {0}")]
	MissingPath(&'static str),
	#[error("selection invalid")]
	InvalidSelection,
	#[error("download failed: {0}")]
	Download(String),
	#[error("already exists")]
	AlreadyExists,
	/// The load order still contained a cycle after the maximum number of edge removals.
	#[error("unable to break load order cycles after {attempts} attempts")]
	CycleLimitExceeded { attempts: usize },
}
