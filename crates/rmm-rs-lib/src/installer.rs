//! Moving package contents in and out of the mods directory.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::package::Package;

/// Name of the directory a package is installed to.
pub fn install_dir_name(content_id: u64, package_id: Option<&str>, use_human_names: bool) -> String {
	match package_id {
		Some(id) if use_human_names => id.to_string(),
		_ => content_id.to_string(),
	}
}

/// Directories under `mods_dir` that hold a copy of `package`.
pub fn installed_dirs(mods_dir: &Path, package: &Package) -> Vec<PathBuf> {
	let mut names = Vec::<String>::new();
	names.extend(package.dir_name.clone());
	names.extend(package.content_id.map(|c| c.to_string()));
	names.extend(package.id.clone());
	names.dedup();

	let mut dirs = Vec::<PathBuf>::new();
	for name in names {
		let dir = mods_dir.join(name);
		if dir.is_dir() && !dirs.contains(&dir) {
			dirs.push(dir);
		}
	}
	dirs
}

/// Deletes every installed copy of `package`, returns how many directories were removed.
pub fn remove(mods_dir: &Path, package: &Package) -> crate::Result<usize> {
	let dirs = installed_dirs(mods_dir, package);
	for dir in &dirs {
		log::info!("Removing {} from {}", package.title(), dir.display());
		fs_extra::dir::remove(dir)?;
	}
	Ok(dirs.len())
}

/// Copies a downloaded package from `download_dir/<content_id>` into the mods directory.
///
/// Any copy already installed is removed first. Returns the newly installed package.
///
/// # Parameters
/// - `installed` - Packages currently installed, used to find old copies.
pub fn install(mods_dir: &Path, download_dir: &Path, content_id: u64, installed: &[Package], use_human_names: bool) -> crate::Result<Package> {
	let source = download_dir.join(content_id.to_string());
	if !source.is_dir() {
		return Err(crate::Error::Download(format!("{} is missing from {}", content_id, download_dir.display())));
	}

	let downloaded = crate::about::read_package(&source);
	let package_id = downloaded.as_ref().and_then(|p| p.id.clone());

	for old in installed {
		let same = old.content_id == Some(content_id) || (package_id.is_some() && old.id == package_id);
		if same {
			remove(mods_dir, old)?;
		}
	}

	let dest = mods_dir.join(install_dir_name(content_id, package_id.as_deref(), use_human_names));
	if dest.exists() {
		fs_extra::dir::remove(&dest)?;
	}

	log::info!("Installing {} to {}", package_id.as_deref().unwrap_or(&content_id.to_string()), dest.display());
	let options = fs_extra::dir::CopyOptions::new().copy_inside(true);
	fs_extra::dir::copy(&source, &dest, &options)?;

	/* Keeps the content id when the directory is named after the package id */
	let about_dir = dest.join("About");
	if about_dir.is_dir() && crate::about::read_content_id(&dest).is_none() {
		std::fs::write(about_dir.join("PublishedFileId.txt"), content_id.to_string())?;
	}

	let mut package = crate::about::read_package(&dest).unwrap_or_else(|| Package {
		author: String::from("Unknown"),
		dir_name: dest.file_name().map(|n| n.to_string_lossy().to_string()),
		..Default::default()
	});
	package.content_id.get_or_insert(content_id);
	Ok(package)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
	Tar,
	TarGz,
	Zip,
}

impl ArchiveFormat {
	/// Infers the format from the file name.
	pub fn from_path(path: &Path) -> crate::Result<Self> {
		let name = path.file_name()
			.map(|n| n.to_string_lossy().to_lowercase())
			.unwrap_or_default();
		if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
			Ok(ArchiveFormat::TarGz)
		} else if name.ends_with(".tar") {
			Ok(ArchiveFormat::Tar)
		} else if name.ends_with(".zip") {
			Ok(ArchiveFormat::Zip)
		} else {
			Err(crate::Error::Validation(format!("unsupported archive type: {}", path.display())))
		}
	}
}

fn write_zip(mods_dir: &Path, file: File) -> crate::Result<()> {
	let mut zip = zip::ZipWriter::new(file);
	let options = zip::write::FileOptions::default();

	for entry in walkdir::WalkDir::new(mods_dir).sort_by_file_name() {
		let entry = entry?;
		let relative = match entry.path().strip_prefix(mods_dir) {
			Ok(r) if !r.as_os_str().is_empty() => r,
			_ => continue,
		};
		let name = relative.components()
			.map(|c| c.as_os_str().to_string_lossy().to_string())
			.collect::<Vec<_>>()
			.join("/");

		if entry.file_type().is_dir() {
			zip.add_directory(name, options)?;
		} else if entry.file_type().is_file() {
			zip.start_file(name, options)?;
			let mut f = File::open(entry.path())?;
			std::io::copy(&mut f, &mut zip)?;
		}
	}

	zip.finish()?.flush()?;
	Ok(())
}

/// Archives the whole mods directory into `target`, format taken from its extension.
///
/// # Errors
/// - [`Validation`](crate::Error::Validation) when the extension isn't one of `.tar`, `.tar.gz`, `.tgz` or `.zip`.
pub fn backup(mods_dir: &Path, target: &Path) -> crate::Result<()> {
	let format = ArchiveFormat::from_path(target)?;
	log::info!("Backing up {} to {}", mods_dir.display(), target.display());

	let file = File::create(target)?;
	match format {
		ArchiveFormat::Tar => {
			let mut builder = tar::Builder::new(file);
			builder.append_dir_all("Mods", mods_dir)?;
			builder.into_inner()?.flush()?;
		},
		ArchiveFormat::TarGz => {
			let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
			let mut builder = tar::Builder::new(gz);
			builder.append_dir_all("Mods", mods_dir)?;
			builder.into_inner()?.finish()?.flush()?;
		},
		ArchiveFormat::Zip => write_zip(mods_dir, file)?,
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn archive_format_from_extension() {
		assert_eq!(ArchiveFormat::from_path(Path::new("b.tar.gz")).unwrap(), ArchiveFormat::TarGz);
		assert_eq!(ArchiveFormat::from_path(Path::new("b.TGZ")).unwrap(), ArchiveFormat::TarGz);
		assert_eq!(ArchiveFormat::from_path(Path::new("b.tar")).unwrap(), ArchiveFormat::Tar);
		assert_eq!(ArchiveFormat::from_path(Path::new("b.zip")).unwrap(), ArchiveFormat::Zip);
		assert!(matches!(ArchiveFormat::from_path(Path::new("b.rar")), Err(crate::Error::Validation(_))));
	}

	#[test]
	fn dir_name_follows_flag() {
		assert_eq!(install_dir_name(5, Some("a.b"), true), "a.b");
		assert_eq!(install_dir_name(5, Some("a.b"), false), "5");
		assert_eq!(install_dir_name(5, None, true), "5");
	}
}
