//! Reading every package installed in a directory.

use std::path::Path;

use crate::package::Package;

/// Reads all packages in `path`.
///
/// Child directories are visited in file name order so the result is the same between runs.
/// Directories that aren't packages are skipped.
pub fn read(path: impl AsRef<Path>) -> crate::Result<Vec<Package>> {
	let path = path.as_ref();
	let mut dirs = path.read_dir()?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.is_dir())
		.collect::<Vec<_>>();
	dirs.sort();

	let packages: Vec<_> = dirs.iter().filter_map(|d| crate::about::read_package(d)).collect();
	log::debug!("Read {} packages from {}", packages.len(), path.display());
	Ok(packages)
}

/// Installed packages whose name or author contains `term`, or whose content id is `term`.
pub fn search(path: impl AsRef<Path>, term: &str) -> crate::Result<Vec<Package>> {
	Ok(read(path)?.into_iter().filter(|p| p.matches_term(term)).collect())
}

/// Drops every package after the first with the same id, stubs without an id are dropped too.
pub fn dedup_by_id(packages: Vec<Package>) -> Vec<Package> {
	let mut seen = std::collections::HashSet::<String>::new();
	packages.into_iter()
		.filter(|p| match &p.id {
			Some(id) => {
				if seen.insert(id.clone()) {
					true
				} else {
					log::warn!("Package id {} is installed more than once, using the first copy", id);
					false
				}
			},
			None => false,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn duplicates_keep_first() {
		let packages = vec![
			Package::new("a").with_name("first"),
			Package::new("b"),
			Package::new("A").with_name("second"),
			Package { id: None, ..Default::default() },
		];
		let deduped = dedup_by_id(packages);
		assert_eq!(deduped.len(), 2);
		assert_eq!(deduped[0].name.as_deref(), Some("first"));
	}
}
