//! Incompatibility checks over a set of packages meant to be active together.

use std::collections::HashSet;

use crate::package::Package;

/// A package declaring another active package as incompatible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
	/// Id of the package with the `incompatibleWith` declaration.
	pub declared_by: String,
	pub conflicts_with: String,
}

/// Checks that no package in the set is listed as incompatible by any package in the set.
///
/// One sided declarations are enough, if `a` lists `b` then `{a, b}` is invalid whatever `b` says.
pub fn verify_state<'a>(packages: impl IntoIterator<Item = &'a Package>) -> bool {
	let packages: Vec<&Package> = packages.into_iter().collect();
	let incompatible: HashSet<&str> = packages.iter()
		.flat_map(|p| p.incompatible_with.iter().map(String::as_str))
		.collect();

	!packages.iter()
		.filter_map(|p| p.id.as_deref())
		.any(|id| incompatible.contains(id))
}

/// Lists every incompatible pair in the set, for showing to the user.
pub fn find_conflicts<'a>(packages: impl IntoIterator<Item = &'a Package>) -> Vec<Conflict> {
	let packages: Vec<&Package> = packages.into_iter().collect();
	let ids: HashSet<&str> = packages.iter().filter_map(|p| p.id.as_deref()).collect();

	let mut conflicts = Vec::new();
	for package in &packages {
		for other in &package.incompatible_with {
			if ids.contains(other.as_str()) {
				conflicts.push(Conflict {
					declared_by: package.id_str().to_string(),
					conflicts_with: other.clone(),
				});
			}
		}
	}
	conflicts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn one_sided_declaration_is_enough() {
		let c = Package::new("c").incompatible_with(["d"]);
		let d = Package::new("d");
		assert!(!verify_state([&c, &d]));
		assert!(!verify_state([&d, &c]));
		assert!(verify_state([&c]));
		assert!(verify_state([&d]));
	}

	#[test]
	fn empty_set_is_valid() {
		assert!(verify_state(std::iter::empty::<&Package>()));
	}

	#[test]
	fn conflicts_are_listed() {
		let packages = vec![
			Package::new("a").incompatible_with(["b", "not.active"]),
			Package::new("b"),
			Package::new("c").incompatible_with(["a"]),
		];
		let conflicts = find_conflicts(&packages);
		assert_eq!(conflicts, vec![
			Conflict { declared_by: "a".into(), conflicts_with: "b".into() },
			Conflict { declared_by: "c".into(), conflicts_with: "a".into() },
		]);
	}
}
