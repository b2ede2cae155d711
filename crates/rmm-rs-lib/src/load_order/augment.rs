//! Merging community rules into package declarations.

use crate::community_rules::CommunityRules;
use crate::package::Package;

/// Picks the installed packages that are active, in active order.
///
/// The returned packages are copies, so augmenting them never touches the caller's records.
pub fn populated_packages(installed: &[Package], active: &[String]) -> Vec<Package> {
	active.iter()
		.filter_map(|id| installed.iter().find(|p| p.id.as_deref() == Some(id.as_str())))
		.cloned()
		.collect()
}

/// Adds each package's community rule entry to its own constraints.
///
/// Both sources carry the same weight, the result is a plain union. Ids that aren't installed are kept.
pub fn augment(packages: &mut [Package], rules: &CommunityRules) {
	for package in packages.iter_mut() {
		let entry = match package.id.as_deref().and_then(|id| rules.get(id)) {
			Some(e) => e,
			None => continue,
		};
		log::trace!("Applying community rules to {}: before {:?} after {:?}", package.id_str(), entry.load_before, entry.load_after);
		package.load_before.extend(entry.load_before.iter().cloned());
		package.load_after.extend(entry.load_after.iter().cloned());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::community_rules::RuleEntry;

	#[test]
	fn union_with_declared() {
		let mut rules = CommunityRules::default();
		rules.insert("a", RuleEntry {
			load_before: ["b".to_string(), "not.installed".to_string()].into(),
			load_after: ["c".to_string()].into(),
		});

		let mut packages = vec![Package::new("a").load_before(["b"]), Package::new("b")];
		augment(&mut packages, &rules);

		assert_eq!(packages[0].load_before.len(), 2);
		assert!(packages[0].load_before.contains("not.installed"));
		assert!(packages[0].load_after.contains("c"));
		assert!(packages[1].is_unconstrained());
	}

	#[test]
	fn populated_follows_active_order() {
		let installed = vec![Package::new("a"), Package::new("b"), Package::new("c")];
		let active = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
		let populated = populated_packages(&installed, &active);
		assert_eq!(populated.iter().map(|p| p.id_str()).collect::<Vec<_>>(), vec!["c", "a"]);
	}
}
