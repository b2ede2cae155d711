use std::collections::HashSet;

use crate::package::Package;

/// Appends installed packages missing from `sequence` so none get dropped when the order is written back.
///
/// Ids already in the sequence keep their position, duplicates are dropped.
/// Stragglers follow in the order they appear in `installed`.
pub fn reconcile(sequence: &[String], installed: &[Package]) -> Vec<String> {
	let mut seen = HashSet::<&str>::new();
	let mut out = Vec::with_capacity(sequence.len().max(installed.len()));

	for id in sequence {
		if seen.insert(id.as_str()) {
			out.push(id.clone());
		}
	}

	for package in installed {
		if let Some(id) = package.id.as_deref() {
			if seen.insert(id) {
				log::trace!("Appending {} which wasn't part of the sorted order", id);
				out.push(id.to_string());
			}
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stragglers_keep_installed_order() {
		let installed = vec![Package::new("z"), Package::new("a"), Package::new("m"), Package::new("b")];
		let sequence = vec!["m".to_string(), "a".to_string(), "m".to_string()];
		assert_eq!(reconcile(&sequence, &installed), vec!["m", "a", "z", "b"]);
	}

	#[test]
	fn stubs_without_id_are_skipped() {
		let installed = vec![Package { content_id: Some(1), ..Default::default() }, Package::new("a")];
		assert_eq!(reconcile(&[], &installed), vec!["a"]);
	}
}
