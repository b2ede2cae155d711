//! Module for building the graph of ordering constraints between active packages.
//!
//! An edge `a -> b` means `a` is activated **after** `b`. Sorting the graph puts `a` first,
//! so the sorted order is reversed to get the activation order.

use std::collections::{HashMap, HashSet};

use petgraph::prelude::*;

use crate::package::Package;
use super::SortRules;

/// Which rule produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
	/// Fixed relative order between two priority packages.
	Priority,
	/// Puts a compatibility shim after another package.
	Shim,
	/// Special cased pair of packages.
	Override,
	/// `loadBefore`/`loadAfter` from the package or the community rules.
	Declared,
	/// Keeps a regular package after the priority block.
	Anchor,
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
	pub(super) graph: StableDiGraph<String, EdgeKind>,
	indices: HashMap<String, NodeIndex>,
}

impl ConstraintGraph {
	/// Returns the index of the existing node or adds a new one for `id`.
	pub fn get_or_add_node(&mut self, id: &str) -> NodeIndex {
		if let Some(i) = self.indices.get(id) {
			return *i;
		}
		let i = self.graph.add_node(id.to_string());
		self.indices.insert(id.to_string(), i);
		i
	}

	pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
		self.indices.get(id).copied()
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.indices.contains_key(id)
	}

	/// Adds a constraint that `later` activates after `earlier`.
	///
	/// Self references and repeated constraints are ignored so every pair has at most one edge.
	pub fn add_constraint(&mut self, later: &str, earlier: &str, kind: EdgeKind) {
		if later == earlier {
			log::trace!("Ignoring {:?} constraint of {} on itself", kind, later);
			return;
		}
		let a = self.get_or_add_node(later);
		let b = self.get_or_add_node(earlier);
		if self.graph.find_edge(a, b).is_none() {
			self.graph.add_edge(a, b, kind);
		}
	}

	/// Checks for a constraint that `later` activates after `earlier`.
	pub fn has_constraint(&self, later: &str, earlier: &str) -> bool {
		match (self.node_index(later), self.node_index(earlier)) {
			(Some(a), Some(b)) => self.graph.find_edge(a, b).is_some(),
			_ => false,
		}
	}

	pub fn constraint_kind(&self, later: &str, earlier: &str) -> Option<EdgeKind> {
		let e = self.graph.find_edge(self.node_index(later)?, self.node_index(earlier)?)?;
		self.graph.edge_weight(e).copied()
	}

	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	/// Node ids in insertion order.
	pub fn node_ids(&self) -> Vec<&str> {
		self.graph.node_indices().map(|i| self.graph[i].as_str()).collect()
	}

	/// All constraints as `(later, earlier, kind)`, in insertion order.
	pub fn constraints(&self) -> Vec<(&str, &str, EdgeKind)> {
		self.graph.edge_indices()
			.filter_map(|e| {
				let (a, b) = self.graph.edge_endpoints(e)?;
				Some((self.graph[a].as_str(), self.graph[b].as_str(), self.graph[e]))
			})
			.collect()
	}

	pub fn id(&self, i: NodeIndex) -> &str {
		&self.graph[i]
	}

	/// Builds the graph for the active packages.
	///
	/// # Parameters
	/// - `populated` - Installed and active packages, in active order, already augmented with community rules.
	/// - `active` - Active ids in order, including ids which aren't installed.
	/// - `available` - Ids of installed packages plus the packages shipped with the game.
	/// - `rules` - Fixed ordering tables.
	pub fn build(populated: &[Package], active: &[String], available: &HashSet<String>, rules: &SortRules) -> Self {
		let mut graph = ConstraintGraph::default();
		let active_set: HashSet<&str> = active.iter().map(String::as_str).collect();

		/* Node order decides ties in the sort and which cycle is found first, so it follows the active order */
		for id in active {
			if available.contains(id) {
				graph.get_or_add_node(id);
			}
		}

		let priority: Vec<&str> = rules.priority.iter()
			.map(String::as_str)
			.filter(|id| active_set.contains(id) && available.contains(*id))
			.collect();

		/* Every later priority package gets an edge to every earlier one, not just its neighbour */
		for (k, earlier) in priority.iter().enumerate() {
			for later in &priority[k + 1..] {
				graph.add_constraint(later, earlier, EdgeKind::Priority);
			}
		}

		for shim in &rules.shims {
			if !populated.iter().any(|p| p.id.as_deref() == Some(shim.as_str())) {
				continue;
			}
			log::debug!("Compatibility shim {} is active, ordering it after everything else", shim);
			let others: Vec<String> = graph.node_ids().into_iter().filter(|id| *id != shim.as_str()).map(str::to_string).collect();
			for other in others {
				graph.add_constraint(shim, &other, EdgeKind::Shim);
			}
		}

		for pair in &rules.pair_overrides {
			if graph.contains_node(&pair.first) && graph.contains_node(&pair.second) {
				log::debug!("Applying override: {} before {}", pair.first, pair.second);
				graph.add_constraint(&pair.second, &pair.first, EdgeKind::Override);
			}
		}

		for package in populated {
			let id = match package.id.as_deref() {
				Some(id) => id,
				None => continue,
			};

			if !priority.contains(&id) {
				for p in &priority {
					graph.add_constraint(id, p, EdgeKind::Anchor);
				}
			}

			for after in &package.load_after {
				if active_set.contains(after.as_str()) {
					graph.add_constraint(id, after, EdgeKind::Declared);
				}
			}
			for before in &package.load_before {
				if active_set.contains(before.as_str()) {
					graph.add_constraint(before, id, EdgeKind::Declared);
				}
			}
		}

		log::debug!("Built constraint graph with {} nodes and {} edges", graph.node_count(), graph.edge_count());
		graph
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::load_order::PairOverride;

	fn ids(v: &[&str]) -> Vec<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	fn available(v: &[&str]) -> HashSet<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn priority_edges_are_exhaustive() {
		let rules = SortRules::empty().with_priority(["a", "b", "c"]);
		let active = ids(&["a", "b", "c"]);
		let graph = ConstraintGraph::build(&[], &active, &available(&["a", "b", "c"]), &rules);

		assert!(graph.has_constraint("c", "b"));
		assert!(graph.has_constraint("c", "a"));
		assert!(graph.has_constraint("b", "a"));
		assert_eq!(graph.edge_count(), 3);
	}

	#[test]
	fn inactive_priority_ids_are_skipped() {
		let rules = SortRules::empty().with_priority(["a", "b", "c"]);
		let active = ids(&["a", "c"]);
		let graph = ConstraintGraph::build(&[], &active, &available(&["a", "b", "c"]), &rules);

		assert!(!graph.contains_node("b"));
		assert!(graph.has_constraint("c", "a"));
		assert_eq!(graph.edge_count(), 1);
	}

	#[test]
	fn declared_constraints_only_between_active() {
		let rules = SortRules::empty();
		let populated = vec![
			Package::new("x").load_after(["y", "inactive"]).load_before(["z"]),
			Package::new("y"),
			Package::new("z"),
		];
		let active = ids(&["x", "y", "z"]);
		let graph = ConstraintGraph::build(&populated, &active, &available(&["x", "y", "z", "inactive"]), &rules);

		assert_eq!(graph.constraint_kind("x", "y"), Some(EdgeKind::Declared));
		assert!(graph.has_constraint("z", "x"));
		assert!(!graph.contains_node("inactive"));
	}

	#[test]
	fn active_but_missing_targets_still_get_edges() {
		let populated = vec![Package::new("x").load_after(["gone"])];
		let active = ids(&["x", "gone"]);
		let graph = ConstraintGraph::build(&populated, &active, &available(&["x"]), &SortRules::empty());
		assert!(graph.has_constraint("x", "gone"));
	}

	#[test]
	fn regular_packages_anchor_after_priority() {
		let rules = SortRules::empty().with_priority(["core"]);
		let populated = vec![Package::new("core"), Package::new("m")];
		let active = ids(&["core", "m"]);
		let graph = ConstraintGraph::build(&populated, &active, &available(&["core", "m"]), &rules);

		assert_eq!(graph.constraint_kind("m", "core"), Some(EdgeKind::Anchor));
		assert!(!graph.has_constraint("core", "m"));
	}

	#[test]
	fn shim_and_pair_override() {
		let rules = SortRules::empty()
			.with_shims(["shim"])
			.with_pair_overrides([PairOverride::new("light.a", "light.b")]);
		let populated = vec![Package::new("shim"), Package::new("light.a"), Package::new("light.b")];
		let active = ids(&["shim", "light.a", "light.b"]);
		let graph = ConstraintGraph::build(&populated, &active, &available(&["shim", "light.a", "light.b"]), &rules);

		assert_eq!(graph.constraint_kind("shim", "light.a"), Some(EdgeKind::Shim));
		assert_eq!(graph.constraint_kind("shim", "light.b"), Some(EdgeKind::Shim));
		assert_eq!(graph.constraint_kind("light.b", "light.a"), Some(EdgeKind::Override));
	}

	#[test]
	fn pair_override_needs_both() {
		let rules = SortRules::empty().with_pair_overrides([PairOverride::new("light.a", "light.b")]);
		let populated = vec![Package::new("light.b")];
		let active = ids(&["light.b"]);
		let graph = ConstraintGraph::build(&populated, &active, &available(&["light.a", "light.b"]), &rules);
		assert_eq!(graph.edge_count(), 0);
	}

	#[test]
	fn self_and_duplicate_constraints_are_dropped() {
		let mut graph = ConstraintGraph::default();
		graph.add_constraint("a", "a", EdgeKind::Declared);
		graph.add_constraint("a", "b", EdgeKind::Declared);
		graph.add_constraint("a", "b", EdgeKind::Anchor);
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.constraint_kind("a", "b"), Some(EdgeKind::Declared));
	}
}
