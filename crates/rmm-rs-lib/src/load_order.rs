//! Computing the order packages are activated in by the game.
//!
//! # Usage
//! 1. Create a [`LoadOrderBuilder`] from the installed packages.
//! 1. Give it the currently active ids, and optionally the [`CommunityRules`] and [`SortRules`] to use.
//! 1. [`LoadOrderBuilder::build()`] to get a [`LoadOrderResolver`] holding the constraint graph.
//! 1. [`LoadOrderResolver::resolve()`] to sort it into a [`Resolution`].
//! 1. [`Resolution::activation_order()`] for the sorted active ids, or [`Resolution::reconcile_with()`]
//! to also get the inactive packages appended at the end.

use std::collections::HashSet;

use crate::community_rules::CommunityRules;
use crate::package::Package;

mod sort_rules;
pub use sort_rules::SortRules;
pub use sort_rules::PairOverride;
pub use sort_rules::{CORE_ID, EXPANSION_IDS, BEFORE_CORE_IDS, DEFAULT_MAX_ATTEMPTS};
mod augment;
pub use augment::{augment, populated_packages};
mod constraint_graph;
pub use constraint_graph::ConstraintGraph;
pub use constraint_graph::EdgeKind;
mod cycle_breaking;
pub use cycle_breaking::{sort, topological_sort, find_cycle, RemovedConstraint, SortOutcome};
mod verifier;
pub use verifier::{verify_state, find_conflicts, Conflict};
mod reconcile;
pub use reconcile::reconcile;

pub struct LoadOrderBuilder<'a> {
	installed: &'a [Package],
	active: Vec<String>,
	community_rules: Option<&'a CommunityRules>,
	sort_rules: SortRules,
	excluded: HashSet<String>,
}

impl<'a> LoadOrderBuilder<'a> {
	pub fn new(installed: &'a [Package]) -> Self {
		Self {
			installed,
			active: Default::default(),
			community_rules: None,
			sort_rules: SortRules::default(),
			excluded: Default::default(),
		}
	}

	/// Sets the active ids in their current order. Ids are lower-cased and repeats dropped.
	pub fn active_ids<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		let mut seen = HashSet::<String>::new();
		self.active = ids.into_iter()
			.map(|s| s.as_ref().trim().to_lowercase())
			.filter(|s| !s.is_empty() && seen.insert(s.clone()))
			.collect();
		self
	}

	pub fn community_rules(mut self, rules: &'a CommunityRules) -> Self {
		self.community_rules = Some(rules);
		self
	}

	pub fn sort_rules(mut self, rules: SortRules) -> Self {
		self.sort_rules = rules;
		self
	}

	/// Ids to leave out of the resulting order even if they are active.
	pub fn exclude<S: AsRef<str>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
		self.excluded.extend(ids.into_iter().map(|s| s.as_ref().to_lowercase()));
		self
	}

	pub fn build(self) -> LoadOrderResolver {
		let available: HashSet<String> = self.installed.iter()
			.filter_map(|p| p.id.clone())
			.chain(self.sort_rules.known_expansions.iter().cloned())
			.collect();

		let mut populated = populated_packages(self.installed, &self.active);
		match self.community_rules {
			Some(rules) => augment(&mut populated, rules),
			None => log::debug!("No community rules given, using declared constraints only"),
		}

		let graph = ConstraintGraph::build(&populated, &self.active, &available, &self.sort_rules);

		LoadOrderResolver {
			graph,
			populated,
			available,
			excluded: self.excluded,
			max_attempts: self.sort_rules.max_attempts,
		}
	}
}

pub struct LoadOrderResolver {
	graph: ConstraintGraph,
	populated: Vec<Package>,
	available: HashSet<String>,
	excluded: HashSet<String>,
	max_attempts: usize,
}

impl LoadOrderResolver {
	pub fn graph(&self) -> &ConstraintGraph {
		&self.graph
	}

	/// Active installed packages with community rules applied.
	pub fn packages(&self) -> &[Package] {
		&self.populated
	}

	/// Sorts the graph, breaking cycles as needed.
	///
	/// # Errors
	/// - [`CycleLimitExceeded`](crate::Error::CycleLimitExceeded) when cycles remain after the allowed number of attempts.
	/// No partial order is returned in that case.
	pub fn resolve(mut self) -> crate::Result<Resolution> {
		let outcome = sort(&mut self.graph, self.max_attempts)?;

		let activation_order: Vec<String> = outcome.order.into_iter()
			.filter(|id| self.available.contains(id) && !self.excluded.contains(id))
			.collect();

		let active: Vec<&Package> = self.populated.iter()
			.filter(|p| !self.excluded.contains(p.id_str()))
			.collect();
		let state_valid = verify_state(active.iter().copied());
		let conflicts = find_conflicts(active.iter().copied());
		for c in &conflicts {
			log::warn!("{} is marked incompatible with {}", c.declared_by, c.conflicts_with);
		}

		log::info!("Resolved load order of {} packages, {} constraints dropped", activation_order.len(), outcome.removed.len());

		Ok(Resolution {
			activation_order,
			removed: outcome.removed,
			state_valid,
			conflicts,
			graph: self.graph,
		})
	}
}

#[derive(Debug, Clone)]
pub struct Resolution {
	activation_order: Vec<String>,
	removed: Vec<RemovedConstraint>,
	state_valid: bool,
	conflicts: Vec<Conflict>,
	graph: ConstraintGraph,
}

impl Resolution {
	pub fn activation_order(&self) -> &[String] {
		&self.activation_order
	}

	pub fn into_activation_order(self) -> Vec<String> {
		self.activation_order
	}

	/// Constraints removed to break cycles, in removal order.
	pub fn removed_constraints(&self) -> &[RemovedConstraint] {
		&self.removed
	}

	/// Advisory, the order is produced regardless of incompatibilities.
	pub fn is_state_valid(&self) -> bool {
		self.state_valid
	}

	pub fn conflicts(&self) -> &[Conflict] {
		&self.conflicts
	}

	/// The graph after cycle breaking.
	pub fn graph(&self) -> &ConstraintGraph {
		&self.graph
	}

	/// Activation order followed by every installed package that wasn't part of it.
	pub fn reconcile_with(&self, installed: &[Package]) -> Vec<String> {
		reconcile(&self.activation_order, installed)
	}
}
