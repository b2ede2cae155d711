//! Topological sorting that removes edges until the graph can be sorted.

use std::collections::{BinaryHeap, HashMap};

use petgraph::prelude::*;

use super::constraint_graph::{ConstraintGraph, EdgeKind};

/// An edge taken out of the graph to break a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedConstraint {
	pub later: String,
	pub earlier: String,
	pub kind: EdgeKind,
	/// Ids making up the cycle the edge was part of, starting with `later`.
	pub cycle: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SortOutcome {
	/// Ids in activation order.
	pub order: Vec<String>,
	pub removed: Vec<RemovedConstraint>,
}

/// Kahn's algorithm, `None` if the graph has a cycle.
///
/// When several nodes are ready the one added to the graph last is taken first,
/// once reversed this keeps unconstrained nodes in the order they were added.
pub fn topological_sort<N, E>(graph: &StableDiGraph<N, E>) -> Option<Vec<NodeIndex>> {
	let mut in_degree: HashMap<NodeIndex, usize> = graph.node_indices()
		.map(|n| (n, graph.edges_directed(n, Incoming).count()))
		.collect();

	let mut ready: BinaryHeap<NodeIndex> = in_degree.iter()
		.filter(|(_, d)| **d == 0)
		.map(|(n, _)| *n)
		.collect();

	let mut order = Vec::with_capacity(graph.node_count());
	while let Some(n) = ready.pop() {
		order.push(n);
		for e in graph.edges_directed(n, Outgoing) {
			if let Some(d) = in_degree.get_mut(&e.target()) {
				*d -= 1;
				if *d == 0 {
					ready.push(e.target());
				}
			}
		}
	}

	(order.len() == graph.node_count()).then_some(order)
}

fn successors<N, E>(graph: &StableDiGraph<N, E>, n: NodeIndex) -> Vec<NodeIndex> {
	let mut edges: Vec<_> = graph.edges_directed(n, Outgoing).map(|e| (e.id(), e.target())).collect();
	edges.sort_by_key(|(id, _)| *id);
	edges.into_iter().map(|(_, t)| t).collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
	InProgress,
	Done,
}

/// Depth first search for a cycle.
///
/// Starts from nodes in index order and follows edges in the order they were added, so the same graph always gives the same cycle.
/// The returned nodes are in edge order: each has an edge to the next, and the last has an edge back to the first.
pub fn find_cycle<N, E>(graph: &StableDiGraph<N, E>) -> Option<Vec<NodeIndex>> {
	let mut visits = HashMap::<NodeIndex, Visit>::new();

	for start in graph.node_indices() {
		if visits.contains_key(&start) {
			continue;
		}

		visits.insert(start, Visit::InProgress);
		let mut stack = vec![(start, successors(graph, start), 0usize)];

		while let Some((node, next_nodes, pos)) = stack.last_mut() {
			let next = match next_nodes.get(*pos) {
				Some(n) => *n,
				None => {
					visits.insert(*node, Visit::Done);
					stack.pop();
					continue;
				}
			};
			*pos += 1;

			match visits.get(&next) {
				None => {
					visits.insert(next, Visit::InProgress);
					stack.push((next, successors(graph, next), 0));
				},
				Some(Visit::InProgress) => {
					let cycle_start = stack.iter().position(|(n, _, _)| *n == next)?;
					return Some(stack[cycle_start..].iter().map(|(n, _, _)| *n).collect());
				},
				Some(Visit::Done) => {},
			}
		}
	}

	None
}

/// Sorts the graph into activation order, breaking up to `max_attempts` cycles.
///
/// Each attempt removes the first edge of the first cycle found and tries again.
///
/// # Errors
/// - [`CycleLimitExceeded`](crate::Error::CycleLimitExceeded) if the graph still has a cycle after `max_attempts` removals.
pub fn sort(graph: &mut ConstraintGraph, max_attempts: usize) -> crate::Result<SortOutcome> {
	let mut removed = Vec::<RemovedConstraint>::new();

	loop {
		if let Some(sorted) = topological_sort(&graph.graph) {
			let order = sorted.into_iter().rev().map(|n| graph.id(n).to_string()).collect();
			return Ok(SortOutcome { order, removed });
		}

		if removed.len() >= max_attempts {
			log::error!("Unable to break load order cycles after {} attempts", removed.len());
			return Err(crate::Error::CycleLimitExceeded { attempts: removed.len() });
		}

		let cycle = find_cycle(&graph.graph)
			.ok_or_else(|| crate::Error::Validation(String::from("sort failed but no cycle was found")))?;

		let later = cycle[0];
		let earlier = cycle[1 % cycle.len()];
		let edge = graph.graph.find_edge(later, earlier)
			.ok_or_else(|| crate::Error::Validation(String::from("cycle edge missing from graph")))?;
		let kind = graph.graph.remove_edge(edge)
			.ok_or_else(|| crate::Error::Validation(String::from("cycle edge missing from graph")))?;

		let removed_constraint = RemovedConstraint {
			later: graph.id(later).to_string(),
			earlier: graph.id(earlier).to_string(),
			kind,
			cycle: cycle.iter().map(|n| graph.id(*n).to_string()).collect(),
		};
		log::warn!("Cycle found {:?}, dropping constraint that {} loads after {}", removed_constraint.cycle, removed_constraint.later, removed_constraint.earlier);
		removed.push(removed_constraint);
	}
}
