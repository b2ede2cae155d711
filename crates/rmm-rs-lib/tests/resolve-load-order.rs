use rmm_rs::load_order::*;
use rmm_rs::{CommunityRules, Package};

fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

fn ids(v: &[&str]) -> Vec<String> {
	v.iter().map(|s| s.to_string()).collect()
}

fn position(order: &[String], id: &str) -> usize {
	order.iter().position(|o| o == id).unwrap_or_else(|| panic!("{} missing from {:?}", id, order))
}

#[test]
fn load_after_puts_target_first() {
	init_logging();
	let installed = vec![Package::new("a"), Package::new("b").load_after(["a"])];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	assert_eq!(resolution.activation_order(), ["a", "b"]);

	/* same outcome whatever the current order is */
	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["b", "a"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	assert_eq!(resolution.activation_order(), ["a", "b"]);
}

#[test]
fn direct_cycle_is_broken_once() {
	init_logging();
	let installed = vec![Package::new("a").load_before(["b"]), Package::new("b").load_before(["a"])];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();

	assert_eq!(resolution.removed_constraints().len(), 1);
	let order = resolution.activation_order();
	assert_eq!(order.len(), 2);
	assert!(order == ["a", "b"] || order == ["b", "a"]);

	/* the choice of edge is deterministic */
	let again = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	assert_eq!(again.activation_order(), order);
	assert_eq!(again.removed_constraints(), resolution.removed_constraints());
}

#[test]
fn priority_list_order_is_kept() {
	init_logging();
	let installed = vec![Package::new("expansion2"), Package::new("core"), Package::new("expansion1")];
	let rules = SortRules::empty().with_priority(["core", "expansion1", "expansion2"]);

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["expansion2", "expansion1", "core"])
		.sort_rules(rules)
		.build()
		.resolve()
		.unwrap();
	assert_eq!(resolution.activation_order(), ["core", "expansion1", "expansion2"]);
}

#[test]
fn default_rules_order_game_packages() {
	init_logging();
	let installed = vec![
		Package::new("some.mod"),
		Package::new("brrainz.harmony"),
		Package::new("krkr.rocketman"),
		Package::new("juanlopez2008.lightsout"),
		Package::new("murmur.walllight"),
	];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids([
			"krkr.rocketman",
			"some.mod",
			"ludeon.rimworld.biotech",
			"juanlopez2008.lightsout",
			"murmur.walllight",
			"ludeon.rimworld",
			"brrainz.harmony",
			"not.installed",
		])
		.build()
		.resolve()
		.unwrap();
	let order = resolution.activation_order();

	/* expansions count as installed, missing packages are dropped */
	assert_eq!(order.len(), 7);
	assert!(!order.iter().any(|o| o == "not.installed"));
	assert_eq!(&order[..3], ["brrainz.harmony", "ludeon.rimworld", "ludeon.rimworld.biotech"]);
	assert!(position(order, "murmur.walllight") < position(order, "juanlopez2008.lightsout"));
	assert_eq!(order.last().map(String::as_str), Some("krkr.rocketman"));
}

#[test]
fn community_rules_add_constraints() {
	init_logging();
	let rules = CommunityRules::from_json(r#"{"rules": {"b": {"loadBefore": ["a"]}}}"#).unwrap();
	let installed = vec![Package::new("a"), Package::new("b")];

	let resolver = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b"])
		.community_rules(&rules)
		.sort_rules(SortRules::empty())
		.build();
	assert!(resolver.packages()[1].load_before.contains("a"));
	assert_eq!(resolver.graph().constraint_kind("a", "b"), Some(EdgeKind::Declared));

	let resolution = resolver.resolve().unwrap();
	assert_eq!(resolution.activation_order(), ["b", "a"]);
	/* callers' records are untouched */
	assert!(installed[1].is_unconstrained());
}

#[test]
fn incompatibility_is_advisory() {
	init_logging();
	let installed = vec![Package::new("c").incompatible_with(["d"]), Package::new("d")];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["c", "d"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	assert!(!resolution.is_state_valid());
	assert_eq!(resolution.activation_order().len(), 2);

	assert!(!verify_state(&installed));
	assert!(verify_state(&installed[..1]));
}

#[test]
fn sorted_then_reconciled_keeps_every_package() {
	init_logging();
	/* a chain of ten active packages, each loading after the previous, plus five inactive */
	let mut installed = Vec::<Package>::new();
	for i in 0..10 {
		let mut p = Package::new(format!("active.{}", i));
		if i > 0 {
			p = p.load_after([format!("active.{}", i - 1)]);
		}
		installed.push(p);
	}
	for i in 0..5 {
		installed.insert(i * 2, Package::new(format!("inactive.{}", i)));
	}

	let mut active = ids(&["active.9", "active.3", "active.0", "active.7", "active.1", "active.5", "active.2", "active.8", "active.6", "active.4"]);
	active.reverse();

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(&active)
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	let expected: Vec<String> = (0..10).map(|i| format!("active.{}", i)).collect();
	assert_eq!(resolution.activation_order(), expected.as_slice());

	let all = resolution.reconcile_with(&installed);
	assert_eq!(all.len(), 15);
	assert_eq!(&all[..10], expected.as_slice());
	assert_eq!(&all[10..], ["inactive.0", "inactive.1", "inactive.2", "inactive.3", "inactive.4"]);
}

#[test]
fn valid_order_is_unchanged() {
	init_logging();
	let installed = vec![
		Package::new("lib"),
		Package::new("ui"),
		Package::new("content").load_after(["lib"]),
		Package::new("patch").load_after(["content"]).load_before(["late"]),
		Package::new("late"),
	];
	let active = ids(&["ludeon.rimworld", "ui", "lib", "content", "patch", "late"]);

	let first = LoadOrderBuilder::new(&installed)
		.active_ids(&active)
		.build()
		.resolve()
		.unwrap()
		.into_activation_order();
	assert_eq!(first, active);

	let second = LoadOrderBuilder::new(&installed)
		.active_ids(&first)
		.build()
		.resolve()
		.unwrap()
		.into_activation_order();
	assert_eq!(second, first);
}

#[test]
fn surviving_constraints_are_satisfied() {
	init_logging();
	let installed = vec![
		Package::new("a").load_after(["b"]),
		Package::new("b").load_after(["c"]),
		Package::new("c").load_after(["a"]),
		Package::new("d").load_before(["a"]).load_after(["e"]),
		Package::new("e"),
	];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b", "c", "d", "e"])
		.sort_rules(SortRules::empty())
		.build()
		.resolve()
		.unwrap();
	let order = resolution.activation_order();
	assert_eq!(resolution.removed_constraints().len(), 1);

	for (later, earlier, _) in resolution.graph().constraints() {
		assert!(position(order, earlier) < position(order, later), "{} should load before {}", earlier, later);
	}
}

#[test]
fn dense_cycles_abort() {
	init_logging();
	let names: Vec<String> = (0..8).map(|i| format!("m{}", i)).collect();
	let installed: Vec<Package> = names.iter()
		.map(|n| Package::new(n).load_after(names.iter().filter(|o| *o != n)))
		.collect();

	let result = LoadOrderBuilder::new(&installed)
		.active_ids(&names)
		.sort_rules(SortRules::empty())
		.build()
		.resolve();

	match result {
		Err(rmm_rs::Error::CycleLimitExceeded { attempts }) => assert_eq!(attempts, DEFAULT_MAX_ATTEMPTS),
		other => panic!("expected cycle limit, got {:?}", other.map(|r| r.into_activation_order())),
	}
}

#[test]
fn excluded_ids_are_left_out() {
	init_logging();
	let installed = vec![Package::new("a"), Package::new("b").load_after(["a"]), Package::new("c")];

	let resolution = LoadOrderBuilder::new(&installed)
		.active_ids(["a", "b", "c"])
		.sort_rules(SortRules::empty())
		.exclude(["A"])
		.build()
		.resolve()
		.unwrap();
	assert_eq!(resolution.activation_order(), ["b", "c"]);
}
