use rmm_rs::manager::ExportFilter;
use rmm_rs::modlist::ModListFormat;
use rmm_rs::package::EnabledState;
use rmm_rs::{Manager, ModsConfig};
use rmm_rs_test_utils::{AboutFixture, TestGame};

fn setup() -> TestGame {
	let _ = env_logger::builder().is_test(true).try_init();

	let game = TestGame::new().unwrap();
	game.add_package("harmony", &AboutFixture::new("brrainz.harmony").content_id(2009463077)).unwrap();
	game.add_package("a", &AboutFixture::new("test.a").load_after(&["test.b"])).unwrap();
	game.add_package("b", &AboutFixture::new("test.b")).unwrap();
	game.add_package("c", &AboutFixture::new("test.c").incompatible_with(&["test.a"])).unwrap();
	game.write_mods_config(&["test.a", "ludeon.rimworld", "brrainz.harmony", "test.b"]).unwrap();
	game
}

fn write_empty_rules(game: &TestGame) {
	let path = rmm_rs::community_rules::rules_path(game.mods_dir());
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::write(path, r#"{"timestamp": 0, "rules": {}}"#).unwrap();
}

fn ids(packages: &[rmm_rs::Package]) -> Vec<&str> {
	packages.iter().map(|p| p.id_str()).collect()
}

#[test]
fn enabled_state_follows_mods_config() {
	let game = setup();
	let manager = Manager::new(game.config()).unwrap();

	let installed = manager.installed_mods().unwrap();
	assert_eq!(ids(&installed), vec!["test.a", "test.b", "test.c", "brrainz.harmony"]);
	assert_eq!(installed[2].enabled, EnabledState::Inactive);
	assert_eq!(installed[3].content_id, Some(2009463077));

	let enabled = manager.enabled_mods().unwrap();
	assert_eq!(ids(&enabled), vec!["test.a", "ludeon.rimworld", "brrainz.harmony", "test.b"]);
	assert_eq!(enabled[1].name.as_deref(), Some("Core"));

	assert_eq!(ids(&manager.disabled_mods().unwrap()), vec!["test.c"]);
	assert_eq!(ids(&manager.search_installed("TEST.C").unwrap()), vec!["test.c"]);
	assert!(manager.search_installed("nothing like this").unwrap().is_empty());
	assert_eq!(ids(&manager.search_installed("tester").unwrap()).len(), 4);
}

#[tokio::test]
async fn sort_writes_resolved_order() {
	let game = setup();
	write_empty_rules(&game);
	let mut manager = Manager::new(game.config()).unwrap();

	let resolution = manager.sort_mods().await.unwrap();
	let expected = ["brrainz.harmony", "ludeon.rimworld", "test.b", "test.a"];
	assert_eq!(resolution.activation_order(), expected);
	assert!(resolution.removed_constraints().is_empty());

	let written = ModsConfig::load(game.mods_config_path()).unwrap();
	assert_eq!(written.active(), expected);
	assert_eq!(written.known_expansions, vec!["ludeon.rimworld.royalty"]);
	assert_eq!(written.version.as_deref(), Some("1.5.4104 rev435"));
}

#[tokio::test]
async fn sort_failure_leaves_mods_config_alone() {
	let game = setup();
	write_empty_rules(&game);
	game.add_package("x", &AboutFixture::new("test.x").load_after(&["test.y"]).load_before(&["test.y"])).unwrap();
	game.add_package("y", &AboutFixture::new("test.y")).unwrap();
	game.write_mods_config(&["test.x", "test.y"]).unwrap();
	let before = game.read_mods_config().unwrap();

	let rules = rmm_rs::load_order::SortRules::default().with_max_attempts(0);
	let mut manager = Manager::new(game.config()).unwrap().with_sort_rules(rules);
	assert!(matches!(manager.sort_mods().await, Err(rmm_rs::Error::CycleLimitExceeded { attempts: 0 })));
	assert_eq!(game.read_mods_config().unwrap(), before);
}

#[test]
fn enable_disable_and_verify() {
	let game = setup();
	let mut manager = Manager::new(game.config()).unwrap();
	assert!(manager.verify_mods().unwrap());

	assert_eq!(manager.enable_mods(["Test.C", "test.a"]).unwrap(), 1);
	assert!(!manager.verify_mods().unwrap());
	let conflicts = manager.conflicting_mods().unwrap();
	assert_eq!(conflicts.len(), 1);
	assert_eq!(conflicts[0].declared_by, "test.c");
	assert_eq!(conflicts[0].conflicts_with, "test.a");

	let written = ModsConfig::load(game.mods_config_path()).unwrap();
	assert_eq!(written.active().last().map(String::as_str), Some("test.c"));

	assert_eq!(manager.disable_mods(["test.c"]).unwrap(), 1);
	assert!(manager.verify_mods().unwrap());
}

#[test]
fn order_all_appends_inactive() {
	let game = setup();
	let manager = Manager::new(game.config()).unwrap();
	let all = manager.order_all_mods().unwrap();
	assert_eq!(ids(&all), vec!["test.a", "ludeon.rimworld", "brrainz.harmony", "test.b", "test.c"]);
}

#[test]
fn missing_mods_config_is_created() {
	let game = TestGame::new().unwrap();
	game.add_package("a", &AboutFixture::new("test.a")).unwrap();
	let mut manager = Manager::new(game.config()).unwrap();

	assert!(manager.enabled_mods().unwrap().is_empty());
	manager.enable_mods(["ludeon.rimworld", "test.a"]).unwrap();
	let written = ModsConfig::load(game.mods_config_path()).unwrap();
	assert_eq!(written.active(), ["ludeon.rimworld", "test.a"]);
}

#[test]
fn export_and_read_mod_list() {
	let game = setup();
	let manager = Manager::new(game.config()).unwrap();
	let path = game.root().join("modlist.csv");

	assert_eq!(manager.export_mods(&path, ExportFilter::Enabled, ModListFormat::V2).unwrap(), 4);
	let packages = rmm_rs::modlist::read(&path).unwrap();
	assert_eq!(ids(&packages), vec!["test.a", "ludeon.rimworld", "brrainz.harmony", "test.b"]);
	assert_eq!(packages[2].content_id, Some(2009463077));

	assert_eq!(manager.export_mods(&path, ExportFilter::Disabled, ModListFormat::V2).unwrap(), 1);
	assert_eq!(ids(&rmm_rs::modlist::read(&path).unwrap()), vec!["test.c"]);
}

#[test]
fn install_from_download_and_remove() {
	let game = setup();
	game.add_download(123, &AboutFixture::new("new.mod")).unwrap();
	let manager = Manager::new(game.config()).unwrap();
	let downloads = game.cache_dir().join("downloads");

	let installed = manager.installed_mods().unwrap();
	let package = rmm_rs::installer::install(&game.mods_dir(), &downloads, 123, &installed, true).unwrap();
	assert_eq!(package.id_str(), "new.mod");
	assert_eq!(package.content_id, Some(123));
	assert!(game.mods_dir().join("new.mod").join("About").join("About.xml").is_file());

	/* installing again by content id replaces the copy named after the package id */
	let installed = manager.installed_mods().unwrap();
	let package = rmm_rs::installer::install(&game.mods_dir(), &downloads, 123, &installed, false).unwrap();
	assert_eq!(package.dir_name.as_deref(), Some("123"));
	assert!(!game.mods_dir().join("new.mod").exists());

	let found = manager.search_installed("123").unwrap();
	assert_eq!(ids(&found), vec!["new.mod"]);
	assert_eq!(manager.remove_mods(&found).unwrap(), 1);
	assert!(!game.mods_dir().join("123").exists());
}

#[test]
fn backup_archives() {
	let game = setup();
	let manager = Manager::new(game.config()).unwrap();

	let zip_path = game.root().join("backup.zip");
	manager.backup_mods(&zip_path).unwrap();
	let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
	assert!(archive.file_names().any(|n| n == "a/About/About.xml"));

	let tgz_path = game.root().join("backup.tgz");
	manager.backup_mods(&tgz_path).unwrap();
	let gz = flate2::read::GzDecoder::new(std::fs::File::open(&tgz_path).unwrap());
	let mut archive = tar::Archive::new(gz);
	let names: Vec<String> = archive.entries().unwrap()
		.map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
		.collect();
	assert!(names.iter().any(|n| n == "Mods/a/About/About.xml"));

	assert!(matches!(manager.backup_mods(game.root().join("backup.rar")), Err(rmm_rs::Error::Validation(_))));
}
