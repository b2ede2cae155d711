use std::io::Write;

use rmm_rs::manager::ExportFilter;
use rmm_rs::modlist::ModListFormat;
use rmm_rs::package::EnabledState;
use rmm_rs::{Config, Manager, Package, PackageRef};

const COMMANDS: &str = "Commands:
    list                  List installed packages in load order
    query <term>          Search installed packages
    search <term>         Search the workshop
    sync <content id>...  Download and install packages
    update                Update every installed package
    remove <term>         Remove installed packages
    enable <id>...        Activate packages
    disable <id>...       Deactivate packages
    sort                  Sort active packages into a valid load order
    verify                Check active packages for incompatibilities
    order                 Show the active load order
    export [-e|-d] <file> Write a mod list
    import <file>         Install and activate packages from a mod list
    backup <file>         Archive the mods directory (.tar, .tar.gz, .tgz or .zip)
    help                  Show this message";

#[tokio::main]
async fn main() {
	let mut opts = getopts::Options::new();
	opts.optflag( "h", "help",     "Show help");
	opts.optflag( "v", "verbose",  "Increased verbosity");
	opts.optflag( "y", "yes",      "Don't ask for confirmation");
	opts.optflag( "e", "enabled",  "Export only active packages");
	opts.optflag( "d", "disabled", "Export only inactive packages");
	opts.optopt(  "p", "path",     "Game mods directory", "DIR");
	opts.optopt(  "w", "workshop", "Workshop content directory", "DIR");
	opts.optopt(  "u", "user",     "Game user directory", "DIR");
	opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

	let args: Vec<String> = std::env::args().collect();
	let parsed_options = match opts.parse(&args[1..]) {
		Ok(m)  => { m }
		Err(e) => { eprintln!("Unable to parse options: {}", e); std::process::exit(2) }
	};

	let default_level = if parsed_options.opt_present("v") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

	if parsed_options.opt_present("h") || parsed_options.free.is_empty() {
		eprintln!("{}\n{}", opts.usage("Usage: rmm-rs-terminal [options] <command> [args]"), COMMANDS);
		return;
	}

	let overrides = rmm_rs::config::PathOverrides {
		mods_dir: parsed_options.opt_str("p").map(rmm_rs::config::sanitize_path),
		workshop_dir: parsed_options.opt_str("w").map(rmm_rs::config::sanitize_path),
		user_dir: parsed_options.opt_str("u").map(rmm_rs::config::sanitize_path),
	};
	let mut config = Config::discover(overrides);
	match Config::load_from_disk() {
		Ok(saved) => config.merge_missing(saved),
		Err(e) => log::debug!("No saved config: {}", e),
	}

	let mut manager = match Manager::new(config) {
		Ok(m) => m,
		Err(e) => {
			log::error!("Failed to start: {}", e);
			std::process::exit(1);
		}
	};

	let options = CommandOptions {
		yes: parsed_options.opt_present("y"),
		export_filter: if parsed_options.opt_present("e") {
			ExportFilter::Enabled
		} else if parsed_options.opt_present("d") {
			ExportFilter::Disabled
		} else {
			ExportFilter::All
		},
	};

	let command = parsed_options.free[0].as_str();
	let args = &parsed_options.free[1..];
	if let Err(e) = run(&mut manager, command, args, &options).await {
		match e {
			Error::Rmm(rmm_rs::Error::CycleLimitExceeded { .. }) => {
				log::error!("{}. The load order was not changed.", e);
			},
			e => log::error!("{}", e),
		}
		std::process::exit(1);
	}
}

struct CommandOptions {
	yes: bool,
	export_filter: ExportFilter,
}

async fn run(manager: &mut Manager, command: &str, args: &[String], options: &CommandOptions) -> Result<(), Error> {
	match command {
		"list" => print_packages(&manager.order_all_mods()?),
		"query" => print_packages(&manager.search_installed(&join_term(args)?)?),
		"search" => {
			for result in manager.search_workshop(&join_term(args)?).await? {
				let result = PackageRef::from(result);
				println!("{:>12}  {}", result.content_id().unwrap_or_default(), result.title());
			}
		},
		"sync" => {
			let ids = parse_content_ids(args)?;
			match manager.workshop_details(&ids).await {
				Ok(details) => {
					for d in details {
						println!("{:>12}  {} ({} subscribers)", d.content_id, d.name.as_deref().unwrap_or("?"), d.subscriptions.unwrap_or_default());
					}
				},
				Err(e) => log::warn!("Unable to look up package details: {}", e),
			}
			confirm(options.yes, "Download and install these packages?")?;
			let installed = manager.sync_mods(&ids).await?;
			print_packages(&installed);
		},
		"update" => {
			confirm(options.yes, "Update all installed packages?")?;
			let updated = manager.update_mods().await?;
			println!("Updated {} packages.", updated.len());
		},
		"remove" => {
			let packages = manager.search_installed(&join_term(args)?)?;
			if packages.is_empty() {
				println!("No installed packages match.");
				return Ok(());
			}
			print_packages(&packages);
			confirm(options.yes, "Remove these packages?")?;
			let removed = manager.remove_mods(&packages)?;
			println!("Removed {} directories.", removed);
		},
		"enable" => {
			require_args(args)?;
			let count = manager.enable_mods(args)?;
			println!("Activated {} packages.", count);
		},
		"disable" => {
			require_args(args)?;
			let count = manager.disable_mods(args)?;
			println!("Deactivated {} packages.", count);
		},
		"sort" => {
			let resolution = manager.sort_mods().await?;
			for removed in resolution.removed_constraints() {
				println!("Ignored constraint: {} after {} (cycle {})", removed.later, removed.earlier, removed.cycle.join(" -> "));
			}
			for conflict in resolution.conflicts() {
				println!("Warning: {} is incompatible with {}", conflict.declared_by, conflict.conflicts_with);
			}
			for (i, id) in resolution.activation_order().iter().enumerate() {
				println!("{:>4}  {}", i + 1, id);
			}
		},
		"verify" => {
			let conflicts = manager.conflicting_mods()?;
			for conflict in &conflicts {
				println!("{} is incompatible with {}", conflict.declared_by, conflict.conflicts_with);
			}
			if manager.verify_mods()? {
				println!("No incompatibilities found.");
			} else {
				return Err(Error::Incompatible(conflicts.len()));
			}
		},
		"order" => {
			for (i, p) in manager.enabled_mods()?.iter().enumerate() {
				println!("{:>4}  {}", i + 1, p.title());
			}
		},
		"export" => {
			let path = args.first().ok_or(Error::MissingArgument)?;
			let count = manager.export_mods(path, options.export_filter, ModListFormat::V2)?;
			println!("Exported {} packages to {}.", count, path);
		},
		"import" => {
			let path = args.first().ok_or(Error::MissingArgument)?;
			let packages = rmm_rs::modlist::read(path)?;
			print_packages(&packages);
			confirm(options.yes, "Install and activate these packages?")?;

			let ids: Vec<u64> = packages.iter().filter_map(|p| p.content_id).collect();
			let installed = manager.sync_mods(&ids).await?;
			let to_enable: Vec<String> = packages.iter()
				.filter_map(|p| p.id.clone())
				.chain(installed.iter().filter_map(|p| p.id.clone()))
				.collect();
			let count = manager.enable_mods(&to_enable)?;
			println!("Installed {} and activated {} packages.", installed.len(), count);
		},
		"backup" => {
			let path = args.first().ok_or(Error::MissingArgument)?;
			manager.backup_mods(path)?;
			println!("Backed up mods to {}.", path);
		},
		"help" => println!("{}", COMMANDS),
		other => return Err(Error::UnknownCommand(other.to_string())),
	}
	Ok(())
}

fn print_packages(packages: &[Package]) {
	for p in packages {
		let marker = match p.enabled {
			EnabledState::Active => "[x]",
			EnabledState::Inactive => "[ ]",
			EnabledState::Unknown => "   ",
		};
		let content_id = p.content_id.map(|c| c.to_string()).unwrap_or_default();
		println!("{} {:>12}  {}  {} by {}", marker, content_id, p.title(), p.name.as_deref().unwrap_or(""), p.author);
	}
}

fn require_args(args: &[String]) -> Result<(), Error> {
	if args.is_empty() { Err(Error::MissingArgument) } else { Ok(()) }
}

fn join_term(args: &[String]) -> Result<String, Error> {
	require_args(args)?;
	Ok(args.join(" "))
}

fn parse_content_ids(args: &[String]) -> Result<Vec<u64>, Error> {
	require_args(args)?;
	args.iter()
		.map(|a| a.trim().parse::<u64>().map_err(|_| Error::InvalidArgument(a.clone())))
		.collect()
}

fn confirm(yes: bool, prompt: &str) -> Result<(), Error> {
	if yes {
		return Ok(());
	}

	let stdin = std::io::stdin();
	loop {
		print!("{} [(y)/n] ", prompt);
		let _ = std::io::stdout().flush();
		let mut input = String::new();
		let _ = stdin.read_line(&mut input);
		let input = input.trim().to_lowercase();
		if input == "y" || input.is_empty() {
			return Ok(());
		} else if input == "n" {
			return Err(Error::UserCancelled);
		} else {
			println!("\nInput invalid.")
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Rmm(#[from] rmm_rs::Error),
	#[error("Missing argument")]
	MissingArgument,
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Unknown command: {0}")]
	UnknownCommand(String),
	#[error("{0} incompatibilities found")]
	Incompatible(usize),
	#[error("User cancelled an action")]
	UserCancelled,
}
