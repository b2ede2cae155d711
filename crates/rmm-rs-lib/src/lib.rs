pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod package;
pub use package::Package;
pub use package::PackageRef;

pub mod about;
pub mod mod_folder;
pub mod community_rules;
pub use community_rules::CommunityRules;

pub mod load_order;
pub mod mods_config;
pub use mods_config::ModsConfig;

pub mod modlist;
pub mod workshop;
pub mod installer;
pub mod manager;
pub use manager::Manager;
