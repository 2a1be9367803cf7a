pub mod chain;
pub mod cli;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod launch;
pub mod options;
pub mod process;
pub mod registry;
pub mod report;
pub mod script;

pub use command::{CommandSpec, Family};
pub use config::{Arch, Config, Platform};
pub use context::HostEnv;
pub use error::{LaunchError, RegistryError};
pub use launch::{open, open_app, Launcher};
pub use options::{AppName, AppSpec, LaunchOptions};
pub use process::Launch;
pub use registry::{apps, AppRegistry, Binary, WellKnown};
pub use script::HelperInstaller;
