use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use crate::registry::PlatformBinaryTable;

pub const CONFIG_ENV: &str = "PORTICO_CONFIG";
pub const SYSTEM_HELPER_ENV: &str = "PORTICO_SYSTEM_HELPER";

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("portico").join("config.toml");
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".config").join("portico").join("config.toml");
    }
    PathBuf::from("portico/config.toml")
}

/// Config path precedence:
/// 1) CLI --config (must exist)
/// 2) PORTICO_CONFIG (must exist)
/// 3) default XDG_CONFIG_HOME/portico/config.toml (only if present)
pub fn locate_config(cli_config: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = cli_config {
        if !p.exists() {
            bail!("--config was provided but file does not exist: {}", p.display());
        }
        return Ok(Some(p.to_path_buf()));
    }

    if let Some(p) = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
    {
        if !p.exists() {
            bail!("{CONFIG_ENV} is set but file does not exist: {}", p.display());
        }
        return Ok(Some(p));
    }

    let p = default_config_path();
    Ok(p.exists().then_some(p))
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub helper: HelperConfig,

    /// Extra registry entries, keyed by logical app name.
    #[serde(default)]
    pub apps: BTreeMap<String, PlatformBinaryTable>,
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Loads the located config, or an empty one when none exists.
    pub fn load(cli_config: Option<&Path>) -> Result<Self> {
        match locate_config(cli_config)? {
            Some(p) => Self::load_from_path(&p),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub wait: bool,

    #[serde(default)]
    pub allow_nonzero_exit_code: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct HelperConfig {
    /// Always use the system `xdg-open` instead of the bundled helper script.
    #[serde(default)]
    pub prefer_system: bool,

    /// Scratch directory for the helper script (defaults to the OS temp dir).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl HelperConfig {
    pub fn prefer_system_effective(&self) -> bool {
        self.prefer_system || env_flag(SYSTEM_HELPER_ENV)
    }
}

fn env_flag(key: &str) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Mac,
    Windows,
    Linux,
    Android,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Platform::Mac => "mac",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Aarch64,
    Arm,
    Other,
}

impl Arch {
    pub fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Arch::X86_64
        } else if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else if cfg!(target_arch = "arm") {
            Arch::Arm
        } else {
            Arch::Other
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Arm => "arm",
            Arch::Other => "other",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
