use serde::Deserialize;
use std::{collections::BTreeMap, sync::OnceLock};

use crate::{
    config::{Arch, Platform},
    context::HostEnv,
    error::RegistryError,
};

/// A resolved application: one binary, or candidates to try in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binary {
    Single(String),
    Candidates(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BinaryChoice {
    Name(String),
    Candidates(Vec<String>),
}

impl BinaryChoice {
    fn to_binary(&self) -> Binary {
        match self {
            BinaryChoice::Name(n) => Binary::Single(n.clone()),
            BinaryChoice::Candidates(c) => Binary::Candidates(c.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BinarySpec {
    Name(String),
    Candidates(Vec<String>),
    PerArch(ArchTable),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchTable {
    #[serde(default)]
    pub x86: Option<BinaryChoice>,
    #[serde(default)]
    pub x86_64: Option<BinaryChoice>,
    #[serde(default)]
    pub aarch64: Option<BinaryChoice>,
    #[serde(default)]
    pub arm: Option<BinaryChoice>,
}

impl ArchTable {
    fn for_arch(&self, arch: Arch) -> Option<&BinaryChoice> {
        match arch {
            Arch::X86 => self.x86.as_ref(),
            Arch::X86_64 => self.x86_64.as_ref(),
            Arch::Aarch64 => self.aarch64.as_ref(),
            Arch::Arm => self.arm.as_ref(),
            Arch::Other => None,
        }
    }
}

/// Per-platform binaries for one logical app, plus an optional WSL override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformBinaryTable {
    #[serde(default)]
    pub mac: Option<BinarySpec>,
    #[serde(default)]
    pub windows: Option<BinarySpec>,
    #[serde(default)]
    pub linux: Option<BinarySpec>,
    #[serde(default)]
    pub android: Option<BinarySpec>,
    #[serde(default)]
    pub other: Option<BinarySpec>,
    #[serde(default)]
    pub wsl: Option<BinarySpec>,
}

impl PlatformBinaryTable {
    fn for_platform(&self, platform: Platform) -> Option<&BinarySpec> {
        match platform {
            Platform::Mac => self.mac.as_ref(),
            Platform::Windows => self.windows.as_ref(),
            Platform::Linux => self.linux.as_ref(),
            Platform::Android => self.android.as_ref(),
            Platform::Other => self.other.as_ref(),
        }
    }
}

pub fn resolve_binary(
    table: &PlatformBinaryTable,
    platform: Platform,
    arch: Arch,
    is_wsl: bool,
) -> Result<Binary, RegistryError> {
    if is_wsl {
        if let Some(wsl) = table.wsl.as_ref() {
            return resolve_arch(wsl, arch);
        }
    }

    let spec = table
        .for_platform(platform)
        .ok_or(RegistryError::UnsupportedPlatform { platform })?;
    resolve_arch(spec, arch)
}

fn resolve_arch(spec: &BinarySpec, arch: Arch) -> Result<Binary, RegistryError> {
    match spec {
        BinarySpec::Name(n) => Ok(Binary::Single(n.clone())),
        BinarySpec::Candidates(c) => Ok(Binary::Candidates(c.clone())),
        BinarySpec::PerArch(table) => table
            .for_arch(arch)
            .map(BinaryChoice::to_binary)
            .ok_or(RegistryError::UnsupportedArchitecture { arch }),
    }
}

// -------------------- well-known apps --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    Chrome,
    Firefox,
    Edge,
}

impl WellKnown {
    pub const ALL: [WellKnown; 3] = [WellKnown::Chrome, WellKnown::Firefox, WellKnown::Edge];

    pub fn key(self) -> &'static str {
        match self {
            WellKnown::Chrome => "chrome",
            WellKnown::Firefox => "firefox",
            WellKnown::Edge => "edge",
        }
    }

    pub fn table(self) -> PlatformBinaryTable {
        match self {
            WellKnown::Chrome => PlatformBinaryTable {
                mac: Some(name("google chrome")),
                windows: Some(name("chrome")),
                linux: Some(candidates(&["google-chrome", "google-chrome-stable", "chromium"])),
                wsl: Some(BinarySpec::PerArch(ArchTable {
                    x86: Some(BinaryChoice::Name(
                        "/mnt/c/Program Files (x86)/Google/Chrome/Application/chrome.exe".into(),
                    )),
                    x86_64: Some(BinaryChoice::Candidates(vec![
                        "/mnt/c/Program Files/Google/Chrome/Application/chrome.exe".into(),
                        "/mnt/c/Program Files (x86)/Google/Chrome/Application/chrome.exe".into(),
                    ])),
                    ..ArchTable::default()
                })),
                ..PlatformBinaryTable::default()
            },
            WellKnown::Firefox => PlatformBinaryTable {
                mac: Some(name("firefox")),
                windows: Some(name(r"C:\Program Files\Mozilla Firefox\firefox.exe")),
                linux: Some(name("firefox")),
                wsl: Some(name("/mnt/c/Program Files/Mozilla Firefox/firefox.exe")),
                ..PlatformBinaryTable::default()
            },
            WellKnown::Edge => PlatformBinaryTable {
                mac: Some(name("microsoft edge")),
                windows: Some(name("msedge")),
                linux: Some(candidates(&["microsoft-edge", "microsoft-edge-dev"])),
                wsl: Some(name(
                    "/mnt/c/Program Files (x86)/Microsoft/Edge/Application/msedge.exe",
                )),
                ..PlatformBinaryTable::default()
            },
        }
    }
}

fn name(n: &str) -> BinarySpec {
    BinarySpec::Name(n.to_string())
}

fn candidates(list: &[&str]) -> BinarySpec {
    BinarySpec::Candidates(list.iter().map(|s| s.to_string()).collect())
}

// -------------------- registry --------------------

#[derive(Debug)]
struct Entry {
    table: PlatformBinaryTable,
    resolved: OnceLock<Result<Binary, RegistryError>>,
}

impl Entry {
    fn new(table: PlatformBinaryTable) -> Self {
        Self {
            table,
            resolved: OnceLock::new(),
        }
    }
}

/// Logical app name -> binary for this host. Each key resolves once, on first
/// access, independently of the others.
#[derive(Debug)]
pub struct AppRegistry<'h> {
    host: &'h HostEnv,
    entries: BTreeMap<String, Entry>,
}

impl<'h> AppRegistry<'h> {
    pub fn builtin(host: &'h HostEnv) -> Self {
        let entries = WellKnown::ALL
            .iter()
            .map(|w| (w.key().to_string(), Entry::new(w.table())))
            .collect();
        Self { host, entries }
    }

    /// Built-ins plus `custom`; custom entries replace built-ins of the same key.
    pub fn with_custom(
        host: &'h HostEnv,
        custom: impl IntoIterator<Item = (String, PlatformBinaryTable)>,
    ) -> Self {
        let mut reg = Self::builtin(host);
        for (key, table) in custom {
            reg.entries.insert(key, Entry::new(table));
        }
        reg
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `None` when the key is not registered.
    pub fn resolve(&self, key: &str) -> Option<Result<&Binary, RegistryError>> {
        let entry = self.entries.get(key)?;
        let resolved = entry.resolved.get_or_init(|| {
            resolve_binary(
                &entry.table,
                self.host.platform(),
                self.host.arch(),
                self.host.is_wsl(),
            )
        });
        Some(resolved.as_ref().map_err(|e| *e))
    }

    pub fn well_known(&self, app: WellKnown) -> Result<&Binary, RegistryError> {
        self.resolve(app.key()).unwrap_or(Err(RegistryError::UnsupportedPlatform {
            platform: self.host.platform(),
        }))
    }
}

impl AppRegistry<'static> {
    pub fn global() -> &'static AppRegistry<'static> {
        static GLOBAL: OnceLock<AppRegistry<'static>> = OnceLock::new();
        GLOBAL.get_or_init(|| AppRegistry::builtin(HostEnv::global()))
    }
}

/// Accessors for the well-known apps on the process-wide registry.
pub mod apps {
    use super::{AppRegistry, Binary, WellKnown};
    use crate::error::RegistryError;

    pub fn chrome() -> Result<&'static Binary, RegistryError> {
        AppRegistry::global().well_known(WellKnown::Chrome)
    }

    pub fn firefox() -> Result<&'static Binary, RegistryError> {
        AppRegistry::global().well_known(WellKnown::Firefox)
    }

    pub fn edge() -> Result<&'static Binary, RegistryError> {
        AppRegistry::global().well_known(WellKnown::Edge)
    }
}
