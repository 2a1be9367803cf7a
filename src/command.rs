use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{config::Platform, context::HostEnv};

pub const MAC_OPEN: &str = "open";

/// Fixed flags placed before the encoded command.
const POWERSHELL_FLAGS: [&str; 5] = [
    "-NoProfile",
    "-NonInteractive",
    "-ExecutionPolicy",
    "Bypass",
    "-EncodedCommand",
];

/// Which OS mechanism opens things on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Mac,
    /// Windows, or WSL outside a container.
    PowerShell { wsl: bool },
    Unix,
}

impl Family {
    pub fn detect(host: &HostEnv) -> Self {
        match host.platform() {
            Platform::Mac => Family::Mac,
            Platform::Windows => Family::PowerShell { wsl: false },
            _ if host.is_wsl() && !host.is_docker() => Family::PowerShell { wsl: true },
            _ => Family::Unix,
        }
    }
}

/// How the spawned process is wired up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Arguments are already quoted for the Windows command line.
    pub verbatim_args: bool,
    pub discard_stdio: bool,
    /// Move the child into its own process group.
    pub detach: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub spawn: SpawnConfig,
}

/// One launch attempt: a single app name at most.
#[derive(Debug, Clone, Copy, Default)]
pub struct Request<'a> {
    pub target: Option<&'a str>,
    pub app: Option<&'a str>,
    pub arguments: &'a [String],
    pub wait: bool,
    pub background: bool,
    pub new_instance: bool,
}

pub fn build_mac(req: &Request<'_>) -> CommandSpec {
    let mut args = Vec::new();

    if req.wait {
        args.push("--wait-apps".to_string());
    }
    if req.background {
        args.push("--background".to_string());
    }
    if req.new_instance {
        args.push("--new".to_string());
    }
    if let Some(app) = req.app {
        args.push("-a".to_string());
        args.push(app.to_string());
    }
    if let Some(target) = req.target {
        args.push(target.to_string());
    }
    if req.app.is_some() && !req.arguments.is_empty() {
        args.push("--args".to_string());
        args.extend(req.arguments.iter().cloned());
    }

    CommandSpec {
        program: MAC_OPEN.to_string(),
        args,
        spawn: SpawnConfig::default(),
    }
}

/// `powershell` is the executable path, see [`powershell_path`].
pub fn build_powershell(req: &Request<'_>, powershell: &str, wsl: bool) -> CommandSpec {
    let mut args: Vec<String> = POWERSHELL_FLAGS.iter().map(|s| s.to_string()).collect();
    args.push(encode_powershell(&start_process_command(req)));

    CommandSpec {
        program: powershell.to_string(),
        args,
        spawn: SpawnConfig {
            // Under WSL the Linux side builds the Windows command line itself.
            verbatim_args: !wsl,
            ..SpawnConfig::default()
        },
    }
}

/// `opener` runs when no app is given: the helper script or system `xdg-open`.
pub fn build_unix(req: &Request<'_>, opener: &str) -> CommandSpec {
    let program = req.app.unwrap_or(opener).to_string();

    let mut args: Vec<String> = req.arguments.to_vec();
    if let Some(target) = req.target {
        args.push(target.to_string());
    }

    CommandSpec {
        program,
        args,
        spawn: SpawnConfig {
            verbatim_args: false,
            discard_stdio: !req.wait,
            detach: !req.wait,
        },
    }
}

pub fn powershell_path(wsl: bool, mount_point: &str, system_root: &str) -> String {
    if wsl {
        format!("{mount_point}c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe")
    } else {
        format!(r"{system_root}\System32\WindowsPowerShell\v1.0\powershell")
    }
}

/// The `Start-Process` line handed to PowerShell, before encoding.
pub fn start_process_command(req: &Request<'_>) -> String {
    let mut words = vec!["Start".to_string()];

    if req.wait {
        words.push("-Wait".to_string());
    }

    let mut arguments: Vec<&str> = req.arguments.iter().map(String::as_str).collect();

    if let Some(app) = req.app {
        words.push(quote_pwsh_passthrough(app));
        words.push("-ArgumentList".to_string());
        if let Some(target) = req.target {
            arguments.insert(0, target);
        }
    } else if let Some(target) = req.target {
        words.push(quote_pwsh_plain(target));
    }

    if !arguments.is_empty() {
        let list: Vec<String> = arguments.iter().map(|a| quote_pwsh_passthrough(a)).collect();
        words.push(list.join(","));
    }

    words.join(" ")
}

/// UTF-16LE then Base64, the form `-EncodedCommand` expects.
pub fn encode_powershell(command: &str) -> String {
    let bytes: Vec<u8> = command.encode_utf16().flat_map(u16::to_le_bytes).collect();
    BASE64.encode(bytes)
}

// -------------------- quoting helpers --------------------

// Outer quotes are consumed by the command line; the backtick-escaped inner
// quotes reach Start-Process.
fn quote_pwsh_passthrough(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 6);
    out.push_str("\"`\"");
    out.push_str(s);
    out.push_str("`\"\"");
    out
}

fn quote_pwsh_plain(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    out.push_str(s);
    out.push('"');
    out
}
