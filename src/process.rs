use std::process::{ExitStatus, Stdio};

use tracing::debug;

use crate::{
    command::CommandSpec,
    error::{LaunchError, Result},
};

/// Outcome of a successful launch.
#[derive(Debug)]
pub enum Launch {
    /// Not waited on. The process belongs to the OS and outlives this handle.
    Detached(Detached),
    /// Waited on until exit.
    Exited(ExitStatus),
}

impl Launch {
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Launch::Detached(_) => None,
            Launch::Exited(status) => Some(*status),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Detached {
    pub program: String,
    pub pid: Option<u32>,
}

/// Spawns `spec`. Without `wait` this returns as soon as the OS has started
/// the process; with `wait` it resolves when the child exits.
pub async fn spawn(spec: &CommandSpec, wait: bool, allow_nonzero_exit_code: bool) -> Result<Launch> {
    let mut cmd = build_command(spec);
    let mut child = cmd.spawn().map_err(|source| LaunchError::LaunchFailure {
        program: spec.program.clone(),
        source,
    })?;

    let pid = child.id();
    debug!(program = %spec.program, ?pid, wait, "spawned");

    if !wait {
        return Ok(Launch::Detached(Detached {
            program: spec.program.clone(),
            pid,
        }));
    }

    let status = child.wait().await.map_err(|source| LaunchError::LaunchFailure {
        program: spec.program.clone(),
        source,
    })?;

    check_exit(&spec.program, status, allow_nonzero_exit_code)
}

fn check_exit(program: &str, status: ExitStatus, allow_nonzero_exit_code: bool) -> Result<Launch> {
    let failed = status.code().and_then(|c| failure_code(c, cfg!(windows)));
    match failed {
        Some(code) if !allow_nonzero_exit_code => Err(LaunchError::NonZeroExit {
            program: program.to_string(),
            code,
        }),
        _ => Ok(Launch::Exited(status)),
    }
}

/// The exit code as an unsigned value when it signals failure.
///
/// Windows exit codes are `u32` and `ExitStatus::code` reinterprets them, so
/// NTSTATUS crashes like `0xC0000005` show up negative there.
fn failure_code(code: i32, windows: bool) -> Option<u32> {
    if windows {
        Some(code as u32).filter(|&c| c != 0)
    } else {
        u32::try_from(code).ok().filter(|&c| c > 0)
    }
}

fn build_command(spec: &CommandSpec) -> tokio::process::Command {
    let mut cmd = std::process::Command::new(&spec.program);
    push_args(&mut cmd, spec);

    if spec.spawn.discard_stdio {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    }

    #[cfg(unix)]
    if spec.spawn.detach {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    tokio::process::Command::from(cmd)
}

#[cfg(windows)]
fn push_args(cmd: &mut std::process::Command, spec: &CommandSpec) {
    use std::os::windows::process::CommandExt;

    if spec.spawn.verbatim_args {
        for a in &spec.args {
            cmd.raw_arg(a);
        }
    } else {
        cmd.args(&spec.args);
    }
}

#[cfg(not(windows))]
fn push_args(cmd: &mut std::process::Command, spec: &CommandSpec) {
    cmd.args(&spec.args);
}
