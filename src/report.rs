use crate::{
    command::Family,
    context::HostEnv,
    registry::{AppRegistry, Binary},
    script::HelperInstaller,
};

/// Human-readable summary of what this host looks like to the launcher.
pub async fn build_report(host: &HostEnv, registry: &AppRegistry<'_>, helper: &HelperInstaller) -> String {
    let mut out = String::new();

    out.push_str("portico report\n");
    out.push_str("==============\n");
    out.push_str(&format!("platform: {}\n", host.platform()));
    out.push_str(&format!("arch: {}\n", host.arch()));
    out.push_str(&format!("wsl: {}\n", host.is_wsl()));
    out.push_str(&format!("docker: {}\n", host.is_docker()));

    let family = Family::detect(host);
    out.push_str(&format!("family: {family:?}\n"));

    if let Family::PowerShell { wsl: true } = family {
        out.push_str(&format!("wsl mount point: {}\n", host.wsl_mount_point().await));
    }

    if family == Family::Unix {
        if helper.uses_helper(host.platform()) {
            out.push_str(&format!("helper: {}\n", helper.script_path().display()));
        } else {
            out.push_str("helper: system xdg-open\n");
        }
    }

    out.push_str("\napps\n");
    for key in registry.keys() {
        match registry.resolve(key) {
            Some(Ok(Binary::Single(name))) => {
                out.push_str(&format!("  {key}: {name}\n"));
            }
            Some(Ok(Binary::Candidates(names))) => {
                out.push_str(&format!("  {key}: {}\n", names.join(" | ")));
            }
            Some(Err(err)) => {
                out.push_str(&format!("  {key}: {err}\n"));
            }
            None => {}
        }
    }

    out
}
