use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{Arch, Platform};

/// Default for the `root` key of `[automount]` in wsl.conf.
pub const DEFAULT_MOUNT_POINT: &str = "/mnt/";

const WSL_MARKER: &str = "microsoft";

/// Files read to learn about the host. Overridable so tests can use fixtures.
#[derive(Debug, Clone)]
pub struct Probes {
    pub kernel_release: PathBuf,
    pub proc_version: PathBuf,
    pub docker_env: PathBuf,
    pub cgroup: PathBuf,
    pub wsl_conf: PathBuf,
}

impl Default for Probes {
    fn default() -> Self {
        Self {
            kernel_release: PathBuf::from("/proc/sys/kernel/osrelease"),
            proc_version: PathBuf::from("/proc/version"),
            docker_env: PathBuf::from("/.dockerenv"),
            cgroup: PathBuf::from("/proc/self/cgroup"),
            wsl_conf: PathBuf::from("/etc/wsl.conf"),
        }
    }
}

/// Facts about the host, each computed on first use and then frozen.
#[derive(Debug)]
pub struct HostEnv {
    platform: Platform,
    arch: Arch,
    probes: Probes,

    wsl: OnceLock<bool>,
    docker: OnceLock<bool>,
    mount_point: OnceCell<String>,
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnv {
    pub fn new() -> Self {
        Self::with_probes(Platform::current(), Arch::current(), Probes::default())
    }

    pub fn with_probes(platform: Platform, arch: Arch, probes: Probes) -> Self {
        Self {
            platform,
            arch,
            probes,
            wsl: OnceLock::new(),
            docker: OnceLock::new(),
            mount_point: OnceCell::new(),
        }
    }

    /// The process-wide host context.
    pub fn global() -> &'static HostEnv {
        static GLOBAL: OnceLock<HostEnv> = OnceLock::new();
        GLOBAL.get_or_init(HostEnv::new)
    }

    // ---------- public getters ----------

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn probes(&self) -> &Probes {
        &self.probes
    }

    /// Linux under WSL, and not inside a container (runtimes forward the
    /// host kernel string into containers).
    pub fn is_wsl(&self) -> bool {
        *self.wsl.get_or_init(|| {
            let wsl = self.detect_wsl();
            debug!(wsl, "detected WSL");
            wsl
        })
    }

    pub fn is_docker(&self) -> bool {
        *self.docker.get_or_init(|| {
            let docker = has_docker_env(&self.probes.docker_env)
                || has_docker_cgroup(&self.probes.cgroup);
            debug!(docker, "detected container");
            docker
        })
    }

    /// Prefix under which Windows fixed drives are mounted (always ends in `/`).
    pub async fn wsl_mount_point(&self) -> &str {
        self.mount_point
            .get_or_init(|| read_mount_point(&self.probes.wsl_conf))
            .await
    }

    fn detect_wsl(&self) -> bool {
        if self.platform != Platform::Linux {
            return false;
        }

        if file_contains_marker(&self.probes.kernel_release)
            || file_contains_marker(&self.probes.proc_version)
        {
            return !self.is_docker();
        }

        false
    }
}

/// `%SYSTEMROOT%`, or the stock Windows directory when unset.
pub fn system_root() -> String {
    std::env::var("SYSTEMROOT")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| r"C:\Windows".to_string())
}

// -------------------- probes --------------------

fn file_contains_marker(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|s| s.to_lowercase().contains(WSL_MARKER))
        .unwrap_or(false)
}

fn has_docker_env(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

fn has_docker_cgroup(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|s| s.contains("docker"))
        .unwrap_or(false)
}

async fn read_mount_point(path: &Path) -> String {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(t) => t,
        Err(_) => return DEFAULT_MOUNT_POINT.to_string(),
    };

    let mount = parse_mount_root(&text).unwrap_or_else(|| DEFAULT_MOUNT_POINT.to_string());
    debug!(%mount, conf = %path.display(), "resolved WSL mount point");
    mount
}

/// Finds the first uncommented `root = <path>` line in wsl.conf text.
pub fn parse_mount_root(text: &str) -> Option<String> {
    for line in text.lines() {
        let raw = line.split('#').next().unwrap_or("").trim();
        if raw.is_empty() {
            continue;
        }

        let Some((k, v)) = raw.split_once('=') else {
            continue;
        };

        if k.trim() != "root" {
            continue;
        }

        let mut val = v.trim();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].trim();
        }

        if val.is_empty() {
            continue;
        }

        return Some(if val.ends_with('/') {
            val.to_string()
        } else {
            format!("{val}/")
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let p = self.dir.path().join(name);
            fs::write(&p, text).unwrap();
            p
        }

        fn missing(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn probes(&self) -> Probes {
            Probes {
                kernel_release: self.missing("osrelease"),
                proc_version: self.missing("version"),
                docker_env: self.missing("dockerenv"),
                cgroup: self.missing("cgroup"),
                wsl_conf: self.missing("wsl.conf"),
            }
        }

        fn host(&self, probes: Probes) -> HostEnv {
            HostEnv::with_probes(Platform::Linux, Arch::X86_64, probes)
        }
    }

    #[test]
    fn wsl_from_kernel_release() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.kernel_release = fx.write("osrelease", "5.15.167.4-microsoft-standard-WSL2\n");

        assert!(fx.host(probes).is_wsl());
    }

    #[test]
    fn wsl_from_proc_version_is_case_insensitive() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.proc_version = fx.write("version", "Linux version 4.4.0-19041-Microsoft (gcc)\n");

        assert!(fx.host(probes).is_wsl());
    }

    #[test]
    fn container_masks_wsl_signature() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.kernel_release = fx.write("osrelease", "5.15-microsoft-standard-WSL2");
        probes.docker_env = fx.write("dockerenv", "");

        let host = fx.host(probes);
        assert!(host.is_docker());
        assert!(!host.is_wsl());
    }

    #[test]
    fn docker_cgroup_masks_wsl_signature() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.proc_version = fx.write("version", "microsoft");
        probes.cgroup = fx.write("cgroup", "12:pids:/docker/3f2a9c\n");

        let host = fx.host(probes);
        assert!(host.is_docker());
        assert!(!host.is_wsl());
    }

    #[test]
    fn unreadable_probes_mean_plain_linux() {
        let fx = Fixture::new();
        let host = fx.host(fx.probes());
        assert!(!host.is_wsl());
        assert!(!host.is_docker());
    }

    #[test]
    fn wsl_only_possible_on_linux() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.kernel_release = fx.write("osrelease", "microsoft");

        let host = HostEnv::with_probes(Platform::Mac, Arch::Aarch64, probes);
        assert!(!host.is_wsl());
    }

    #[test]
    fn detection_is_frozen_after_first_call() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.kernel_release = fx.write("osrelease", "microsoft");
        let host = fx.host(probes);

        assert!(host.is_wsl());
        fs::write(fx.dir.path().join("dockerenv"), "").unwrap();
        assert!(host.is_wsl());
    }

    #[test]
    fn parse_mount_root_variants() {
        assert_eq!(parse_mount_root("root=/custom/").as_deref(), Some("/custom/"));
        assert_eq!(parse_mount_root("root = /custom").as_deref(), Some("/custom/"));
        assert_eq!(
            parse_mount_root("[automount]\nenabled = true\n  root = /win/  \n").as_deref(),
            Some("/win/")
        );
        assert_eq!(parse_mount_root("root = \"/quoted\"").as_deref(), Some("/quoted/"));
    }

    #[test]
    fn parse_mount_root_ignores_comments() {
        assert_eq!(parse_mount_root("# root=/ignored/\n"), None);
        assert_eq!(parse_mount_root("  # root = /ignored/"), None);
        assert_eq!(
            parse_mount_root("# root=/ignored/\nroot = /real\n").as_deref(),
            Some("/real/")
        );
        assert_eq!(
            parse_mount_root("root = /drives # trailing note").as_deref(),
            Some("/drives/")
        );
    }

    #[test]
    fn parse_mount_root_skips_other_keys() {
        assert_eq!(parse_mount_root("fsroot = /x\noptions = root=/y"), None);
        assert_eq!(parse_mount_root("root =\n"), None);
    }

    #[tokio::test]
    async fn mount_point_defaults_without_config() {
        let fx = Fixture::new();
        let host = fx.host(fx.probes());
        assert_eq!(host.wsl_mount_point().await, DEFAULT_MOUNT_POINT);
    }

    #[tokio::test]
    async fn mount_point_commented_line_keeps_default() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.wsl_conf = fx.write("wsl.conf", "[automount]\n# root=/ignored/\n");

        let host = fx.host(probes);
        assert_eq!(host.wsl_mount_point().await, DEFAULT_MOUNT_POINT);
    }

    #[tokio::test]
    async fn mount_point_is_read_and_memoized() {
        let fx = Fixture::new();
        let mut probes = fx.probes();
        probes.wsl_conf = fx.write("wsl.conf", "[automount]\nroot = /custom\n");

        let host = fx.host(probes);
        assert_eq!(host.wsl_mount_point().await, "/custom/");

        fx.write("wsl.conf", "[automount]\nroot = /changed/\n");
        assert_eq!(host.wsl_mount_point().await, "/custom/");
    }
}
