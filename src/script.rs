use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, warn};

use crate::config::{HelperConfig, Platform};

/// File name of the helper inside the scratch directory.
pub const HELPER_NAME: &str = "xdg-open";

/// Opener used when the helper can't or shouldn't be installed.
pub const SYSTEM_OPENER: &str = "xdg-open";

const HELPER_SCRIPT: &str = include_str!("../assets/xdg-open.sh");

/// Installs the bundled open-helper script on demand.
#[derive(Debug, Clone)]
pub struct HelperInstaller {
    dir: PathBuf,
    prefer_system: bool,
}

impl Default for HelperInstaller {
    fn default() -> Self {
        Self::from_config(&HelperConfig::default())
    }
}

impl HelperInstaller {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefer_system: false,
        }
    }

    pub fn from_config(cfg: &HelperConfig) -> Self {
        Self {
            dir: cfg.dir.clone().unwrap_or_else(std::env::temp_dir),
            prefer_system: cfg.prefer_system_effective(),
        }
    }

    pub fn prefer_system(mut self, prefer_system: bool) -> Self {
        self.prefer_system = prefer_system;
        self
    }

    pub fn script_path(&self) -> PathBuf {
        self.dir.join(HELPER_NAME)
    }

    /// Whether `platform` is allowed a self-installed helper at all.
    pub fn uses_helper(&self, platform: Platform) -> bool {
        !self.prefer_system && platform != Platform::Android
    }

    /// Returns the program to run: the helper path, or the system opener when
    /// the helper is disallowed or could not be written.
    pub async fn ensure(&self, platform: Platform) -> String {
        if !self.uses_helper(platform) {
            return SYSTEM_OPENER.to_string();
        }

        let path = self.script_path();
        match materialize(&path).await {
            Ok(()) => path.to_string_lossy().to_string(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not install open helper, using system xdg-open");
                SYSTEM_OPENER.to_string()
            }
        }
    }
}

async fn materialize(path: &Path) -> io::Result<()> {
    if is_installed(path).await {
        return Ok(());
    }

    // Written beside the target and renamed in, so `path` is absent or complete.
    let staging = staging_path(path);
    let installed = async {
        tokio::fs::write(&staging, HELPER_SCRIPT).await?;
        make_executable(&staging).await?;
        tokio::fs::rename(&staging, path).await
    }
    .await;

    if let Err(err) = installed {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(err);
    }

    debug!(path = %path.display(), "installed open helper");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{HELPER_NAME}.{}.{seq}.tmp", std::process::id()))
}

/// A regular file we can run. Anything else is replaced.
#[cfg(unix)]
async fn is_installed(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
async fn is_installed(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn installs_script_once() {
        let dir = tempfile::tempdir().unwrap();
        let installer = HelperInstaller::new(dir.path());

        let first = installer.ensure(Platform::Linux).await;
        assert_eq!(first, installer.script_path().to_string_lossy());
        assert_eq!(std::fs::read_to_string(installer.script_path()).unwrap(), HELPER_SCRIPT);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(installer.script_path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        // A second call must not rewrite what is already there.
        std::fs::write(installer.script_path(), "#!/bin/sh\n# local edit\n").unwrap();
        let second = installer.ensure(Platform::Linux).await;
        assert_eq!(second, first);
        assert_eq!(
            std::fs::read_to_string(installer.script_path()).unwrap(),
            "#!/bin/sh\n# local edit\n"
        );
    }

    #[tokio::test]
    async fn falls_back_to_system_opener_on_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let installer = HelperInstaller::new(dir.path().join("does/not/exist"));
        assert_eq!(installer.ensure(Platform::Linux).await, SYSTEM_OPENER);
    }

    #[tokio::test]
    async fn system_opener_when_helper_disallowed() {
        let dir = tempfile::tempdir().unwrap();

        let android = HelperInstaller::new(dir.path());
        assert_eq!(android.ensure(Platform::Android).await, SYSTEM_OPENER);

        let prefer = HelperInstaller::new(dir.path()).prefer_system(true);
        assert_eq!(prefer.ensure(Platform::Linux).await, SYSTEM_OPENER);

        assert!(!dir.path().join(HELPER_NAME).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn replaces_stale_non_executable_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let installer = HelperInstaller::new(dir.path());
        let path = installer.script_path();
        std::fs::write(&path, "#!/bin/sh\n# trunc").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(installer.ensure(Platform::Linux).await, path.to_string_lossy());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), HELPER_SCRIPT);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, [HELPER_NAME]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn installed_helper_parses_as_sh() {
        let dir = tempfile::tempdir().unwrap();
        let installer = HelperInstaller::new(dir.path());
        let program = installer.ensure(Platform::Linux).await;

        let status = tokio::process::Command::new("/bin/sh")
            .arg("-n")
            .arg(&program)
            .status()
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn concurrent_installs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let installer = HelperInstaller::new(dir.path());

        let (a, b) = tokio::join!(installer.ensure(Platform::Linux), installer.ensure(Platform::Linux));
        assert_eq!(a, b);
        assert_eq!(a, installer.script_path().to_string_lossy());
        assert_eq!(std::fs::read_to_string(installer.script_path()).unwrap(), HELPER_SCRIPT);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn from_config_uses_dir_override() {
        let cfg = HelperConfig {
            prefer_system: false,
            dir: Some(PathBuf::from("/var/tmp/portico")),
        };
        let installer = HelperInstaller::from_config(&cfg);
        assert_eq!(installer.script_path(), Path::new("/var/tmp/portico/xdg-open"));
    }

    #[test]
    fn bundled_script_is_posix_sh() {
        assert!(HELPER_SCRIPT.starts_with("#!/bin/sh\n"));
        assert!(HELPER_SCRIPT.contains("xdg-open"));
    }
}
