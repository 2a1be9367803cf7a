use tracing::debug;

use crate::{
    chain,
    command::{self, CommandSpec, Family, Request},
    context::{self, HostEnv},
    error::Result,
    options::{AppName, AppSpec, LaunchOptions},
    process::{self, Launch},
    script::HelperInstaller,
};

/// Opens targets on a given host.
#[derive(Debug, Clone)]
pub struct Launcher<'h> {
    host: &'h HostEnv,
    helper: HelperInstaller,
}

impl Default for Launcher<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher<'static> {
    pub fn new() -> Self {
        Self::with_host(HostEnv::global())
    }
}

impl<'h> Launcher<'h> {
    pub fn with_host(host: &'h HostEnv) -> Self {
        Self {
            host,
            helper: HelperInstaller::default(),
        }
    }

    pub fn helper(mut self, helper: HelperInstaller) -> Self {
        self.helper = helper;
        self
    }

    pub fn host(&self) -> &'h HostEnv {
        self.host
    }

    /// Opens `target` with the default handler, or with `options.apps`.
    pub async fn open(&self, target: impl Into<String>, options: LaunchOptions) -> Result<Launch> {
        let options = LaunchOptions {
            target: Some(target.into()),
            ..options
        };
        self.launch(&options).await
    }

    /// Launches `name` with `arguments`; `options.target`, if set, is passed too.
    /// Any apps already in `options` are replaced.
    pub async fn open_app(
        &self,
        name: impl Into<AppName>,
        arguments: Vec<String>,
        options: LaunchOptions,
    ) -> Result<Launch> {
        let options = LaunchOptions {
            apps: vec![AppSpec {
                name: name.into(),
                arguments,
            }],
            ..options
        };
        self.launch(&options).await
    }

    pub async fn launch(&self, options: &LaunchOptions) -> Result<Launch> {
        options.validate()?;

        match options.apps.as_slice() {
            [] => self.launch_one(options, None, &[]).await,
            [app] => self.launch_app(options, app).await,
            apps => chain::try_each(apps, |app| self.launch_app(options, app)).await,
        }
    }

    /// The command the first candidate would run, without spawning anything.
    pub async fn plan(&self, options: &LaunchOptions) -> Result<CommandSpec> {
        options.validate()?;

        let Some(app) = options.apps.first() else {
            return Ok(self.plan_one(options, None, &[]).await);
        };

        let name = match &app.name {
            AppName::One(n) => n.as_str(),
            AppName::Candidates(names) => names.first().map(String::as_str).unwrap_or_default(),
        };
        Ok(self.plan_one(options, Some(name), &app.arguments).await)
    }

    async fn launch_app(&self, options: &LaunchOptions, app: &AppSpec) -> Result<Launch> {
        match &app.name {
            AppName::One(name) => self.launch_one(options, Some(name), &app.arguments).await,
            AppName::Candidates(names) => {
                chain::try_each(names, |name| {
                    self.launch_one(options, Some(name.as_str()), &app.arguments)
                })
                .await
            }
        }
    }

    async fn launch_one(
        &self,
        options: &LaunchOptions,
        app: Option<&str>,
        arguments: &[String],
    ) -> Result<Launch> {
        let spec = self.plan_one(options, app, arguments).await;
        debug!(program = %spec.program, args = ?spec.args, "launching");
        process::spawn(&spec, options.wait, options.allow_nonzero_exit_code).await
    }

    async fn plan_one(
        &self,
        options: &LaunchOptions,
        app: Option<&str>,
        arguments: &[String],
    ) -> CommandSpec {
        let req = Request {
            target: options.target.as_deref(),
            app,
            arguments,
            wait: options.wait,
            background: options.background,
            new_instance: options.new_instance,
        };

        let family = Family::detect(self.host);
        debug!(?family, "selected command family");

        match family {
            Family::Mac => command::build_mac(&req),
            Family::PowerShell { wsl } => {
                let mount_point = if wsl {
                    self.host.wsl_mount_point().await
                } else {
                    ""
                };
                let powershell = command::powershell_path(wsl, mount_point, &context::system_root());
                command::build_powershell(&req, &powershell, wsl)
            }
            Family::Unix => {
                let opener = match app {
                    Some(a) => a.to_string(),
                    None => self.helper.ensure(self.host.platform()).await,
                };
                command::build_unix(&req, &opener)
            }
        }
    }
}

/// Opens `target` on this host with the default handler or `options.apps`.
pub async fn open(target: impl Into<String>, options: LaunchOptions) -> Result<Launch> {
    Launcher::new().open(target, options).await
}

/// Launches the application `name` with `arguments`.
pub async fn open_app(
    name: impl Into<AppName>,
    arguments: Vec<String>,
    options: LaunchOptions,
) -> Result<Launch> {
    Launcher::new().open_app(name, arguments, options).await
}
