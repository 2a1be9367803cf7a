use crate::{
    error::{LaunchError, Result},
    registry::Binary,
};

/// Application to launch: a binary name, or candidate names tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppName {
    One(String),
    Candidates(Vec<String>),
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        AppName::One(s.to_string())
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        AppName::One(s)
    }
}

impl From<Vec<String>> for AppName {
    fn from(v: Vec<String>) -> Self {
        AppName::Candidates(v)
    }
}

impl From<&Binary> for AppName {
    fn from(b: &Binary) -> Self {
        match b {
            Binary::Single(n) => AppName::One(n.clone()),
            Binary::Candidates(c) => AppName::Candidates(c.clone()),
        }
    }
}

impl From<Binary> for AppName {
    fn from(b: Binary) -> Self {
        match b {
            Binary::Single(n) => AppName::One(n),
            Binary::Candidates(c) => AppName::Candidates(c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    pub name: AppName,
    pub arguments: Vec<String>,
}

impl AppSpec {
    pub fn new(name: impl Into<AppName>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }
}

/// What to open and how.
///
/// `apps` holds zero or more applications; with more than one they are tried
/// in order until one launches. `background` and `new_instance` only affect
/// macOS and are ignored elsewhere. `allow_nonzero_exit_code` only matters
/// with `wait`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub target: Option<String>,
    pub apps: Vec<AppSpec>,
    pub wait: bool,
    pub background: bool,
    pub new_instance: bool,
    pub allow_nonzero_exit_code: bool,
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn app(mut self, app: AppSpec) -> Self {
        self.apps.push(app);
        self
    }

    pub fn apps(mut self, apps: impl IntoIterator<Item = AppSpec>) -> Self {
        self.apps.extend(apps);
        self
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn new_instance(mut self, new_instance: bool) -> Self {
        self.new_instance = new_instance;
        self
    }

    pub fn allow_nonzero_exit_code(mut self, allow: bool) -> Self {
        self.allow_nonzero_exit_code = allow;
        self
    }

    /// Rejects inputs that can never produce a launchable command. Runs before
    /// anything touches the OS.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.target.as_deref() {
            check_text("target", t)?;
        }

        if self.target.is_none() && self.apps.is_empty() {
            return Err(LaunchError::invalid("expected a target or an app"));
        }

        for app in &self.apps {
            match &app.name {
                AppName::One(n) => check_text("app name", n)?,
                AppName::Candidates(names) => {
                    if names.is_empty() {
                        return Err(LaunchError::invalid("app candidate list is empty"));
                    }
                    for n in names {
                        check_text("app name", n)?;
                    }
                }
            }

            for a in &app.arguments {
                if a.contains('\0') {
                    return Err(LaunchError::invalid(format!(
                        "app argument contains a NUL byte: {a:?}"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_text(what: &str, s: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(LaunchError::invalid(format!("expected a non-empty {what}")));
    }
    if s.contains('\0') {
        return Err(LaunchError::invalid(format!("{what} contains a NUL byte: {s:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields() {
        let opts = LaunchOptions::new()
            .target("report.txt")
            .app(AppSpec::new(vec!["missing-app".to_string(), "less".to_string()]))
            .app(AppSpec::new("firefox").arg("--private"))
            .wait(true)
            .allow_nonzero_exit_code(true);

        assert_eq!(opts.target.as_deref(), Some("report.txt"));
        assert_eq!(opts.apps.len(), 2);
        assert_eq!(opts.apps[1].arguments, ["--private"]);
        assert!(opts.wait && opts.allow_nonzero_exit_code);
        assert!(!opts.background && !opts.new_instance);
        opts.validate().unwrap();
    }

    #[test]
    fn app_name_from_registry_binary() {
        let name: AppName = Binary::Candidates(vec!["a".into(), "b".into()]).into();
        assert_eq!(name, AppName::Candidates(vec!["a".into(), "b".into()]));

        let single = Binary::Single("firefox".into());
        assert_eq!(AppName::from(&single), AppName::One("firefox".into()));
    }

    #[test]
    fn rejects_empty_target() {
        let err = LaunchOptions::new().target("  ").validate().unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_nothing_to_open() {
        let err = LaunchOptions::new().wait(true).validate().unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_bad_app_specs() {
        let empty = LaunchOptions::new().app(AppSpec::new(""));
        assert!(empty.validate().is_err());

        let no_candidates = LaunchOptions::new().app(AppSpec::new(Vec::<String>::new()));
        assert!(no_candidates.validate().is_err());

        let nul_arg = LaunchOptions::new().app(AppSpec::new("less").arg("a\0b"));
        assert!(nul_arg.validate().is_err());
    }

    #[test]
    fn app_without_target_is_fine() {
        LaunchOptions::new()
            .app(AppSpec::new("firefox").args(["--private", "--new-window"]))
            .validate()
            .unwrap();
    }
}
