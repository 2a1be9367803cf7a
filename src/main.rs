use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use portico::{
    cli::Args, report, AppRegistry, AppSpec, Config, HelperInstaller, HostEnv, Launch, LaunchError,
    LaunchOptions, Launcher,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cfg = Config::load(args.config.as_deref())?;
    let host = HostEnv::global();
    let registry = AppRegistry::with_custom(host, cfg.apps.clone());
    let helper = HelperInstaller::from_config(&cfg.helper);

    if args.report {
        print!("{}", report::build_report(host, &registry, &helper).await);
        return Ok(ExitCode::SUCCESS);
    }

    let options = build_options(&args, &cfg, &registry)?;
    let launcher = Launcher::with_host(host).helper(helper);

    if args.dry_run {
        let spec = launcher.plan(&options).await?;
        println!("{}", spec.program);
        for a in &spec.args {
            println!("{a}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    match launcher.launch(&options).await {
        Ok(Launch::Exited(status)) => Ok(exit_code(status.code().map_or(0, |c| c as u32))),
        Ok(Launch::Detached(_)) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.exit_code() {
            Some(code) => {
                eprintln!("portico: {err}");
                Ok(exit_code(code))
            }
            None => Err(err).context("failed to open"),
        },
    }
}

fn build_options(args: &Args, cfg: &Config, registry: &AppRegistry<'_>) -> Result<LaunchOptions> {
    if args.apps.is_empty() && !args.args.is_empty() {
        bail!("--arg is passed to the application and needs at least one --app");
    }

    let mut apps = Vec::with_capacity(args.apps.len());
    for name in &args.apps {
        let spec = match registry.resolve(name) {
            Some(resolved) => AppSpec::new(resolved.map_err(LaunchError::from)?),
            None => AppSpec::new(name.as_str()),
        };
        apps.push(spec.args(args.args.iter().cloned()));
    }

    let mut options = LaunchOptions::new()
        .apps(apps)
        .wait(args.wait || cfg.defaults.wait)
        .background(args.background)
        .new_instance(args.new_instance)
        .allow_nonzero_exit_code(args.allow_nonzero_exit || cfg.defaults.allow_nonzero_exit_code);
    options.target = args.target.clone();

    Ok(options)
}

fn exit_code(code: u32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = if verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(argv: &[&str]) -> Result<LaunchOptions> {
        let args = Args::try_parse_from(argv).unwrap();
        let registry = AppRegistry::builtin(HostEnv::global());
        build_options(&args, &Config::default(), &registry)
    }

    #[test]
    fn args_without_app_are_rejected() {
        let err = options(&["portico", "notes.md", "--arg", "-N"]).unwrap_err();
        assert!(err.to_string().contains("--app"));
    }

    #[test]
    fn args_go_to_every_app() {
        let opts = options(&["portico", "notes.md", "--app", "less", "--app", "more", "--arg", "-N"]).unwrap();
        assert_eq!(opts.target.as_deref(), Some("notes.md"));
        assert_eq!(opts.apps.len(), 2);
        assert!(opts.apps.iter().all(|a| a.arguments == ["-N"]));
    }
}
