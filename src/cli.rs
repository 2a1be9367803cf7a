use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "portico", version, about)]
pub struct Args {
    /// File, directory or URL to open
    pub target: Option<String>,

    /// Application to open with (repeat to give fallbacks; registry keys like
    /// `chrome` resolve per platform)
    #[arg(long = "app", value_name = "NAME")]
    pub apps: Vec<String>,

    /// Argument passed to every --app (repeatable; requires --app)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Wait for the opened application to exit
    #[arg(long)]
    pub wait: bool,

    /// Do not bring the application to the foreground (macOS)
    #[arg(long)]
    pub background: bool,

    /// Open a new instance even if one is running (macOS)
    #[arg(long)]
    pub new_instance: bool,

    /// With --wait, treat a non-zero exit code as success
    #[arg(long)]
    pub allow_nonzero_exit: bool,

    /// Path to config.toml (overrides PORTICO_CONFIG and XDG default)
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Print the command that would run instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Print detected environment and registry resolution, then exit
    #[arg(long)]
    pub report: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
