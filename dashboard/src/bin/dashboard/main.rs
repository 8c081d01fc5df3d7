mod commands;
mod context;
mod output;
mod theme;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check::{self, handle_check},
    resources::{self, handle_resources},
    serve::{self, ServeArgs, handle_serve},
};
use output::{Console, OutputFormat};

const AFTER_HELP: &str = "\
Environment:
  DASHBOARD_CONFIG  Configuration file, same as --config
  REDIS_URL         Redis URL expanded from `${REDIS_URL}` in [storage]
  RUST_LOG          Log filter, e.g. `dashboard=debug`

Without --config the nearest dashboard.toml in the current directory or a parent is used.
Run `dashboard <command> --help` for examples.";

/// Admin resources declared in dashboard.toml, served as a JSON API.
#[derive(Parser)]
#[command(name = "dashboard", version, styles = theme::HELP_STYLES, after_long_help = AFTER_HELP)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Configuration file (defaults to the nearest dashboard.toml)
    #[arg(long, global = true, env = "DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Only print errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Also print which files and settings are used
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API for every configured resource
    #[command(after_long_help = serve::EXAMPLES)]
    Serve(ServeArgs),

    /// List configured resources with their detail fields and filters
    #[command(after_long_help = resources::EXAMPLES)]
    Resources,

    /// Boot every resource on every screen and report configuration errors
    #[command(after_long_help = check::EXAMPLES)]
    Check,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    let console = Console::new(cli.output, cli.quiet, cli.verbose, cli.no_color);

    if let Err(err) = run(cli, &console).await {
        console.failed(&format!("{err:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, console: &Console) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => handle_serve(args, config, console).await,
        Commands::Resources => handle_resources(config, console),
        Commands::Check => handle_check(config, console),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["dashboard", "resources", "--output", "json", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        assert!(matches!(cli.command, Commands::Resources));
    }

    #[test]
    fn serve_accepts_a_bind_address() {
        let cli = Cli::try_parse_from(["dashboard", "serve", "--bind", "0.0.0.0:3000"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:3000"));
    }

    #[test]
    fn subcommand_help_lists_examples() {
        let mut command = Cli::command();
        let check = command.find_subcommand_mut("check").unwrap();
        let help = check.render_long_help().to_string();
        assert!(help.contains("dashboard check"));
    }
}
