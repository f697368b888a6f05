use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotmpris::{config, config::Config, daemon, error, success};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the bridge (default)
    Run(RunOptions),

    /// Forget the stored refresh token
    Logout,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone, Default)]
pub struct RunOptions {
    /// Port for the notification and callback listener
    #[clap(long)]
    pub port: Option<u16>,

    /// Seconds between playback polls
    #[clap(long)]
    pub poll_seconds: Option<u64>,

    /// Only print the authorization URL, never open a browser
    #[clap(long)]
    pub no_browser: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(RunOptions::default())) {
        Command::Run(opt) => {
            let mut config = load_config();
            if let Some(port) = opt.port {
                config.port = port;
            }
            if let Some(secs) = opt.poll_seconds.filter(|s| *s > 0) {
                config.poll_interval = std::time::Duration::from_secs(secs);
            }

            if let Err(e) = daemon::run(config, !opt.no_browser).await {
                error!("{}", e);
            }
        }
        Command::Logout => {
            let config = load_config();
            match daemon::credential_store(config.token_store).clear().await {
                Ok(()) => success!("Stored refresh token removed"),
                Err(e) => error!("Failed to remove stored refresh token: {}", e),
            }
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
