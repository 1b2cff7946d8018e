use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "holidays", version, about = "Country and public-holiday reference data service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server and batch scheduler (default if no subcommand given).
    Serve(ServeArgs),

    /// Sync every provider country over the full allowed window, then exit.
    Sync,

    /// Re-fetch and replace one country's holidays for one year.
    Refresh {
        /// Country code as stored, e.g. `KR`.
        #[arg(long)]
        country: String,
        #[arg(long)]
        year: i32,
    },

    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Clone, Parser)]
pub struct ServeArgs {
    #[arg(long, env = "HOLIDAYS_HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "HOLIDAYS_PORT", default_value = "8080")]
    pub port: u16,
}

impl Commands {
    /// `serve` with no flags: host and port still come from the environment.
    pub fn default_serve() -> Result<Self, clap::Error> {
        ServeArgs::try_parse_from(["holidays"]).map(Commands::Serve)
    }
}
