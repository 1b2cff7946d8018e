use clap::Parser;
use holidays_core::config::HolidaysConfig;
use holidays_server::cli::{Cli, Commands};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // JSON stdout logs unless HOLIDAYS_LOG_FORMAT=pretty.
    holidays_core::o11y::init_global_from_env()?;
    let cli = Cli::parse();
    let cfg = HolidaysConfig::from_env()?;

    let command = match cli.command {
        Some(command) => command,
        None => Commands::default_serve()?,
    };

    match command {
        Commands::Serve(args) => {
            let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
            let state = holidays_server::server::build_state(&cfg).await?;
            holidays_server::server::serve(addr, state, &cfg).await?;
        }
        Commands::Sync => {
            let state = holidays_server::server::build_state(&cfg).await?;
            let summary = state.sync.sync_all().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Refresh { country, year } => {
            let state = holidays_server::server::build_state(&cfg).await?;
            let summary = state.sync.refresh_one(&country, year).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Config => {
            println!("{cfg:#?}");
        }
    }

    Ok(())
}
