use clap::Parser;
use examinerd::cli::{Cli, Commands};
use examinerd::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    examiner_core::init_tracing(cli.json, cli.log_level());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let addr = cli.serve.addr()?;
            let state = AppState::from_args(&cli.serve)?;
            server::serve(addr, state).await?;
        }
        Commands::Config => {
            println!("{}", cli.serve.describe());
        }
    }
    Ok(())
}
