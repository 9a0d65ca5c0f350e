use boardcal::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    boardcal::init_tracing(cli.verbose);
    boardcal::run(cli).await
}
