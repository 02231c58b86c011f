use clap::Parser;
use wallpick_tui::Cli;
use wallpick_tui::run_main;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    run_main(cli).await
}
