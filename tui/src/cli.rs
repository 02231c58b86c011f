use std::path::PathBuf;

use clap::Parser;

/// Browse the images in a remote repository folder and set one as the
/// desktop background.
#[derive(Parser, Debug, Default)]
#[command(version)]
pub struct Cli {
    /// Read configuration from FILE instead of `$WALLPICK_HOME/config.toml`.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}
