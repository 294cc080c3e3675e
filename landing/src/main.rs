mod app;
mod color;
mod config;
mod counter;
mod frame;
mod input;
mod render;
mod sim;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let paths = config::project_paths()?;
    config::init_logging(&paths.log_path);
    app::run(cli, paths)
}
