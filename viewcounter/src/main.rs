use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use viewcounter::{http, FileStorage, MemStorage, ViewStorage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Store {
    Memory,
    File,
}

#[derive(Parser, Debug)]
#[command(name = "viewcounter")]
#[command(about = "Page-view counter for the landing page")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Where the count lives (memory resets on restart)
    #[arg(long, value_enum, default_value_t = Store::Memory)]
    store: Store,

    /// Counter file for --store file (default: platform data dir)
    #[arg(long)]
    data: Option<PathBuf>,
}

fn default_data_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "landing", "ViewCounter")
        .context("could not resolve project directories")?;
    Ok(proj.data_local_dir().join("views.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let store: Arc<dyn ViewStorage> = match cli.store {
        Store::Memory => Arc::new(MemStorage::new()),
        Store::File => {
            let path = match cli.data {
                Some(p) => p,
                None => default_data_path()?,
            };
            Arc::new(FileStorage::new(path))
        }
    };
    store
        .initialize_view_count()
        .context("failed to initialise view count")?;

    let listener = TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("could not bind {}", cli.bind))?;
    log::info!("serving view counter on http://{}", listener.local_addr()?);

    http::serve(listener, store, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;
    Ok(())
}
