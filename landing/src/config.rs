use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "landing")]
#[command(about = "Personal landing page: mouse-reactive starfield and view counter")]
pub(crate) struct Cli {
    /// Frame rate cap
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Number of stars in the pool
    #[arg(long)]
    pub(crate) stars: Option<usize>,

    /// RNG seed (0 = random)
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Name shown in the header
    #[arg(long)]
    pub(crate) name: Option<String>,

    /// Pointer distance (in braille dots) within which stars change color
    #[arg(long)]
    pub(crate) radius: Option<f32>,

    /// Base URL of the view counter service
    #[arg(long)]
    pub(crate) counter_url: Option<String>,

    /// Do not contact the view counter
    #[arg(long, default_value_t = false)]
    pub(crate) no_counter: bool,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    pub(crate) save: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) name: String,
    pub(crate) fps_cap: u32,
    pub(crate) stars: usize,
    pub(crate) seed: u64,
    pub(crate) proximity_radius: f32,
    pub(crate) counter_url: String,
    pub(crate) counter_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "krane".to_string(),
            fps_cap: 60,
            stars: 100,
            seed: 0,
            proximity_radius: 50.0,
            counter_url: "http://127.0.0.1:5000".to_string(),
            counter_enabled: true,
        }
    }
}

impl Settings {
    /// Command-line flags win over the settings file.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) {
        if let Some(fps) = cli.fps {
            self.fps_cap = fps;
        }
        if let Some(n) = cli.stars {
            self.stars = n;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(name) = &cli.name {
            self.name = name.clone();
        }
        if let Some(r) = cli.radius {
            self.proximity_radius = r;
        }
        if let Some(url) = &cli.counter_url {
            self.counter_url = url.clone();
        }
        if cli.no_counter {
            self.counter_enabled = false;
        }
        self.fps_cap = self.fps_cap.clamp(1, 240);
        self.proximity_radius = self.proximity_radius.max(0.0);
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "landing", "Landing")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        log_path: dir.join("landing.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(e) => log::warn!("invalid settings at {:?}: {}, using defaults", path, e),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// The terminal belongs to the starfield, so logs go to a file.
pub(crate) fn init_logging(path: &Path) {
    let file = match fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => return,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}
