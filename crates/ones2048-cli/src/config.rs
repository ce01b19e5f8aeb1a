use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Driver configuration. Everything has a default so the binary runs with no
/// config file at all; CLI flags override the values below where offered.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub play: Play,
    #[serde(default)]
    pub batch: Batch,
}

/// Knobs for the persistent single-game loop.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Play {
    /// Stop after this many committed moves even if the game is still live.
    #[serde(default)]
    pub max_moves: Option<u64>,

    /// Take one undo every N committed moves; omitted means never.
    #[serde(default)]
    pub undo_every: Option<u64>,

    /// Progress log cadence in committed moves; 0 disables progress logs.
    #[serde(default = "defaults::log_every")]
    pub log_every: u64,
}

/// Knobs for parallel batch self-play.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Batch {
    #[serde(default = "defaults::games")]
    pub games: u32,

    /// Game i is seeded with `base_seed + i`.
    #[serde(default)]
    pub base_seed: u64,

    #[serde(default)]
    pub max_moves: Option<u64>,
}

impl Default for Play {
    fn default() -> Self {
        Self {
            max_moves: None,
            undo_every: None,
            log_every: defaults::log_every(),
        }
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self {
            games: defaults::games(),
            base_seed: 0,
            max_moves: None,
        }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cfg)
    }
}

mod defaults {
    pub fn log_every() -> u64 {
        100
    }
    pub fn games() -> u32 {
        8
    }
}
