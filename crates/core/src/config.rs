use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub card: CardConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    /// A missing file yields the default configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()));
            }
        };
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: 3000, request_timeout_secs: 30 } }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CardConfig {
    pub slogan: String,
    pub brand: String,
    /// Largest accepted `.x{N}` resolution multiplier.
    pub max_scale: u32,
    pub font: FontConfig,
    pub palette: PaletteConfig,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            slogan: "Build My #Personal_Intelligence #Programming_Insights #Passive_Income"
                .to_string(),
            brand: "BMPI".to_string(),
            max_scale: 4,
            font: FontConfig::default(),
            palette: PaletteConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FontConfig {
    pub path: PathBuf,
    pub family: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("public/LXGWWenKaiLite-Regular.ttf"),
            family: "LXGWWenKaiLite".to_string(),
        }
    }
}

/// Colors accept `#rgb`, `#rrggbb` or CSS color names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub background: String,
    pub dot: String,
    pub gradient: Vec<String>,
    /// Emblem bands, top to bottom.
    pub emblem: [String; 4],
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            dot: "#e5b751".to_string(),
            gradient: vec!["#e5b751".to_string(), "#1677b3".to_string(), "#cc5595".to_string()],
            emblem: [
                "#cc5595".to_string(),
                "#428bca".to_string(),
                "white".to_string(),
                "#e5b751".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound for rendered cards kept in memory, in bytes. Zero disables the cache.
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self { Self { max_bytes: 64 * 1024 * 1024 } }
}
