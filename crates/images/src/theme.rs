use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use og_card_core::config::CardConfig;
use palette::Srgb;

/// Resolved, validated card settings. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CardTheme {
    pub slogan: String,
    pub brand: String,
    pub max_scale: u32,
    pub font_path: PathBuf,
    pub font_family: String,
    pub background: String,
    pub dot: String,
    pub gradient: Vec<String>,
    pub emblem: [String; 4],
}

impl CardTheme {
    pub fn from_config(config: &CardConfig) -> Result<Self> {
        ensure!(config.max_scale >= 1, "card.max_scale must be at least 1");
        ensure!(!config.palette.gradient.is_empty(), "card.palette.gradient must not be empty");
        let color = |name: &str, value: &str| {
            parse_color(value).map(html_color).with_context(|| format!("card.palette.{name}"))
        };
        let [e0, e1, e2, e3] = &config.palette.emblem;
        Ok(Self {
            slogan: config.slogan.clone(),
            brand: config.brand.clone(),
            max_scale: config.max_scale,
            font_path: config.font.path.clone(),
            font_family: config.font.family.clone(),
            background: color("background", &config.palette.background)?,
            dot: color("dot", &config.palette.dot)?,
            gradient: config
                .palette
                .gradient
                .iter()
                .map(|c| color("gradient", c))
                .collect::<Result<_>>()?,
            emblem: [
                color("emblem", e0)?,
                color("emblem", e1)?,
                color("emblem", e2)?,
                color("emblem", e3)?,
            ],
        })
    }
}

pub fn parse_color(value: &str) -> Result<Srgb<u8>> {
    let value = value.trim();
    if value.starts_with('#') {
        return Srgb::<u8>::from_str(value)
            .map_err(|e| anyhow!("Invalid hex color {value:?}: {e}"));
    }
    palette::named::from_str(&value.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("Unknown color name {value:?}"))
}

pub fn html_color(c: Srgb<u8>) -> String {
    let (r, g, b) = c.into_components();
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
