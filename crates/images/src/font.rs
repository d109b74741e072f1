use std::{
    path::Path,
    sync::{Arc, LazyLock},
};

use resvg::usvg::fontdb::{Database, Family, Query, Source};

/// Generic family used when the custom font is unavailable.
pub const FALLBACK_FAMILY: &str = "sans-serif";

static SYSTEM_FONTS: LazyLock<Arc<Database>> = LazyLock::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    // fontdb maps `sans-serif` to Arial, which most servers don't ship
    if db.query(&Query { families: &[Family::SansSerif], ..Default::default() }).is_none() {
        let fallback =
            db.faces().find_map(|face| face.families.first().map(|(name, _)| name.clone()));
        if let Some(name) = fallback {
            db.set_sans_serif_family(name);
        }
    }
    tracing::info!("Loaded {} system font faces", db.len());
    Arc::new(db)
});

/// Raw bytes of the card's custom font.
#[derive(Clone)]
pub struct FontAsset {
    data: Arc<Vec<u8>>,
}

impl FontAsset {
    pub fn new(data: Vec<u8>) -> Self { Self { data: Arc::new(data) } }
}

/// Read the custom font. Failures are logged and yield `None`; the card falls back to
/// [`FALLBACK_FAMILY`].
pub async fn load_font(path: &Path) -> Option<FontAsset> {
    match tokio::fs::read(path).await {
        Ok(data) => {
            tracing::debug!("Loaded font {} ({} bytes)", path.display(), data.len());
            Some(FontAsset::new(data))
        }
        Err(e) => {
            tracing::warn!("Failed to load custom font {}: {}", path.display(), e);
            None
        }
    }
}

/// A font database ready for rendering, along with the CSS `font-family` list to use.
pub struct FontSet {
    pub database: Arc<Database>,
    pub families: String,
}

/// Register `font` on top of the system fonts. `family` names the font in log output;
/// the family recorded in the font file is what the card references.
pub fn font_set(font: Option<&FontAsset>, family: &str) -> FontSet {
    let fallback = || FontSet {
        database: SYSTEM_FONTS.clone(),
        families: FALLBACK_FAMILY.to_string(),
    };
    let Some(font) = font else {
        return fallback();
    };
    let mut db = Database::clone(&SYSTEM_FONTS);
    let ids = db.load_font_source(Source::Binary(font.data.clone()));
    let Some(name) = ids
        .first()
        .and_then(|id| db.face(*id))
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
    else {
        tracing::warn!("Custom font {} contains no usable faces", family);
        return fallback();
    };
    db.set_sans_serif_family(name.clone());
    FontSet { database: Arc::new(db), families: format!("'{name}', {FALLBACK_FAMILY}") }
}

#[cfg(test)]
pub(crate) const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/Tuffy.ttf");
