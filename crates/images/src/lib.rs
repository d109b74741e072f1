pub mod font;
pub mod layout;
pub mod svg;
pub mod theme;

use anyhow::Context;
use image::ImageFormat;
use og_card_core::RenderError;
use resvg::usvg;

use crate::theme::CardTheme;

/// Render the PNG card for `title` at resolution multiplier `factor`.
///
/// A missing or unreadable custom font is not an error; the card falls back to the
/// generic sans-serif family.
pub async fn render_card(
    theme: &CardTheme,
    title: &str,
    factor: u32,
) -> Result<Vec<u8>, RenderError> {
    let font = font::load_font(&theme.font_path).await;
    let card = layout::build_card(theme, title, factor);
    let family = theme.font_family.clone();
    // Rasterization is CPU bound
    let data = tokio::task::spawn_blocking(move || {
        let fonts = font::font_set(font.as_ref(), &family);
        let svg = svg::render_svg(&card, &fonts.families);
        let options = usvg::Options {
            font_family: font::FALLBACK_FAMILY.to_string(),
            fontdb: fonts.database,
            ..Default::default()
        };
        svg::render_image(&svg, &options, card.width, card.height, ImageFormat::Png)
    })
    .await
    .context("Render task failed")??;
    Ok(data)
}
