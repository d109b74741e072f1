use std::{cell::Cell, io::Cursor};

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage};
use maud::{Markup, PreEscaped, html};
use resvg::{tiny_skia, usvg};

use crate::layout::{Card, Node, Paint, PathCmd, TextBlock, Vector};

/// Hands out document-unique ids for `<defs>` entries.
#[derive(Default)]
struct Ids(Cell<u32>);

impl Ids {
    fn next(&self, prefix: &str) -> String {
        let n = self.0.get();
        self.0.set(n + 1);
        format!("{prefix}-{n}")
    }
}

pub fn render_svg(card: &Card, font_families: &str) -> String {
    let ids = Ids::default();
    let bg = &card.background;
    html! {
        (PreEscaped("<?xml version=\"1.0\" encoding=\"utf-8\"?>"))
        svg xmlns="http://www.w3.org/2000/svg" version="1.1"
            viewBox=(format!("0 0 {} {}", card.width, card.height))
            width=(card.width) height=(card.height)
            font-family=(font_families) {
            defs {
                pattern id="dots" width=(bg.tile) height=(bg.tile) patternUnits="userSpaceOnUse" {
                    @for &(cx, cy) in &bg.dots {
                        circle cx=(cx) cy=(cy) r=(bg.dot_radius) fill=(bg.dot_color) {}
                    }
                }
            }
            rect width="100%" height="100%" fill=(bg.color) {}
            rect width="100%" height="100%" fill="url(#dots)" {}
            (render_node(&card.root, &ids))
        }
    }
    .into_string()
}

fn render_node(node: &Node, ids: &Ids) -> Markup {
    match node {
        Node::Container(container) => html! {
            g {
                @for child in &container.children {
                    (render_node(child, ids))
                }
            }
        },
        Node::Text(block) => render_text(block, ids),
        Node::Vector(vector) => render_vector(vector, ids),
    }
}

fn render_text(block: &TextBlock, ids: &Ids) -> Markup {
    let (defs, fill) = render_paint(&block.paint, ids);
    let x = block.frame.center_x();
    html! {
        (defs)
        text x=(x) font-size=(block.font_size) font-weight=(block.weight.css_value())
            text-anchor="middle" dominant-baseline="central" fill=(fill) {
            @for (i, line) in block.lines.iter().enumerate() {
                tspan x=(x) y=(block.frame.y + (i as f32 + 0.5) * block.line_height) { (line) }
            }
        }
    }
}

fn render_vector(vector: &Vector, ids: &Ids) -> Markup {
    let clip = vector.clip.map(|circle| (ids.next("clip"), circle));
    let clip_ref = clip.as_ref().map(|(id, _)| format!("url(#{id})"));
    html! {
        g transform=(format!("translate({} {})", vector.frame.x, vector.frame.y)) {
            @if let Some((id, circle)) = &clip {
                defs {
                    clipPath id=(id) {
                        circle cx=(circle.cx) cy=(circle.cy) r=(circle.r) {}
                    }
                }
            }
            g clip-path=[clip_ref] {
                @for shape in &vector.shapes {
                    @let (defs, fill) = render_paint(&shape.paint, ids);
                    (defs)
                    path fill=(fill) d=(path_data(&shape.path)) {}
                }
            }
        }
    }
}

/// Returns any required definitions and the value for a `fill` attribute.
fn render_paint(paint: &Paint, ids: &Ids) -> (Markup, String) {
    match paint {
        Paint::Solid(color) => (Markup::default(), color.clone()),
        Paint::LinearGradient { angle, stops } => {
            let id = ids.next("paint");
            let (x1, y1, x2, y2) = gradient_line(*angle);
            let last = stops.len().saturating_sub(1).max(1) as f32;
            let defs = html! {
                defs {
                    linearGradient id=(id) x1=(x1) y1=(y1) x2=(x2) y2=(y2) {
                        @for (i, color) in stops.iter().enumerate() {
                            stop offset=(i as f32 / last) stop-color=(color) {}
                        }
                    }
                }
            };
            (defs, format!("url(#{id})"))
        }
    }
}

/// Map a CSS gradient angle (0° points up, clockwise) onto bounding box coordinates,
/// stretched so that diagonal angles run corner to corner.
fn gradient_line(angle: f32) -> (f32, f32, f32, f32) {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (dx, dy) = (sin, -cos);
    let scale = dx.abs().max(dy.abs());
    let (dx, dy) = (dx / scale / 2.0, dy / scale / 2.0);
    (0.5 - dx, 0.5 - dy, 0.5 + dx, 0.5 + dy)
}

pub fn path_data(cmds: &[PathCmd]) -> String {
    cmds.iter()
        .map(|cmd| match *cmd {
            PathCmd::MoveTo(x, y) => format!("M{x},{y}"),
            PathCmd::QuadTo(x1, y1, x, y) => format!("Q{x1} {y1}, {x} {y}"),
            PathCmd::HorizontalBy(dx) => format!("h{dx}"),
            PathCmd::VerticalBy(dy) => format!("v{dy}"),
            PathCmd::HorizontalTo(x) => format!("H{x}"),
            PathCmd::Close => "Z".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rasterize `svg` into a `width`×`height` image, regardless of the document's own size.
pub fn render_image(
    svg: &str,
    options: &usvg::Options,
    width: u32,
    height: u32,
    format: ImageFormat,
) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_str(svg, options).context("Failed to parse SVG")?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("Failed to allocate {}x{} pixmap", width, height))?;
    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    let image = RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| anyhow!("Pixmap does not match {}x{}", width, height))?;
    encode_image(&DynamicImage::ImageRgba8(image), format)
}

pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).with_context(|| format!("Failed to encode {:?}", format))?;
    Ok(out.into_inner())
}
