//! The card layout tree.
//!
//! Every geometry constant below is expressed at scale factor 1 and multiplied by the
//! requested factor, so a card rendered at `.x2` is an exact 2× enlargement.

use crate::theme::CardTheme;

pub const BASE_WIDTH: u32 = 1200;
pub const BASE_HEIGHT: u32 = 630;

const PADDING: f32 = 40.0;
const EMBLEM_SIZE: f32 = 180.0;
const EMBLEM_CLIP_RADIUS: f32 = 70.0;
const TITLE_FONT_SIZE: f32 = 60.0;
const TITLE_LINE_HEIGHT: f32 = 1.2;
const TITLE_MAX_WIDTH: f32 = 0.9;
const TITLE_MARGIN: f32 = 30.0;
const SPACER: f32 = 20.0;
const SLOGAN_FONT_SIZE: f32 = 20.0;
const SLOGAN_MAX_WIDTH: f32 = 0.8;
const BRAND_FONT_SIZE: f32 = 50.0;
const NORMAL_LINE_HEIGHT: f32 = 1.2;
const DOT_TILE: f32 = 100.0;
const DOT_CENTERS: [(f32, f32); 2] = [(25.0, 25.0), (75.0, 75.0)];
/// Dot radius relative to the distance from its center to the farthest tile corner.
const DOT_STOP: f32 = 0.02;
const GRADIENT_ANGLE: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub width: u32,
    pub height: u32,
    pub background: Background,
    pub root: Node,
}

/// Solid color overlaid with a repeating grid of dots.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub color: String,
    pub dot_color: String,
    pub tile: f32,
    pub dots: Vec<(f32, f32)>,
    pub dot_radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Container(Container),
    Text(TextBlock),
    Vector(Vector),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub frame: Rect,
    pub children: Vec<Node>,
}

/// Horizontally centered, pre-wrapped text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub frame: Rect,
    pub lines: Vec<String>,
    pub font_size: f32,
    /// Distance between baselines in pixels.
    pub line_height: f32,
    pub weight: FontWeight,
    pub paint: Paint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

impl FontWeight {
    pub fn css_value(self) -> u16 {
        match self {
            Self::Normal => 400,
            Self::Bold => 700,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(String),
    LinearGradient { angle: f32, stops: Vec<String> },
}

/// Vector artwork drawn in its own coordinate space, placed at `frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    pub frame: Rect,
    pub clip: Option<Circle>,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub paint: Paint,
    pub path: Vec<PathCmd>,
}

/// SVG path commands, absolute unless suffixed with `By`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(f32, f32),
    QuadTo(f32, f32, f32, f32),
    HorizontalBy(f32),
    VerticalBy(f32),
    HorizontalTo(f32),
    Close,
}

impl PathCmd {
    pub fn scaled(self, f: f32) -> Self {
        match self {
            Self::MoveTo(x, y) => Self::MoveTo(x * f, y * f),
            Self::QuadTo(x1, y1, x, y) => Self::QuadTo(x1 * f, y1 * f, x * f, y * f),
            Self::HorizontalBy(dx) => Self::HorizontalBy(dx * f),
            Self::VerticalBy(dy) => Self::VerticalBy(dy * f),
            Self::HorizontalTo(x) => Self::HorizontalTo(x * f),
            Self::Close => Self::Close,
        }
    }
}

use PathCmd::*;

/// Emblem bands at scale 1, top to bottom, inside a 180×180 box.
const EMBLEM_BANDS: [&[PathCmd]; 4] = [
    &[
        MoveTo(0.0, 0.0),
        HorizontalBy(180.0),
        VerticalBy(54.0),
        QuadTo(135.0, 36.0, 90.0, 54.0),
        QuadTo(45.0, 72.0, 0.0, 54.0),
        Close,
    ],
    &[
        MoveTo(0.0, 58.5),
        QuadTo(45.0, 76.5, 90.0, 58.5),
        QuadTo(135.0, 40.5, 180.0, 58.5),
        VerticalBy(85.5),
        QuadTo(135.0, 148.5, 126.0, 126.0),
        QuadTo(76.5, 144.0, 0.0, 144.0),
        Close,
    ],
    &[
        MoveTo(0.0, 130.5),
        QuadTo(45.0, 153.0, 90.0, 130.5),
        QuadTo(135.0, 112.5, 180.0, 130.5),
        VerticalBy(18.0),
        HorizontalTo(0.0),
        Close,
    ],
    &[
        MoveTo(0.0, 135.0),
        QuadTo(45.0, 157.5, 90.0, 135.0),
        QuadTo(135.0, 117.0, 180.0, 135.0),
        VerticalBy(45.0),
        HorizontalTo(0.0),
        Close,
    ],
];

/// Build the card for `title` at resolution multiplier `factor`.
pub fn build_card(theme: &CardTheme, title: &str, factor: u32) -> Card {
    let f = factor as f32;
    let width = BASE_WIDTH * factor;
    let height = BASE_HEIGHT * factor;
    let canvas = Rect { x: 0.0, y: 0.0, w: width as f32, h: height as f32 };
    let content = Rect {
        x: PADDING * f,
        y: PADDING * f,
        w: canvas.w - 2.0 * PADDING * f,
        h: canvas.h - 2.0 * PADDING * f,
    };
    let text_paint =
        Paint::LinearGradient { angle: GRADIENT_ANGLE, stops: theme.gradient.clone() };

    let emblem = emblem(theme, content.center_x(), content.y, f);

    let brand_height = BRAND_FONT_SIZE * NORMAL_LINE_HEIGHT * f;
    let brand = TextBlock {
        frame: Rect {
            x: content.x,
            y: content.y + content.h - brand_height,
            w: content.w,
            h: brand_height,
        },
        lines: vec![theme.brand.clone()],
        font_size: BRAND_FONT_SIZE * f,
        line_height: brand_height,
        weight: FontWeight::Bold,
        paint: text_paint.clone(),
    };

    // Everything between the emblem and the brand mark, contents vertically centered
    let middle_top = emblem.frame.y + emblem.frame.h;
    let middle = Rect { x: content.x, y: middle_top, w: content.w, h: brand.frame.y - middle_top };

    let title_size = TITLE_FONT_SIZE * f;
    let title_width = middle.w * TITLE_MAX_WIDTH;
    let title_lines = wrap_text(title, title_size, title_width);
    let title_line_height = title_size * TITLE_LINE_HEIGHT;
    let title_height = title_line_height * title_lines.len() as f32;

    let slogan_size = SLOGAN_FONT_SIZE * f;
    let slogan_width = middle.w * SLOGAN_MAX_WIDTH;
    let slogan_lines = wrap_text(&theme.slogan, slogan_size, slogan_width);
    let slogan_line_height = slogan_size * NORMAL_LINE_HEIGHT;
    let slogan_height = slogan_line_height * slogan_lines.len() as f32;

    let gap = (TITLE_MARGIN + SPACER) * f;
    let stack_top = middle.y + (middle.h - (title_height + gap + slogan_height)) / 2.0;
    let title = TextBlock {
        frame: Rect {
            x: middle.center_x() - title_width / 2.0,
            y: stack_top,
            w: title_width,
            h: title_height,
        },
        lines: title_lines,
        font_size: title_size,
        line_height: title_line_height,
        weight: FontWeight::Bold,
        paint: text_paint.clone(),
    };
    let slogan = TextBlock {
        frame: Rect {
            x: middle.center_x() - slogan_width / 2.0,
            y: stack_top + title_height + gap,
            w: slogan_width,
            h: slogan_height,
        },
        lines: slogan_lines,
        font_size: slogan_size,
        line_height: slogan_line_height,
        weight: FontWeight::Normal,
        paint: text_paint,
    };

    Card {
        width,
        height,
        background: background(theme, f),
        root: Node::Container(Container {
            frame: canvas,
            children: vec![
                Node::Vector(emblem),
                Node::Container(Container {
                    frame: middle,
                    children: vec![Node::Text(title), Node::Text(slogan)],
                }),
                Node::Text(brand),
            ],
        }),
    }
}

fn emblem(theme: &CardTheme, center_x: f32, top: f32, f: f32) -> Vector {
    let size = EMBLEM_SIZE * f;
    let half = size / 2.0;
    Vector {
        frame: Rect { x: center_x - half, y: top, w: size, h: size },
        clip: Some(Circle { cx: half, cy: half, r: EMBLEM_CLIP_RADIUS * f }),
        shapes: EMBLEM_BANDS
            .iter()
            .zip(&theme.emblem)
            .map(|(band, color)| Shape {
                paint: Paint::Solid(color.clone()),
                path: band.iter().map(|cmd| cmd.scaled(f)).collect(),
            })
            .collect(),
    }
}

fn background(theme: &CardTheme, f: f32) -> Background {
    let tile = DOT_TILE * f;
    let dots: Vec<(f32, f32)> = DOT_CENTERS.iter().map(|&(x, y)| (x * f, y * f)).collect();
    // Both dots sit on the tile diagonal, so they share the same farthest corner distance
    let (x, y) = dots[0];
    let farthest = (tile - x).max(x).hypot((tile - y).max(y));
    Background {
        color: theme.background.clone(),
        dot_color: theme.dot.clone(),
        tile,
        dots,
        dot_radius: farthest * DOT_STOP,
    }
}

/// Estimated advance of `c` in ems. There is no shaping engine in the layout pass, so
/// this only needs to be close enough to pick line breaks.
fn char_advance(c: char) -> f32 {
    if c.is_whitespace() {
        0.3
    } else if is_wide(c) {
        1.0
    } else if c.is_uppercase() {
        0.65
    } else {
        0.55
    }
}

fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x1F900..=0x1F9FF
            | 0x20000..=0x3FFFD
    )
}

/// Characters allowed in XML 1.0 text. Anything else would make the SVG unparsable.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}')
        || c >= '\u{10000}'
}

fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_advance).sum::<f32>() * font_size
}

enum Segment<'a> {
    Space,
    Word(&'a str),
}

/// Split into words separated by whitespace. Wide characters are words of their own,
/// since CJK text may break between any two of them.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() || is_wide(c) {
            if let Some(s) = start.take() {
                out.push(Segment::Word(&text[s..i]));
            }
            if c.is_whitespace() {
                out.push(Segment::Space);
            } else {
                out.push(Segment::Word(&text[i..i + c.len_utf8()]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(Segment::Word(&text[s..]));
    }
    out
}

/// Greedy line breaking. Words wider than `max_width` are broken between characters.
/// Characters XML cannot carry are dropped. Always returns at least one line.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let text: String = text.chars().filter(|&c| is_xml_char(c)).collect();
    let space_width = char_advance(' ') * font_size;
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;
    let mut pending_space = false;
    for segment in segments(&text) {
        let word = match segment {
            Segment::Space => {
                pending_space = !line.is_empty();
                continue;
            }
            Segment::Word(word) => word,
        };
        let word_width = text_width(word, font_size);
        let gap = if pending_space { space_width } else { 0.0 };
        pending_space = false;
        if !line.is_empty() && line_width + gap + word_width > max_width {
            lines.push(std::mem::take(&mut line));
            line_width = 0.0;
        } else if gap > 0.0 {
            line.push(' ');
            line_width += gap;
        }
        if word_width <= max_width {
            line.push_str(word);
            line_width += word_width;
            continue;
        }
        for c in word.chars() {
            let w = char_advance(c) * font_size;
            if !line.is_empty() && line_width + w > max_width {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            line.push(c);
            line_width += w;
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use og_card_core::config::CardConfig;

    use super::*;

    fn theme() -> CardTheme { CardTheme::from_config(&CardConfig::default()).unwrap() }

    fn children(node: &Node) -> &[Node] {
        match node {
            Node::Container(container) => &container.children,
            _ => panic!("expected container"),
        }
    }

    fn parts(card: &Card) -> (&Vector, &TextBlock, &TextBlock, &TextBlock) {
        let root = children(&card.root);
        let [Node::Vector(emblem), middle, Node::Text(brand)] = root else {
            panic!("unexpected root layout: {root:?}");
        };
        let [Node::Text(title), Node::Text(slogan)] = children(middle) else {
            panic!("unexpected middle layout");
        };
        (emblem, title, slogan, brand)
    }

    #[test]
    fn test_scale_one() {
        let card = build_card(&theme(), "My Title", 1);
        assert_eq!((card.width, card.height), (1200, 630));
        let (emblem, title, slogan, brand) = parts(&card);
        assert_eq!(emblem.frame, Rect { x: 510.0, y: 40.0, w: 180.0, h: 180.0 });
        assert_eq!(emblem.clip, Some(Circle { cx: 90.0, cy: 90.0, r: 70.0 }));
        assert_eq!(title.font_size, 60.0);
        assert_eq!(title.lines, ["My Title"]);
        assert_eq!(title.weight, FontWeight::Bold);
        assert_eq!(slogan.font_size, 20.0);
        assert_eq!(slogan.weight, FontWeight::Normal);
        assert_eq!(brand.font_size, 50.0);
        assert_eq!(brand.lines, ["BMPI"]);
        assert!((brand.frame.y + brand.frame.h - 590.0).abs() < 1e-3);
    }

    #[test]
    fn test_scale_two() {
        let card = build_card(&theme(), "My Title", 2);
        assert_eq!((card.width, card.height), (2400, 1260));
        let (emblem, title, slogan, brand) = parts(&card);
        assert_eq!(emblem.frame.w, 360.0);
        assert_eq!(emblem.frame.h, 360.0);
        assert_eq!(title.font_size, 120.0);
        assert_eq!(slogan.font_size, 40.0);
        assert_eq!(brand.font_size, 100.0);
        assert_eq!(emblem.shapes[0].path[1], PathCmd::HorizontalBy(360.0));
        assert_eq!(card.background.tile, 200.0);
        assert_eq!(card.background.dots, [(50.0, 50.0), (150.0, 150.0)]);
    }

    #[test]
    fn test_geometry_is_proportional() {
        let theme = theme();
        let one = build_card(&theme, "Proportions", 1);
        let three = build_card(&theme, "Proportions", 3);
        let (e1, t1, s1, b1) = parts(&one);
        let (e3, t3, s3, b3) = parts(&three);
        let pairs =
            [(e1.frame, e3.frame), (t1.frame, t3.frame), (s1.frame, s3.frame), (b1.frame, b3.frame)];
        for (a, b) in pairs {
            assert!((a.x * 3.0 - b.x).abs() < 1e-2);
            assert!((a.y * 3.0 - b.y).abs() < 1e-2);
            assert!((a.w * 3.0 - b.w).abs() < 1e-2);
            assert!((a.h * 3.0 - b.h).abs() < 1e-2);
        }
        assert_eq!(t1.lines, t3.lines);
        assert!((one.background.dot_radius * 3.0 - three.background.dot_radius).abs() < 1e-3);
    }

    #[test]
    fn test_title_is_centered_between_emblem_and_brand() {
        let card = build_card(&theme(), "My Title", 1);
        let (emblem, title, slogan, brand) = parts(&card);
        let top_gap = title.frame.y - (emblem.frame.y + emblem.frame.h);
        let bottom_gap = brand.frame.y - (slogan.frame.y + slogan.frame.h);
        assert!((top_gap - bottom_gap).abs() < 1e-3);
        assert_eq!(slogan.frame.y - (title.frame.y + title.frame.h), 50.0);
    }

    #[test]
    fn test_background_dots() {
        let card = build_card(&theme(), "x", 1);
        assert_eq!(card.background.color, "#ffffff");
        assert_eq!(card.background.dot_color, "#e5b751");
        assert!((card.background.dot_radius - 2.1213).abs() < 1e-3);
    }

    #[test]
    fn test_deterministic() {
        let theme = theme();
        assert_eq!(build_card(&theme, "Same 标题", 2), build_card(&theme, "Same 标题", 2));
    }

    #[test]
    fn test_long_title_wraps_within_width() {
        let title =
            "A considerably longer title that cannot possibly fit on a single line of the card";
        let card = build_card(&theme(), title, 1);
        let (_, block, _, _) = parts(&card);
        assert!(block.lines.len() > 1);
        assert!((block.frame.w - 1008.0).abs() < 1e-3);
        assert!((block.frame.h - 72.0 * block.lines.len() as f32).abs() < 1e-3);
        for line in &block.lines {
            assert!(text_width(line, block.font_size) <= block.frame.w);
        }
        assert_eq!(block.lines.join(" "), title);
    }

    #[test]
    fn test_wrap_text() {
        let cases: &[(&str, f32, &[&str])] = &[
            ("", 100.0, &[""]),
            ("   ", 100.0, &[""]),
            ("one", 100.0, &["one"]),
            ("  padded  words ", 1000.0, &["padded words"]),
            // 0.55em per char, 10px font: "aaaa" = 22px
            ("aaaa aaaa", 30.0, &["aaaa", "aaaa"]),
            ("aaaaaaaaaa", 30.0, &["aaaaa", "aaaaa"]),
            ("一二三四五", 30.0, &["一二三", "四五"]),
            ("ab 中文", 100.0, &["ab 中文"]),
            ("a\u{1}b", 100.0, &["ab"]),
            ("nul\0 x\u{FFFE}\u{FFFF}", 100.0, &["nul x"]),
            ("tab\tand\nbreak", 1000.0, &["tab and break"]),
            ("\u{0}", 100.0, &[""]),
        ];
        for &(text, width, expected) in cases {
            assert_eq!(wrap_text(text, 10.0, width), expected, "{text:?}");
        }
    }
}
