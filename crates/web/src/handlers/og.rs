use std::sync::{Arc, OnceLock};

use axum::{
    extract::{OriginalUri, State},
    http::header,
    response::{IntoResponse, Response},
};
use og_card_core::{CardError, ParseError};
use og_card_images::theme::CardTheme;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::cache::RenderCache;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardRequest {
    pub title: String,
    pub factor: u32,
}

/// Parse `<title>[.x<factor>].png`, where `path` is the raw request path without its
/// leading slash. Every segment belongs to the title.
pub fn parse_card_path(path: &str, max_scale: u32) -> Result<CardRequest, ParseError> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let caps = REGEX
        .get_or_init(|| Regex::new(r"^(?P<title>.+?)(?:\.x(?P<factor>[0-9]+))?\.png$").unwrap())
        .captures(path)
        .ok_or_else(|| ParseError::InvalidPathFormat(path.to_string()))?;
    let raw_title = caps.name("title").map(|m| m.as_str()).unwrap_or_default();
    let factor = match caps.name("factor") {
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|f| (1..=max_scale).contains(f))
            .ok_or_else(|| {
                ParseError::InvalidScale(format!("{} (allowed 1-{max_scale})", m.as_str()))
            })?,
        None => 1,
    };
    let title = percent_decode_str(raw_title)
        .decode_utf8()
        .map_err(|_| ParseError::InvalidEncoding(raw_title.to_string()))?
        .into_owned();
    Ok(CardRequest { title, factor })
}

pub async fn get_card(
    State(theme): State<Arc<CardTheme>>,
    State(cache): State<RenderCache>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, CardError> {
    let request = parse_card_path(uri.path().trim_start_matches('/'), theme.max_scale)?;
    tracing::debug!(title = %request.title, factor = request.factor, "Rendering card");
    let data = cache.get_or_render(&theme, request).await?;
    Ok((
        [
            (header::CONTENT_TYPE, mime::IMAGE_PNG.as_ref()),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, Bytes},
        http::{Request, StatusCode},
    };
    use og_card_core::{FAILURE_MESSAGE, config::Config};
    use tower::ServiceExt;

    use super::*;
    use crate::{AppState, app};

    #[test]
    fn test_parse_card_path() {
        let ok = |title: &str, factor| Ok(CardRequest { title: title.to_string(), factor });
        let cases: &[(&str, Result<CardRequest, ParseError>)] = &[
            ("My%20Title.png", ok("My Title", 1)),
            ("My%20Title.x2.png", ok("My Title", 2)),
            ("My%20Title.x1.png", ok("My Title", 1)),
            ("Hello%20World.png", ok("Hello World", 1)),
            ("blog/posts/Hello.png", ok("blog/posts/Hello", 1)),
            ("a%2Fb.x3.png", ok("a/b", 3)),
            ("%E4%BD%A0%E5%A5%BD.x4.png", ok("你好", 4)),
            ("a+b.png", ok("a+b", 1)),
            ("v1.2.png", ok("v1.2", 1)),
            ("a.x2.x3.png", ok("a.x2", 3)),
            ("foo.x.png", ok("foo.x", 1)),
            ("foo", Err(ParseError::InvalidPathFormat("foo".to_string()))),
            ("", Err(ParseError::InvalidPathFormat(String::new()))),
            (".png", Err(ParseError::InvalidPathFormat(".png".to_string()))),
            ("foo.PNG", Err(ParseError::InvalidPathFormat("foo.PNG".to_string()))),
            ("foo.png.txt", Err(ParseError::InvalidPathFormat("foo.png.txt".to_string()))),
            ("foo.x0.png", Err(ParseError::InvalidScale("0 (allowed 1-4)".to_string()))),
            ("foo.x5.png", Err(ParseError::InvalidScale("5 (allowed 1-4)".to_string()))),
            (
                "foo.x99999999999.png",
                Err(ParseError::InvalidScale("99999999999 (allowed 1-4)".to_string())),
            ),
            ("%FF.png", Err(ParseError::InvalidEncoding("%FF".to_string()))),
        ];
        for (path, expected) in cases {
            assert_eq!(&parse_card_path(path, 4), expected, "{path:?}");
        }
    }

    fn test_state(cache_bytes: u64) -> AppState {
        let mut config = Config::default();
        config.card.font.path = "/nonexistent/LXGWWenKaiLite-Regular.ttf".into();
        config.cache.max_bytes = cache_bytes;
        AppState::new(config).unwrap()
    }

    async fn request(
        router: Router,
        method: &str,
        uri: &str,
    ) -> (StatusCode, Option<String>, Bytes) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body)
    }

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let image = image::load_from_memory_with_format(png, image::ImageFormat::Png).unwrap();
        (image.width(), image.height())
    }

    #[tokio::test]
    async fn test_renders_card() {
        let (status, content_type, body) =
            request(app(test_state(0)), "GET", "/My%20Title.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(dimensions(&body), (1200, 630));
    }

    #[tokio::test]
    async fn test_scale_factor() {
        let (status, _, body) = request(app(test_state(0)), "GET", "/My%20Title.x2.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dimensions(&body), (2400, 1260));
    }

    #[tokio::test]
    async fn test_default_factor_matches_x1() {
        let router = app(test_state(0));
        let (_, _, plain) = request(router.clone(), "GET", "/blog/Same.png").await;
        let (_, _, explicit) = request(router, "GET", "/blog/Same.x1.png").await;
        assert_eq!(dimensions(&plain), dimensions(&explicit));
        assert_eq!(plain, explicit);
    }

    #[tokio::test]
    async fn test_failures_are_opaque() {
        for uri in ["/foo", "/foo.x0.png", "/foo.x9.png", "/%FF.png"] {
            let (status, content_type, body) = request(app(test_state(0)), "GET", uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
            assert_eq!(body, FAILURE_MESSAGE.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_renders_titles_with_control_characters() {
        for uri in ["/a%01b.png", "/nul%00.png", "/x%EF%BF%BE.png", "/tab%09title.png"] {
            let (status, _, body) = request(app(test_state(0)), "GET", uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(dimensions(&body), (1200, 630), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_only_get() {
        let (status, _, _) = request(app(test_state(0)), "POST", "/My%20Title.png").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_caches_rendered_cards() {
        let state = test_state(16 * 1024 * 1024);
        let cache = state.cache.clone();
        let key = CardRequest { title: "Hello World".to_string(), factor: 1 };
        assert!(!cache.contains(&key).await);
        let (status, _, first) = request(app(state.clone()), "GET", "/Hello%20World.png").await;
        assert_eq!(status, StatusCode::OK);
        assert!(cache.contains(&key).await);
        let (_, _, second) = request(app(state), "GET", "/Hello%20World.png").await;
        assert_eq!(first, second);
    }
}
