use bytes::Bytes;
use moka::future::Cache;
use og_card_core::{RenderError, config::CacheConfig};
use og_card_images::{render_card, theme::CardTheme};

use crate::handlers::og::CardRequest;

/// Rendered cards, keyed by title and scale factor. Assumes the custom font does not
/// change while the process runs; a font added or replaced later only reaches titles
/// that are not cached yet.
#[derive(Clone)]
pub struct RenderCache {
    inner: Option<Cache<CardRequest, Bytes>>,
}

impl RenderCache {
    pub fn new(config: &CacheConfig) -> Self {
        if config.max_bytes == 0 {
            tracing::info!("Render cache disabled");
            return Self { inner: None };
        }
        let cache = Cache::<CardRequest, Bytes>::builder()
            .weigher(|_, v| v.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(config.max_bytes)
            .eviction_listener(|k, _v, _cause| {
                tracing::debug!("Evicting card from cache: {:?} x{}", k.title, k.factor);
            })
            .build();
        Self { inner: Some(cache) }
    }

    pub async fn get_or_render(
        &self,
        theme: &CardTheme,
        request: CardRequest,
    ) -> Result<Bytes, RenderError> {
        let Some(cache) = &self.inner else {
            return render_card(theme, &request.title, request.factor).await.map(Bytes::from);
        };
        if let Some(data) = cache.get(&request).await {
            return Ok(data);
        }
        let data = Bytes::from(render_card(theme, &request.title, request.factor).await?);
        cache.insert(request, data.clone()).await;
        Ok(data)
    }

    #[cfg(test)]
    pub async fn contains(&self, request: &CardRequest) -> bool {
        match &self.inner {
            Some(cache) => cache.get(request).await.is_some(),
            None => false,
        }
    }
}
