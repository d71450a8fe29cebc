use crate::browser::BrowserSession;
use crate::cache::ContentCache;
use crate::error::ScrapeError;
use crate::results::PageSnapshot;
use crate::utils;
use url::Url;

/// Gets a page's markup into the session, from the cache or from the web
#[derive(Clone)]
pub struct PageLoader {
    cache: ContentCache,
}

impl PageLoader {
    pub fn new(cache: ContentCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Loads `url` into `session`.
    ///
    /// With `use_cache` a cached copy is injected without navigating; otherwise,
    /// or on a miss, the page is fetched and the cache entry rewritten. Either
    /// way the session settles before returning.
    pub async fn load(
        &self,
        session: &BrowserSession,
        url: &Url,
        use_cache: bool,
    ) -> Result<PageSnapshot, ScrapeError> {
        let site = utils::site_of(url);

        let cached = if use_cache {
            self.cache.get(&site, url.path()).await
        } else {
            None
        };

        let snapshot = match cached {
            Some(hit) => {
                session.set_content(&hit.content).await?;
                ::log::info!("loaded {} from the cache", url);
                PageSnapshot::cached(url.to_string(), hit.content, hit.updated_at)
            }
            None => {
                session.navigate(url.as_str()).await?;
                let markup = session.content().await?;
                self.cache.put(&site, url.path(), &markup).await;
                ::log::info!("loaded {} from the web, and cached it", url);
                PageSnapshot::fresh(url.to_string(), markup)
            }
        };

        session.settle().await;
        Ok(snapshot)
    }
}
