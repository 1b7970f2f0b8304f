// Defaults for the scraper and loader. Anything a user might want to tweak per run is also
// exposed as a CLI flag, these are just the fallbacks.

use std::time::Duration;
use url::Url;

pub static BASE_URL: &str = "https://www.restaurantweekboston.com";
static LISTING_QUERY: &str = "/?neighborhood=all&meal=all&cuisine=all";

pub static CACHE_DIR: &str = "data/raw";
pub static OUTPUT_FILE: &str = "data/restaurants.json";
pub static ENV_FILE: &str = ".env.local";

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_RETRIES: u32 = 3;
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const UPSERT_BATCH_SIZE: usize = 50;

pub static USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// URLs for the scraped site, derived from a single base so tests can point everything at a
/// local server.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteUrls {
    base: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}

impl SiteUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The first listing page has no page parameter, the rest do
    pub fn listing_page(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}{}", self.base, LISTING_QUERY)
        } else {
            format!("{}{}&page={}", self.base, LISTING_QUERY, page)
        }
    }

    pub fn detail(&self, slug: &str) -> String {
        format!("{}/restaurant/{}/", self.base, slug)
    }

    /// Resolve a site-relative path, leaving absolute URLs untouched
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.into();
        }
        match Url::parse(&format!("{}/", self.base)).and_then(|base| base.join(path)) {
            Ok(url) => url.into(),
            Err(_) => format!("{}/{}", self.base, path.trim_start_matches('/')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_page_urls() {
        let urls = SiteUrls::new("http://localhost:8080/");
        assert_eq!(
            "http://localhost:8080/?neighborhood=all&meal=all&cuisine=all",
            urls.listing_page(1)
        );
        assert_eq!(
            "http://localhost:8080/?neighborhood=all&meal=all&cuisine=all&page=4",
            urls.listing_page(4)
        );
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let urls = SiteUrls::default();
        assert_eq!(
            "https://www.restaurantweekboston.com/static/logo.gif",
            urls.resolve("/static/logo.gif")
        );
        assert_eq!(
            "https://cdn.example.com/logo.gif",
            urls.resolve("https://cdn.example.com/logo.gif")
        );
        assert_eq!(
            "https://www.restaurantweekboston.com/images/a.jpg",
            urls.resolve("images/a.jpg")
        );
        assert_eq!(
            "https://cdn.example.com/b.jpg",
            urls.resolve("//cdn.example.com/b.jpg")
        );
        assert_eq!(
            "https://www.restaurantweekboston.com/restaurant/the-capital-grille/",
            urls.detail("the-capital-grille")
        );
    }
}
