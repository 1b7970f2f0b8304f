// The scrape pipeline: listing pages -> detail pages -> menu fragments, all sequential and behind
// the same rate limited client.

use crate::{
    cache::{HtmlCache, PageKind},
    config::SiteUrls,
    fetch::{self, Client, FetchError},
    models::Restaurant,
    parsers::{DetailParser, ListingParser},
};
use anyhow::{Context, Result};
use std::{collections::HashSet, path::PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ScrapeOpts {
    pub urls: SiteUrls,
    pub fetch: fetch::Opts,
    /// Read pages from, and save fetched pages to, this directory
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on the number of listing pages to fetch
    pub max_pages: Option<u32>,
    /// Stop after the listing pages
    pub listings_only: bool,
}

pub struct Scraper {
    client: Client,
    cache: Option<HtmlCache>,
    urls: SiteUrls,
    listing: ListingParser,
    detail: DetailParser,
    max_pages: Option<u32>,
    listings_only: bool,
}

/// Append restaurants not seen before, keeping the first occurrence of each slug
fn add_unique(restaurants: &mut Vec<Restaurant>, seen: &mut HashSet<String>, found: Vec<Restaurant>) {
    for r in found {
        if seen.insert(r.slug.clone()) {
            restaurants.push(r);
        }
    }
}

impl Scraper {
    pub fn new(opts: ScrapeOpts) -> Self {
        Self {
            client: Client::new(opts.fetch),
            cache: opts.cache_dir.map(HtmlCache::new),
            listing: ListingParser::new(opts.urls.clone()),
            detail: DetailParser::new(opts.urls.clone()),
            urls: opts.urls,
            max_pages: opts.max_pages,
            listings_only: opts.listings_only,
        }
    }

    /// Page HTML from the cache if enabled and present, otherwise from the site. Fetched pages are
    /// written to the cache, a failed write only costs a refetch next time.
    async fn get_page(&mut self, kind: PageKind<'_>, url: &str) -> Result<String, FetchError> {
        if let Some(html) = self.cache.as_ref().and_then(|c| c.get(kind)) {
            debug!(?kind, "Using cached page");
            return Ok(html);
        }

        let html = self.client.get(url).await?;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.save(kind, &html) {
                warn!(%err, ?kind, "Failed to cache page");
            }
        }
        Ok(html)
    }

    /// Fetch and parse all listing pages. Any failure here aborts the run, since there is nothing
    /// meaningful to write without the listings.
    pub async fn fetch_listings(&mut self) -> Result<Vec<Restaurant>> {
        let mut restaurants = Vec::new();
        let mut seen = HashSet::new();

        info!("Fetching first listing page...");
        let url = self.urls.listing_page(1);
        let html = self
            .get_page(PageKind::Listing(1), &url)
            .await
            .context("Failed to fetch the first listing page")?;
        if html.trim().is_empty() {
            warn!("First listing page is empty");
            return Ok(restaurants);
        }

        add_unique(&mut restaurants, &mut seen, self.listing.parse(&html));

        let mut total = self.listing.get_total_pages(&html);
        info!(total, "Found listing pages");
        if let Some(max) = self.max_pages {
            total = total.min(max);
            info!(total, "Limiting listing pages");
        }

        for page in 2..=total {
            info!(page, total, "Fetching listing page...");
            let url = self.urls.listing_page(page);
            let html = self
                .get_page(PageKind::Listing(page), &url)
                .await
                .with_context(|| format!("Failed to fetch listing page {page}"))?;
            add_unique(&mut restaurants, &mut seen, self.listing.parse(&html));
        }

        info!(count = restaurants.len(), "Found unique restaurants");
        Ok(restaurants)
    }

    /// Enrich each restaurant from its detail page and fetch its menus. Restaurants whose page
    /// can't be fetched are left as they came from the listing.
    pub async fn fetch_details(&mut self, restaurants: &mut [Restaurant]) {
        let total = restaurants.len();
        for (i, restaurant) in restaurants.iter_mut().enumerate() {
            let Some(url) = restaurant.detail_url.clone() else {
                continue;
            };
            info!(n = i + 1, total, name = %restaurant.name, "Fetching details...");

            let html = match self.get_page(PageKind::Detail(&restaurant.slug), &url).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(%err, slug = %restaurant.slug, "Skipping detail page");
                    continue;
                }
            };
            if html.trim().is_empty() {
                continue;
            }

            self.detail.parse(&html, restaurant);
            self.fetch_menus(restaurant).await;
        }
    }

    /// Fetch the menus found by the detail parser, replacing any menu the restaurant already has.
    /// Menu fragments are never cached.
    #[tracing::instrument(level = "debug", skip_all, fields(slug = %restaurant.slug))]
    pub async fn fetch_menus(&mut self, restaurant: &mut Restaurant) {
        let Some(urls) = restaurant.take_menu_urls() else {
            return;
        };

        let mut menus = Vec::new();
        for (meal, path) in urls.iter() {
            let url = self.urls.resolve(path);
            let html = match self.client.get(&url).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(%err, %meal, "Failed to fetch menu");
                    continue;
                }
            };

            let price = restaurant.pricing.for_meal(meal);
            let menu = self.detail.parse_menu_html(&html, meal, price);
            if menu.courses.is_empty() {
                debug!(%meal, "Menu has no courses");
                continue;
            }
            info!(%meal, courses = menu.courses.len(), "Fetched menu");
            menus.push(menu);
        }
        restaurant.set_meal_menus(menus);
    }

    pub async fn run(&mut self) -> Result<Vec<Restaurant>> {
        let mut restaurants = self.fetch_listings().await?;
        if !self.listings_only {
            self.fetch_details(&mut restaurants).await;
        }
        self.client.close();

        info!(
            restaurants = restaurants.len(),
            with_address = restaurants.iter().filter(|r| r.address.is_some()).count(),
            with_coordinates = restaurants.iter().filter(|r| r.coordinates.is_some()).count(),
            with_menu = restaurants.iter().filter(|r| r.has_menu()).count(),
            "Scrape finished"
        );
        Ok(restaurants)
    }
}
