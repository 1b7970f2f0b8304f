// Parser for restaurant detail pages. The markup here is a lot less regular than the listing
// pages, so most fields are a list of selectors tried in order, with a regex over the page text as
// the last resort where that makes sense.

use crate::{
    config::SiteUrls,
    models::{Coordinates, MealMenu, MealType, MenuUrls, Restaurant},
    parsers::menu,
    util::*,
};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static ADDRESS_MARKER: &str = "MA";
/// Hosts that are never a restaurant's own website
static EXCLUDED_HOSTS: [&str; 2] = ["restaurantweek", "bostonchefs.com"];
static WEBSITE_HINTS: [&str; 3] = ["visit", "website", "official"];

lazy_static! {
    static ref SEL_REST_ADDRESS: Selector = sel("p.restAddress");
    static ref SEL_ADDRESS_FALLBACKS: [Selector; 4] = [
        sel("address"),
        sel(".address"),
        sel("[class*='address']"),
        sel("[itemprop='address']"),
    ];
    static ref SEL_PHONE: [Selector; 4] = [
        sel("a[href^='tel:']"),
        sel(".phone"),
        sel("[class*='phone']"),
        sel("[itemprop='telephone']"),
    ];
    static ref SEL_WEBSITE: Selector = sel(r#"a.restaurantWebsiteLink, a[class*="website"]"#);
    static ref SEL_ABSOLUTE_LINK: Selector = sel("a[href^='http']");
    static ref SEL_IMAGE: [Selector; 4] = [
        sel(".restaurant-image img"),
        sel(".hero-image img"),
        sel("img.restaurant-photo"),
        sel("#restaurantDetailsCol img"),
    ];
    static ref SEL_COORD_ATTRS: Selector =
        sel("[data-lat][data-lng], [data-latitude][data-longitude]");
    static ref SEL_SCRIPT: Selector = sel("script");
    static ref RE_PHONE: Regex = Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap();
    static ref RE_LAT: Regex =
        Regex::new(r#"lat(?:itude)?["']?\s*[:=]\s*([+-]?\d+\.?\d*)"#).unwrap();
    static ref RE_LNG: Regex =
        Regex::new(r#"(?:lng|lon(?:gitude)?)["']?\s*[:=]\s*([+-]?\d+\.?\d*)"#).unwrap();
    static ref RE_MENU_URLS: [(MealType, Regex); 3] = [
        (MealType::Lunch, Regex::new(r#"var\s+lunchMenuURL\s*=\s*"([^"]+)""#).unwrap()),
        (MealType::Dinner, Regex::new(r#"var\s+dinnerMenuURL\s*=\s*"([^"]+)""#).unwrap()),
        (MealType::Brunch, Regex::new(r#"var\s+brunchMenuURL\s*=\s*"([^"]+)""#).unwrap()),
    ];
}

#[derive(Debug, Clone, Default)]
pub struct DetailParser {
    urls: SiteUrls,
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(str::is_empty)
}

impl DetailParser {
    pub fn new(urls: SiteUrls) -> Self {
        Self { urls }
    }

    /// Enrich `restaurant` with what can be found on its detail page.
    /// Contact fields already set from the listing are kept, coordinates and menu URLs are
    /// replaced whenever the page has them.
    pub fn parse<'r>(&self, html: &str, restaurant: &'r mut Restaurant) -> &'r mut Restaurant {
        let doc = Html::parse_document(html);

        if is_blank(&restaurant.address) {
            restaurant.address = extract_address(&doc);
        }
        if is_blank(&restaurant.phone) {
            restaurant.phone = extract_phone(&doc);
        }
        if is_blank(&restaurant.website) {
            restaurant.website = extract_website(&doc);
        }
        if is_blank(&restaurant.image_url) {
            restaurant.image_url = extract_image(&doc).map(|src| self.urls.resolve(&src));
        }
        if let Some(coordinates) = extract_coordinates(&doc) {
            restaurant.coordinates = Some(coordinates);
        }
        let menu_urls = extract_menu_urls(&doc);
        if !menu_urls.is_empty() {
            restaurant.menu_urls = Some(menu_urls);
        }

        restaurant
    }

    /// Parse a menu fragment fetched from one of the URLs found by `parse`
    pub fn parse_menu_html(&self, html: &str, meal_type: MealType, price: Option<u32>) -> MealMenu {
        menu::parse_menu_html(html, meal_type, price)
    }
}

fn extract_address(doc: &Html) -> Option<String> {
    let rest_address = doc
        .select(&SEL_REST_ADDRESS)
        .map(|p| element_text(&p))
        .find(|t| t.contains(ADDRESS_MARKER));
    if rest_address.is_some() {
        return rest_address;
    }

    SEL_ADDRESS_FALLBACKS.iter().find_map(|s| {
        doc.select(s)
            .next()
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty())
    })
}

fn extract_phone(doc: &Html) -> Option<String> {
    for s in SEL_PHONE.iter() {
        let Some(e) = doc.select(s).next() else {
            continue;
        };
        if let Some(number) = e.attr("href").and_then(|h| h.strip_prefix("tel:")) {
            return Some(number.trim().into());
        }
        let text = element_text(&e);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let text = raw_text(&doc.root_element());
    RE_PHONE.find(&text).map(|m| m.as_str().into())
}

fn is_excluded_host(href: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return true;
    };
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.is_empty() || EXCLUDED_HOSTS.iter().any(|h| host.contains(h))
}

fn extract_website(doc: &Html) -> Option<String> {
    let classed = doc
        .select(&SEL_WEBSITE)
        .filter_map(|a| a.attr("href"))
        .find(|href| href.starts_with("http"));
    if let Some(href) = classed {
        return Some(href.into());
    }

    doc.select(&SEL_ABSOLUTE_LINK)
        .filter(|a| a.attr("href").is_some_and(|href| !is_excluded_host(href)))
        .find(|a| {
            let text = element_text(a).to_lowercase();
            WEBSITE_HINTS.iter().any(|hint| text.contains(hint))
        })
        .and_then(|a| a.attr("href"))
        .map(String::from)
}

/// Raw image source, not yet resolved against the site
fn extract_image(doc: &Html) -> Option<String> {
    SEL_IMAGE.iter().find_map(|s| {
        let img = doc.select(s).next()?;
        img.attr("src")
            .filter(|src| !src.is_empty())
            .or_else(|| img.attr("data-src"))
            .filter(|src| !src.is_empty())
            .map(String::from)
    })
}

fn extract_coordinates(doc: &Html) -> Option<Coordinates> {
    for e in doc.select(&SEL_COORD_ATTRS) {
        let lat = e.attr("data-lat").or_else(|| e.attr("data-latitude"));
        let lng = e.attr("data-lng").or_else(|| e.attr("data-longitude"));
        if let (Some(latitude), Some(longitude)) =
            (lat.and_then(parse_float), lng.and_then(parse_float))
        {
            return Some(Coordinates {
                latitude,
                longitude,
            });
        }
    }

    for script in doc.select(&SEL_SCRIPT) {
        let text = raw_text(&script);
        let lat = RE_LAT.captures(&text).and_then(|c| parse_float(&c[1]));
        let lng = RE_LNG.captures(&text).and_then(|c| parse_float(&c[1]));
        if let (Some(latitude), Some(longitude)) = (lat, lng) {
            return Some(Coordinates {
                latitude,
                longitude,
            });
        }
    }

    None
}

/// The menus are loaded by the page via XHR, the endpoints are set as JS variables. Later
/// scripts win if a variable is set more than once.
fn extract_menu_urls(doc: &Html) -> MenuUrls {
    let mut urls = MenuUrls::default();
    for script in doc.select(&SEL_SCRIPT) {
        let text = raw_text(&script);
        for (meal, re) in RE_MENU_URLS.iter() {
            if let Some(c) = re.captures(&text) {
                urls.set(*meal, c[1].into());
            }
        }
    }
    urls
}
