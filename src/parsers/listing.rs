// Parser for the paginated listing pages. Each restaurant is a `div.restaurantEntry` with an id of
// the form "restaurantID-<slug>".

use crate::{
    config::SiteUrls,
    models::{Availability, MealType, Pricing, Restaurant},
    util::*,
};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static ENTRY_ID_PREFIX: &str = "restaurantID-";
static ADDRESS_MARKER: &str = "MA";
static SEPARATORS: [&str; 2] = [",", "|"];
static FEATURE_KEYWORDS: [&str; 5] = ["outdoor", "patio", "delivery", "takeout", "to-go"];

lazy_static! {
    static ref SEL_ENTRY: Selector = sel("div.restaurantEntry");
    static ref SEL_LINK: Selector = sel("a[href]");
    static ref SEL_H4: Selector = sel("h4");
    static ref SEL_A: Selector = sel("a");
    static ref SEL_CUISINE_LINK: Selector = sel(r#"a[href*="/?cuisine="]"#);
    static ref SEL_NEIGHBORHOOD_LINK: Selector = sel(r#"a[href*="/?neighborhood="]"#);
    static ref SEL_REST_CLASS: Selector = sel("span.restClass");
    static ref SEL_MAP_LINK: Selector = sel(r#"a[href*="/map/"]"#);
    static ref SEL_LOGO_IMG: Selector = sel("div.restaurantLogo img");
    static ref SEL_FEATURE_ICON: Selector = sel("div.restaurantFeatureIcons img");
    static ref SEL_PAGINATION: Selector = sel("a[href*='page='], .paginationControls a");
    static ref RE_LUNCH_PRICE: Regex = Regex::new(r"(?i)Lunch[:\s]*\$(\d+)").unwrap();
    static ref RE_DINNER_PRICE: Regex = Regex::new(r"(?i)Dinner[:\s]*\$(\d+)").unwrap();
    static ref RE_BRUNCH_PRICE: Regex = Regex::new(r"(?i)Brunch[:\s]*\$(\d+)").unwrap();
    static ref RE_PAGE_OF: Regex = Regex::new(r"(?i)page\s+\d+\s+of\s+(\d+)").unwrap();
    static ref RE_PAGE_PARAM: Regex = Regex::new(r"page=(\d+)").unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct ListingParser {
    urls: SiteUrls,
}

impl ListingParser {
    pub fn new(urls: SiteUrls) -> Self {
        Self { urls }
    }

    /// Partial restaurants found on a listing page, in page order. Entries without a usable id
    /// are skipped.
    pub fn parse(&self, html: &str) -> Vec<Restaurant> {
        let doc = Html::parse_document(html);
        doc.select(&SEL_ENTRY)
            .filter_map(|e| self.parse_entry(&e))
            .collect()
    }

    fn parse_entry(&self, entry: &ElementRef) -> Option<Restaurant> {
        let slug = entry_slug(entry)?;
        let text = raw_text(entry);

        Some(Restaurant {
            name: extract_name(entry, slug),
            cuisine: extract_cuisine(entry),
            neighborhood: extract_neighborhood(entry),
            address: extract_address(entry),
            detail_url: Some(self.urls.detail(slug)),
            image_url: extract_image(entry).map(|src| self.urls.resolve(&src)),
            availability: extract_availability(&text),
            pricing: extract_pricing(&text),
            features: extract_features(entry, &text),
            ..Restaurant::new(slug, "")
        })
    }

    /// Total number of listing pages. Prefers the "page N of M" text, then the highest page
    /// number linked from the pagination, and falls back to 1.
    pub fn get_total_pages(&self, html: &str) -> u32 {
        let doc = Html::parse_document(html);

        let text = raw_text(&doc.root_element());
        if let Some(total) = RE_PAGE_OF
            .captures(&text)
            .and_then(|c| c[1].parse::<u32>().ok())
        {
            return total;
        }

        doc.select(&SEL_PAGINATION)
            .filter_map(|a| a.attr("href"))
            .filter_map(|href| RE_PAGE_PARAM.captures(href))
            .filter_map(|c| c[1].parse::<u32>().ok())
            .fold(1, u32::max)
    }
}

fn entry_slug<'a>(entry: &ElementRef<'a>) -> Option<&'a str> {
    entry
        .value()
        .attr("id")?
        .strip_prefix(ENTRY_ID_PREFIX)
        .filter(|s| !s.is_empty())
}

/// Name from the restaurant's own link, then the first link in the heading, then the slug
fn extract_name(entry: &ElementRef, slug: &str) -> String {
    let own_href = format!("/restaurant/{slug}");
    let own_link = entry
        .select(&SEL_LINK)
        .filter(|a| a.attr("href") == Some(own_href.as_str()))
        .map(|a| element_text(&a))
        .find(|t| !t.is_empty());
    if let Some(name) = own_link {
        return name;
    }

    let heading_link = entry
        .select(&SEL_H4)
        .next()
        .and_then(|h4| h4.select(&SEL_A).next())
        .map(|a| element_text(&a))
        .filter(|t| !t.is_empty());
    if let Some(name) = heading_link {
        return name;
    }

    title_case(&slug.replace('-', " "))
}

/// Text of the `span.restClass` inside each link, skipping the separator spans
fn labelled_links<'a>(
    entry: &'a ElementRef<'a>,
    links: &'a Selector,
) -> impl Iterator<Item = String> + 'a {
    entry
        .select(links)
        .filter_map(|a| get_text(&a, &SEL_REST_CLASS))
        .filter(|t| !SEPARATORS.contains(&t.as_str()))
}

fn extract_cuisine(entry: &ElementRef) -> Option<String> {
    let cuisines: Vec<String> = labelled_links(entry, &SEL_CUISINE_LINK).collect();
    if cuisines.is_empty() {
        return None;
    }
    Some(cuisines.join(", "))
}

fn extract_neighborhood(entry: &ElementRef) -> Option<String> {
    labelled_links(entry, &SEL_NEIGHBORHOOD_LINK).next()
}

fn extract_address(entry: &ElementRef) -> Option<String> {
    entry
        .select(&SEL_MAP_LINK)
        .map(|a| element_text(&a))
        .find(|t| t.contains(ADDRESS_MARKER))
}

/// Best effort: a meal counts as available if its name appears anywhere in the entry
fn extract_availability(text: &str) -> Availability {
    let text = text.to_lowercase();
    Availability {
        lunch: text.contains("lunch"),
        dinner: text.contains("dinner"),
        brunch: text.contains("brunch"),
    }
}

fn extract_pricing(text: &str) -> Pricing {
    let mut pricing = Pricing::default();
    for (meal, re) in [
        (MealType::Lunch, &*RE_LUNCH_PRICE),
        (MealType::Dinner, &*RE_DINNER_PRICE),
        (MealType::Brunch, &*RE_BRUNCH_PRICE),
    ] {
        let price = re.captures(text).and_then(|c| c[1].parse::<u32>().ok());
        pricing.set(meal, price);
    }
    pricing
}

/// Raw `src` of the logo, not yet resolved against the site
fn extract_image(entry: &ElementRef) -> Option<String> {
    entry
        .select(&SEL_LOGO_IMG)
        .next()?
        .attr("src")
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn extract_features(entry: &ElementRef, text: &str) -> Vec<String> {
    let mut features: Vec<String> = Vec::new();
    let mut add = |f: String| {
        if !f.is_empty() && !features.contains(&f) {
            features.push(f);
        }
    };

    for icon in entry.select(&SEL_FEATURE_ICON) {
        let label = icon
            .attr("alt")
            .filter(|s| !s.is_empty())
            .or_else(|| icon.attr("title"))
            .unwrap_or_default();
        add(label.trim().to_lowercase());
    }

    let text = text.to_lowercase();
    for keyword in FEATURE_KEYWORDS {
        if text.contains(keyword) {
            add(keyword.into());
        }
    }

    features
}
