// The structs in this module are what the scraper produces and what ends up in the JSON output.
// The loader reads the same structs back and flattens them into database rows, see
// `loader::transform`.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use std::fmt::Display;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Lunch,
    Dinner,
    Brunch,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Lunch, MealType::Dinner, MealType::Brunch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Brunch => "brunch",
        }
    }
}

impl Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Which meals a restaurant takes part in
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Availability {
    pub lunch: bool,
    pub dinner: bool,
    pub brunch: bool,
}

/// Fixed menu price per meal, in whole dollars
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Pricing {
    pub lunch: Option<u32>,
    pub dinner: Option<u32>,
    pub brunch: Option<u32>,
}

impl Pricing {
    pub fn for_meal(&self, meal: MealType) -> Option<u32> {
        match meal {
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
            MealType::Brunch => self.brunch,
        }
    }

    pub fn set(&mut self, meal: MealType, price: Option<u32>) {
        match meal {
            MealType::Lunch => self.lunch = price,
            MealType::Dinner => self.dinner = price,
            MealType::Brunch => self.brunch = price,
        }
    }
}

/// A named group of dishes, e.g. "First Course"
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Course {
    pub name: String,
    pub options: Vec<String>,
}

impl Course {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MealMenu {
    pub meal_type: MealType,
    pub price: Option<u32>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

impl MealMenu {
    pub fn new(meal_type: MealType, price: Option<u32>) -> Self {
        Self {
            meal_type,
            price,
            courses: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Menu {
    pub menus: Vec<MealMenu>,
}

impl Menu {
    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}

/// Relative menu endpoints found on a detail page. Only lives between parsing the detail page
/// and fetching the menus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuUrls {
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub brunch: Option<String>,
}

impl MenuUrls {
    pub fn set(&mut self, meal: MealType, url: String) {
        match meal {
            MealType::Lunch => self.lunch = Some(url),
            MealType::Dinner => self.dinner = Some(url),
            MealType::Brunch => self.brunch = Some(url),
        }
    }

    pub fn get(&self, meal: MealType) -> Option<&str> {
        match meal {
            MealType::Lunch => self.lunch.as_deref(),
            MealType::Dinner => self.dinner.as_deref(),
            MealType::Brunch => self.brunch.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Non-empty URLs, in lunch, dinner, brunch order
    pub fn iter(&self) -> impl Iterator<Item = (MealType, &str)> {
        MealType::ALL
            .into_iter()
            .filter_map(|m| self.get(m).filter(|u| !u.is_empty()).map(|u| (m, u)))
    }
}

fn menu_is_empty(menu: &Option<Menu>) -> bool {
    menu.as_ref().is_none_or(Menu::is_empty)
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Restaurant {
    /// Site identifier, e.g. "the-capital-grille"
    pub slug: String,
    pub name: String,
    /// Comma separated list as shown on the site
    pub cuisine: Option<String>,
    pub neighborhood: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub availability: Availability,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub pricing: Pricing,
    /// Free text tags, e.g. "outdoor dining"
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "menu_is_empty")]
    pub menu: Option<Menu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip)]
    pub menu_urls: Option<MenuUrls>,
}

impl Restaurant {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Replace the menu with the given meal menus. An empty list leaves the current menu as is.
    pub fn set_meal_menus(&mut self, menus: Vec<MealMenu>) {
        if !menus.is_empty() {
            self.menu = Some(Menu { menus });
        }
    }

    /// Remove the transient menu URLs, returning them if any were set
    pub fn take_menu_urls(&mut self) -> Option<MenuUrls> {
        self.menu_urls.take()
    }

    pub fn clear_menu_urls(&mut self) {
        self.menu_urls = None;
    }

    pub fn has_menu(&self) -> bool {
        !menu_is_empty(&self.menu)
    }
}
