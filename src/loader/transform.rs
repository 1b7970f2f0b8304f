// Flattening of scraped restaurants into rows for the `restaurants` table. Availability and
// coordinates have no columns and are dropped.

use crate::models::{Menu, Restaurant};
use serde::Serialize;

/// One row in the `restaurants` table. Every key is always serialized, absent values as `null`,
/// so that an upsert clears columns that no longer have data.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RestaurantRow {
    pub slug: String,
    pub name: String,
    pub cuisine: Option<Vec<String>>,
    pub neighborhood: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub detail_url: Option<String>,
    pub image_url: Option<String>,
    pub lunch_price: Option<u32>,
    pub dinner_price: Option<u32>,
    pub brunch_price: Option<u32>,
    pub menu: Option<Menu>,
    pub features: Option<Vec<String>>,
}

/// "Italian, Pizza" -> ["Italian", "Pizza"]
fn split_cuisine(cuisine: Option<&str>) -> Option<Vec<String>> {
    let parts: Vec<String> = cuisine?
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    (!parts.is_empty()).then_some(parts)
}

impl From<Restaurant> for RestaurantRow {
    fn from(r: Restaurant) -> Self {
        Self {
            cuisine: split_cuisine(r.cuisine.as_deref()),
            lunch_price: r.pricing.lunch,
            dinner_price: r.pricing.dinner,
            brunch_price: r.pricing.brunch,
            menu: r.menu.filter(|m| !m.is_empty()),
            features: (!r.features.is_empty()).then_some(r.features),
            slug: r.slug,
            name: r.name,
            neighborhood: r.neighborhood,
            address: r.address,
            phone: r.phone,
            website: r.website,
            detail_url: r.detail_url,
            image_url: r.image_url,
        }
    }
}

pub fn transform(restaurant: Restaurant) -> RestaurantRow {
    restaurant.into()
}

pub fn transform_all(restaurants: Vec<Restaurant>) -> Vec<RestaurantRow> {
    restaurants.into_iter().map(RestaurantRow::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn raw(overrides: Value) -> Restaurant {
        let mut base = json!({
            "slug": "test-restaurant",
            "name": "Test Restaurant",
            "cuisine": "American",
            "neighborhood": "Back Bay",
            "address": "123 Test St, Boston, MA 02101",
            "phone": "617-555-1234",
            "website": "https://example.com",
            "detail_url": "https://www.restaurantweekboston.com/restaurant/test-restaurant/",
            "image_url": "https://example.com/img.jpg",
            "availability": {"lunch": true, "dinner": true, "brunch": false},
            "pricing": {"lunch": 32, "dinner": 46, "brunch": null},
            "features": ["outdoor seating", "vegetarian friendly"],
            "menu": {"menus": [{"meal_type": "lunch", "price": 32, "courses": []}]},
            "coordinates": {"latitude": 42.35, "longitude": -71.06},
        });
        if let (Some(b), Some(o)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in o {
                if v == &json!("__remove__") {
                    b.remove(k);
                } else {
                    b.insert(k.clone(), v.clone());
                }
            }
        }
        serde_json::from_value(base).unwrap()
    }

    fn row(overrides: Value) -> Value {
        serde_json::to_value(transform(raw(overrides))).unwrap()
    }

    #[test]
    fn cuisine() {
        assert_eq!(json!(["American"]), row(json!({}))["cuisine"]);
        assert_eq!(
            json!(["American", "Outdoor Dining"]),
            row(json!({"cuisine": "American, Outdoor Dining"}))["cuisine"]
        );
        assert_eq!(
            json!(["Italian", "Pizza", "Pasta", "Wine Bar"]),
            row(json!({"cuisine": "Italian, Pizza, Pasta, Wine Bar"}))["cuisine"]
        );
        assert_eq!(Value::Null, row(json!({"cuisine": null}))["cuisine"]);
        assert_eq!(Value::Null, row(json!({"cuisine": ""}))["cuisine"]);
        assert_eq!(json!(["Thai"]), row(json!({"cuisine": " , Thai,"}))["cuisine"]);
    }

    #[test]
    fn pricing() {
        let r = row(json!({"pricing": {"lunch": 32, "dinner": 46, "brunch": 28}}));
        assert_eq!(32, r["lunch_price"]);
        assert_eq!(46, r["dinner_price"]);
        assert_eq!(28, r["brunch_price"]);

        let r = row(json!({"pricing": {"lunch": null, "dinner": 55, "brunch": null}}));
        assert_eq!(Value::Null, r["lunch_price"]);
        assert_eq!(55, r["dinner_price"]);

        for pricing in [json!("__remove__"), json!({}), json!(null)] {
            let r = row(json!({ "pricing": pricing }));
            assert_eq!(Value::Null, r["lunch_price"]);
            assert_eq!(Value::Null, r["dinner_price"]);
            assert_eq!(Value::Null, r["brunch_price"]);
        }
    }

    #[test]
    fn menu() {
        let menu = json!({"menus": [{"meal_type": "lunch", "price": 32, "courses": []}]});
        assert_eq!(menu, row(json!({ "menu": menu.clone() }))["menu"]);
        assert_eq!(Value::Null, row(json!({"menu": {"menus": []}}))["menu"]);
        assert_eq!(Value::Null, row(json!({"menu": null}))["menu"]);
        assert_eq!(Value::Null, row(json!({"menu": "__remove__"}))["menu"]);
    }

    #[test]
    fn features() {
        assert_eq!(
            json!(["outdoor seating", "vegetarian friendly"]),
            row(json!({}))["features"]
        );
        assert_eq!(Value::Null, row(json!({"features": []}))["features"]);
        assert_eq!(Value::Null, row(json!({"features": null}))["features"]);
    }

    #[test]
    fn dropped_and_passthrough_fields() {
        let r = row(json!({}));
        assert!(r.get("availability").is_none());
        assert!(r.get("coordinates").is_none());
        assert!(r.get("pricing").is_none());

        assert_eq!("test-restaurant", r["slug"]);
        assert_eq!("Test Restaurant", r["name"]);
        assert_eq!("Back Bay", r["neighborhood"]);
        assert_eq!("123 Test St, Boston, MA 02101", r["address"]);
        assert_eq!("617-555-1234", r["phone"]);
        assert_eq!("https://example.com", r["website"]);
        assert_eq!(
            "https://www.restaurantweekboston.com/restaurant/test-restaurant/",
            r["detail_url"]
        );
        assert_eq!("https://example.com/img.jpg", r["image_url"]);
    }

    #[test]
    fn all_keys_present() {
        let r = serde_json::to_value(transform(Restaurant::new("x", "X"))).unwrap();
        let obj = r.as_object().unwrap();
        assert_eq!(14, obj.len());
        assert!(
            obj.iter()
                .filter(|(k, _)| *k != "slug" && *k != "name")
                .all(|(_, v)| v.is_null())
        );
    }

    #[test]
    fn transform_many() {
        let rows = transform_all(vec![Restaurant::new("a", "A"), Restaurant::new("b", "B")]);
        assert_eq!(vec!["a", "b"], rows.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>());
    }
}
