mod detail;
mod listing;
mod menu;

pub use detail::DetailParser;
pub use listing::ListingParser;
pub use menu::parse_menu_html;

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) use super::{
        detail::tests::SAMPLE_DETAIL, listing::tests::SAMPLE_LISTING, menu::tests::SAMPLE_MENU,
    };
}
