pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod models;
pub mod output;
pub mod parsers;
pub mod scrape;
pub mod util;

#[cfg(test)]
mod testutil;
