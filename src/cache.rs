// Raw HTML cache on disk. This is only a development convenience to not hammer the site while
// iterating on the parsers, so there is no eviction, TTL or integrity checking.

use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind<'a> {
    /// A listing page, keyed by page number
    Listing(u32),
    /// A restaurant detail page, keyed by slug
    Detail(&'a str),
}

#[derive(Debug, Clone)]
pub struct HtmlCache {
    listings_dir: PathBuf,
    details_dir: PathBuf,
}

impl HtmlCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            listings_dir: root.join("listings"),
            details_dir: root.join("details"),
        }
    }

    pub fn path(&self, kind: PageKind) -> PathBuf {
        match kind {
            PageKind::Listing(page) => self.listings_dir.join(format!("page_{page}.html")),
            PageKind::Detail(slug) => self
                .details_dir
                .join(format!("{}.html", slug.replace('/', "_"))),
        }
    }

    pub fn has(&self, kind: PageKind) -> bool {
        self.path(kind).is_file()
    }

    /// Cached HTML for the given page. A file that exists but can't be read is logged and treated
    /// as a miss.
    pub fn get(&self, kind: PageKind) -> Option<String> {
        let path = self.path(kind);
        if !path.is_file() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(html) => {
                trace!(path = %path.display(), "Cache hit");
                Some(html)
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "Failed to read cached page");
                None
            }
        }
    }

    pub fn save(&self, kind: PageKind, html: &str) -> io::Result<()> {
        let path = self.path(kind);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, html)?;
        trace!(path = %path.display(), "Saved page to cache");
        Ok(())
    }
}
