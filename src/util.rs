use nom::number::complete;
use scraper::{ElementRef, Selector};

const NBSP: char = '\u{a0}';

/// Parse a static selector. Only ever called with literals, so a failure is a programming error.
pub fn sel(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

/// Text of the first element matching `sel` below `e`, whitespace collapsed
pub fn get_text(e: &ElementRef, sel: &Selector) -> Option<String> {
    e.select(sel).next().map(|v| element_text(&v)).filter(|v| !v.is_empty())
}

/// All text below `e`, whitespace collapsed and non-breaking spaces normalized
pub fn element_text(e: &ElementRef) -> String {
    reduce_whitespace(&e.text().collect::<String>())
}

/// All text below `e` as-is, for regex and substring scans
pub fn raw_text(e: &ElementRef) -> String {
    e.text().collect()
}

/// Strictly parse a float, the whole (trimmed) input must be a finite number
pub fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    match complete::double::<_, ()>(s) {
        Ok(("", v)) if v.is_finite() => Some(v),
        _ => None,
    }
}

pub fn reduce_whitespace(s: &str) -> String {
    s.replace(NBSP, " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// True if the string has at least one cased character and no lowercase ones
pub fn is_uppercase(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// "FIRST COURSE" -> "First Course", "the-capital-grille" style input should have its
/// separators replaced before calling this.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for c in s.chars() {
        let starts_word = prev.is_none_or(|p| !p.is_alphabetic() && p != '\'');
        if starts_word {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        prev = Some(c);
    }
    out
}
