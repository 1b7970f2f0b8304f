// Menu fragments, as returned by the site's `/fetch/<slug>/<meal>/` endpoints. A menu is a flat
// list of paragraphs: course headings are bold uppercase paragraphs, every other paragraph is a
// dish with the name before the first line break and a description after it.

use crate::{
    models::{Course, MealMenu, MealType},
    util::*,
};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};

const MIN_LEN: usize = 3;

lazy_static! {
    static ref SEL_PARAGRAPH: Selector = sel("p");
}

fn is_emphasis(name: &str) -> bool {
    name.eq_ignore_ascii_case("strong") || name.eq_ignore_ascii_case("b")
}

/// Course name if the paragraph is nothing but emphasized uppercase text
fn heading(p: &ElementRef) -> Option<String> {
    let mut text = String::new();
    let mut emphasized = false;

    for child in p.children() {
        match child.value() {
            Node::Text(t) if t.trim().is_empty() => {}
            Node::Element(e) if is_emphasis(e.name()) => {
                emphasized = true;
                if let Some(e) = ElementRef::wrap(child) {
                    text.push_str(&raw_text(&e));
                    text.push(' ');
                }
            }
            Node::Element(e) if e.name() == "br" => {}
            Node::Comment(_) => {}
            _ => return None,
        }
    }

    let text = reduce_whitespace(&text);
    (emphasized && is_uppercase(&text) && text.chars().count() >= MIN_LEN)
        .then(|| title_case(&text))
}

/// Inline content before the first `br`, leaving out emphasized parts
fn dish_name(p: &ElementRef) -> Option<String> {
    let mut pieces = Vec::new();
    for child in p.children() {
        match child.value() {
            Node::Element(e) if e.name() == "br" => break,
            Node::Element(e) if is_emphasis(e.name()) => {}
            Node::Text(t) => pieces.push(String::from(&**t)),
            Node::Element(_) => pieces.extend(ElementRef::wrap(child).map(|e| raw_text(&e))),
            _ => {}
        }
    }

    let name = reduce_whitespace(&pieces.join(" "));
    (!is_uppercase(&name) && name.chars().count() >= MIN_LEN).then_some(name)
}

pub fn parse_menu_html(html: &str, meal_type: MealType, price: Option<u32>) -> MealMenu {
    let doc = Html::parse_fragment(html);
    let mut menu = MealMenu::new(meal_type, price);
    let mut current: Option<Course> = None;

    for p in doc.select(&SEL_PARAGRAPH) {
        if element_text(&p).is_empty() {
            continue;
        }
        if let Some(name) = heading(&p) {
            if let Some(done) = current.replace(Course::new(&name)) {
                if !done.is_empty() {
                    menu.courses.push(done);
                }
            }
            continue;
        }
        if let (Some(course), Some(dish)) = (current.as_mut(), dish_name(&p)) {
            course.options.push(dish);
        }
    }

    if let Some(done) = current.filter(|c| !c.is_empty()) {
        menu.courses.push(done);
    }
    menu
}
