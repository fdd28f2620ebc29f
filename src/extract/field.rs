//! Ordered-candidate field resolution over a parsed row snapshot.
//!
//! A [`FieldSpec`] lists [`Locator`]s in priority order. Resolution tries them
//! in turn and returns the first non-empty normalized value; running out of
//! candidates means the field is absent, which is not an error.

use regex_lite::Regex;
use scraper::{ElementRef, Node, Selector};
use std::collections::HashSet;

/// Elements whose boundaries separate words in rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Rendered-text approximation of an element: text nodes in document order,
/// with block element boundaries turned into spaces.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(element, &mut out);
    out
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let block = BLOCK_ELEMENTS.contains(&el.name());
                if block {
                    out.push(' ');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_text(child_el, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// What to read from a matched element.
#[derive(Debug, Clone)]
pub enum Pick {
    Text,
    Attr(&'static str),
}

/// Filter over the elements a locator's selector matches.
#[derive(Debug, Clone)]
pub enum Predicate {
    Any,
    /// Element text contains a label.
    Contains(&'static str),
    /// Element text matches a pattern.
    Matches(Regex),
    /// Only the n-th match (zero-based).
    Nth(usize),
}

/// Whitespace handling applied to extracted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Newlines and runs of whitespace become single spaces, then trim.
    Collapse,
    Trim,
}

impl Normalize {
    /// Normalizes `raw`; empty results become `None`.
    pub fn apply(self, raw: &str) -> Option<String> {
        let value = match self {
            Normalize::Collapse => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Normalize::Trim => raw.trim().to_string(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// One candidate way of finding a field inside a row.
#[derive(Debug, Clone)]
pub struct Locator {
    selector: Selector,
    predicate: Predicate,
    innermost: bool,
    pick: Pick,
}

impl Locator {
    pub fn new(selector: Selector) -> Self {
        Self { selector, predicate: Predicate::Any, innermost: false, pick: Pick::Text }
    }

    pub fn contains(mut self, label: &'static str) -> Self {
        self.predicate = Predicate::Contains(label);
        self
    }

    pub fn matches(mut self, pattern: Regex) -> Self {
        self.predicate = Predicate::Matches(pattern);
        self
    }

    pub fn nth(mut self, n: usize) -> Self {
        self.predicate = Predicate::Nth(n);
        self
    }

    /// Drops matches that contain another surviving match, so a label is
    /// read from its tightest wrapper rather than an enclosing container.
    pub fn innermost(mut self) -> Self {
        self.innermost = true;
        self
    }

    pub fn attr(mut self, name: &'static str) -> Self {
        self.pick = Pick::Attr(name);
        self
    }

    /// Matching elements under `root`, in document order.
    fn candidates<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let matched: Vec<ElementRef<'a>> = match &self.predicate {
            Predicate::Any => root.select(&self.selector).collect(),
            Predicate::Contains(label) => {
                root.select(&self.selector).filter(|e| inner_text(*e).contains(label)).collect()
            }
            Predicate::Matches(pattern) => {
                root.select(&self.selector).filter(|e| pattern.is_match(&inner_text(*e))).collect()
            }
            Predicate::Nth(n) => root.select(&self.selector).nth(*n).into_iter().collect(),
        };

        if !self.innermost {
            return matched;
        }

        let ids: HashSet<_> = matched.iter().map(|e| e.id()).collect();
        matched
            .iter()
            .copied()
            .filter(|e| !e.descendants().skip(1).any(|d| ids.contains(&d.id())))
            .collect()
    }

    fn value(&self, element: ElementRef<'_>) -> Option<String> {
        match self.pick {
            Pick::Text => Some(inner_text(element)),
            Pick::Attr(name) => element.value().attr(name).map(String::from),
        }
    }
}

/// How to extract one field from a row.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    candidates: Vec<Locator>,
    normalize: Normalize,
}

impl FieldSpec {
    pub fn new(name: &'static str, candidates: Vec<Locator>) -> Self {
        Self { name, candidates, normalize: Normalize::Collapse }
    }

    pub fn normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    /// First non-empty value over the candidates, in order.
    pub fn resolve(&self, root: ElementRef<'_>) -> Option<String> {
        self.candidates.iter().find_map(|locator| {
            locator
                .candidates(root)
                .into_iter()
                .find_map(|e| locator.value(e).and_then(|v| self.normalize.apply(&v)))
        })
    }

    /// Every non-empty value of the first candidate that yields any.
    pub fn resolve_all(&self, root: ElementRef<'_>) -> Vec<String> {
        for locator in &self.candidates {
            let values: Vec<String> = locator
                .candidates(root)
                .into_iter()
                .filter_map(|e| locator.value(e).and_then(|v| self.normalize.apply(&v)))
                .collect();
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn test_inner_text_separates_blocks() {
        let html = Html::parse_fragment("<div><div>Pub Date:</div><div>3/4/2025</div></div>");
        let text = inner_text(html.root_element());
        assert_eq!(Normalize::Collapse.apply(&text).unwrap(), "Pub Date: 3/4/2025");

        let html = Html::parse_fragment("<p><b>Fic</b>tion</p>");
        assert_eq!(inner_text(html.root_element()).trim(), "Fiction");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(Normalize::Collapse.apply("  a\n\n b\r\n c  ").unwrap(), "a b c");
        assert_eq!(Normalize::Trim.apply("  a\n b ").unwrap(), "a\n b");
        assert!(Normalize::Collapse.apply(" \n ").is_none());
    }

    #[test]
    fn test_first_candidate_wins() {
        let html = Html::parse_fragment(r#"<p class="a">first</p><p class="b">second</p>"#);
        let spec = FieldSpec::new(
            "title",
            vec![Locator::new(sel("p.b")), Locator::new(sel("p.a"))],
        );
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "second");

        let spec = FieldSpec::new(
            "title",
            vec![Locator::new(sel("p.missing")), Locator::new(sel("p.a"))],
        );
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "first");
    }

    #[test]
    fn test_empty_candidate_falls_through() {
        let html = Html::parse_fragment(r#"<p class="a">   </p><p class="b">value</p>"#);
        let spec = FieldSpec::new("x", vec![Locator::new(sel("p.a")), Locator::new(sel("p.b"))]);
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "value");
    }

    #[test]
    fn test_exhaustion_is_absent() {
        let html = Html::parse_fragment("<p>text</p>");
        let spec = FieldSpec::new("x", vec![Locator::new(sel("span"))]);
        assert!(spec.resolve(html.root_element()).is_none());
        assert!(spec.resolve_all(html.root_element()).is_empty());
    }

    #[test]
    fn test_contains_predicate() {
        let html = Html::parse_fragment(
            r#"<div class="dotDot">Hardcover</div><div class="dotDot">Pub Date: 3/4/2025</div>"#,
        );
        let spec = FieldSpec::new("pubInfo", vec![Locator::new(sel("div.dotDot")).contains("Pub Date")]);
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "Pub Date: 3/4/2025");
    }

    #[test]
    fn test_matches_predicate() {
        let html = Html::parse_fragment(
            r#"<div class="dotDot"><span>Penguin</span><span>9780593655030</span></div>"#,
        );
        let spec = FieldSpec::new(
            "isbn",
            vec![Locator::new(sel("div.dotDot span")).matches(Regex::new(r"\d{10,13}").unwrap())],
        );
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "9780593655030");
    }

    #[test]
    fn test_nth_predicate() {
        let html = Html::parse_fragment("<div>6.2 x 9.3 in</div><div>1.2 lb</div>");
        let first = FieldSpec::new("dims", vec![Locator::new(sel("div")).nth(0)]);
        let second = FieldSpec::new("dims", vec![Locator::new(sel("div")).nth(1)]);
        let third = FieldSpec::new("dims", vec![Locator::new(sel("div")).nth(2)]);

        assert_eq!(first.resolve(html.root_element()).unwrap(), "6.2 x 9.3 in");
        assert_eq!(second.resolve(html.root_element()).unwrap(), "1.2 lb");
        assert!(third.resolve(html.root_element()).is_none());
    }

    #[test]
    fn test_innermost_skips_containers() {
        let html = Html::parse_fragment(
            r#"<div class="outer"><div>Hardcover</div><div class="code">Discount Code: TRADE</div></div>"#,
        );
        let broad = FieldSpec::new("discountCode", vec![Locator::new(sel("div")).contains("Discount Code")]);
        let tight = FieldSpec::new(
            "discountCode",
            vec![Locator::new(sel("div")).contains("Discount Code").innermost()],
        );

        assert_eq!(broad.resolve(html.root_element()).unwrap(), "Hardcover Discount Code: TRADE");
        assert_eq!(tight.resolve(html.root_element()).unwrap(), "Discount Code: TRADE");
    }

    #[test]
    fn test_attr_pick() {
        let html = Html::parse_fragment(
            r#"<img alt="Cover for Tomorrow" src="https://covers.example/1.jpg"><img alt="x">"#,
        );
        let spec = FieldSpec::new("cover", vec![Locator::new(sel(r#"img[alt^="Cover for"]"#)).attr("src")]);
        assert_eq!(spec.resolve(html.root_element()).unwrap(), "https://covers.example/1.jpg");
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let html = Html::parse_fragment(
            r#"<div class="row"><button> Reviews
            (4) </button><button></button><button>Shelves</button></div>"#,
        );
        let spec = FieldSpec::new("community", vec![Locator::new(sel("button"))]);
        assert_eq!(spec.resolve_all(html.root_element()), vec!["Reviews (4)", "Shelves"]);
    }

    #[test]
    fn test_resolve_all_falls_back() {
        let html = Html::parse_fragment(r#"<div class="items"><button>Reviews</button></div>"#);
        let spec = FieldSpec::new(
            "community",
            vec![Locator::new(sel(".missing button")), Locator::new(sel(".items button"))],
        );
        assert_eq!(spec.resolve_all(html.root_element()), vec!["Reviews"]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let html = Html::parse_fragment(r#"<p class="a">one</p><p class="a">two</p>"#);
        let spec = FieldSpec::new("x", vec![Locator::new(sel("p.a"))]);
        let first = spec.resolve(html.root_element());
        for _ in 0..5 {
            assert_eq!(spec.resolve(html.root_element()), first);
        }
        assert_eq!(first.unwrap(), "one");
    }
}
