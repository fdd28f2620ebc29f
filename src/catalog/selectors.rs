//! Selectors for the Edelweiss catalog pages and the Hachette trade catalog.
//!
//! Everything that knows either site's markup lives here. The site ships
//! hashed CSS-module class names (`productRowBody___XM7bE`), so most field
//! specs pair the exact class with a looser `[class*=...]` fallback.
//!
//! **Update process**: when extraction starts returning blanks, capture a
//! result row's HTML, update the candidates, and refresh the test fixture.

use crate::browser::Target;
use crate::extract::field::{FieldSpec, Locator, Normalize};
use regex_lite::Regex;
use scraper::Selector;
use std::sync::LazyLock;

fn css(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap()
}

fn targets(selectors: &[&str]) -> Vec<Target> {
    selectors.iter().map(|s| Target::css(*s)).collect()
}

/// Search page.
pub mod search {
    /// Keyword search box; also the landmark for a usable dashboard.
    pub const INPUT: &str = r#"input[name="keywords"]"#;

    /// One result row.
    pub const ROW: &str = "div.productRowBody___XM7bE";
}

/// Login form.
pub mod login {
    use super::*;

    pub const SECTION: &str = "section.login, .login-form, form#login-form";

    /// Present once a login went through.
    pub const LANDMARK: &str = r#"input[name="keywords"], .dashboard, [class*="dashboard"]"#;

    pub static EMAIL: LazyLock<Vec<Target>> = LazyLock::new(|| {
        targets(&[
            r#"input[name="email"]"#,
            r#"input[type="text"][placeholder*="Email"]"#,
            r#"input[type="email"]"#,
            r#"input[placeholder*="email" i]"#,
            r#"input[id*="email" i]"#,
        ])
    });

    pub static PASSWORD: LazyLock<Vec<Target>> = LazyLock::new(|| {
        targets(&[
            r#"input[name="pword"]"#,
            r#"input[type="password"]"#,
            r#"input[name="password"]"#,
            r#"input[placeholder*="password" i]"#,
            r#"input[id*="password" i]"#,
        ])
    });

    pub static SUBMIT: LazyLock<Vec<Target>> = LazyLock::new(|| {
        vec![
            Target::css(r#"button[type="submit"]"#),
            Target::css("button").with_text("Sign In"),
            Target::css(r#"input[type="submit"]"#),
            Target::css("button").with_text("Log in"),
            Target::css("button").with_text("Login"),
            Target::css("button").with_text("Sign in"),
        ]
    });
}

/// BISAC classification popover.
pub mod popover {
    use super::*;

    pub const TRIGGER: &str = "button";
    pub const TRIGGER_TEXT: &str = "BISAC";
    pub const CONTAINER: &str = "div.MuiPopover-paper";

    /// Popover entries; the first one is a header.
    pub static ITEM: LazyLock<Selector> = LazyLock::new(|| css("li"));
}

/// Title side panel carrying the summary.
pub mod panel {
    /// Clickable title elements inside a row, in priority order.
    pub const TITLE_TRIGGERS: &[&str] = &[
        ".titleContainer___zhygQ span.subTitleName___TmSIq",
        ".titleContainer___zhygQ p.titleName___t0XBl",
        ".titleContainer___zhygQ a",
        r#"a[class*="title"]"#,
        r#"a[id*="title"]"#,
    ];

    pub const LANDMARK: &str =
        r#"[class*="Panel"], [class*="Modal"], [class*="Drawer"], [class*="Sidebar"]"#;

    /// Expands the collapsed description.
    pub const CONTENT_BUTTON: &str = r#"button[aria-label="Content"]"#;

    /// Places the description is usually found, most specific first.
    pub const SUMMARY_CANDIDATES: &[&str] = &[
        r#"div[role="tabpanel"][id*="title-references-tabpanel"] div.MuiBox-root.css-old1by div p"#,
        r#"div[role="tabpanel"][id*="title-references-tabpanel"] div.MuiBox-root div p"#,
        r#"div[role="tabpanel"][id*="title-references-tabpanel"] div p"#,
        r#"div[role="tabpanel"]:not([hidden]) div.MuiBox-root.css-old1by div p"#,
        r#"div[role="tabpanel"]:not([hidden]) div.MuiBox-root div p"#,
        r#"div[role="tabpanel"]:not([hidden]) div p"#,
        r#"div[role="tabpanel"]:not([hidden]) *"#,
        r#"div[role="tabpanel"] *"#,
        ".mainContent___KncIm div.MuiBox-root.css-old1by div p",
        ".mainContent___KncIm div.MuiBox-root div p",
        ".mainContent___KncIm div p",
        ".rightPanel___Cl_TH .mainContent___KncIm *",
        ".mainContent___KncIm *",
        ".rightPanel___Cl_TH p",
        ".mainContent___KncIm p",
        r#"div[class*="content"] p"#,
        r#"div[class*="summary"] p"#,
        r#"div[class*="description"] p"#,
        r#"div[class*="expandable"] p"#,
        r#"div[class*="collapsible"] p"#,
        r#"[class*="content"] *"#,
        r#"[class*="description"] *"#,
        r#"[class*="summary"] *"#,
        "p",
        "div p",
    ];

    /// Whole-document scan used when no candidate qualifies.
    pub const FALLBACK_SCAN: &[&str] = &["p", "article", "section", "div"];

    /// Minimum length of a candidate description.
    pub const MIN_SUMMARY_CHARS: usize = 100;

    /// Minimum length of a fallback description.
    pub const MIN_FALLBACK_CHARS: usize = 200;

    /// Interface phrases that disqualify a block of text.
    pub const BOILERPLATE_PHRASES: &[&str] = &["narrow your results", "type here to find"];

    /// Interface words that disqualify a block of text when standing alone.
    pub const BOILERPLATE_WORDS: &str = r"\b(click|button|tab|menu)\b";

    /// Words typical of a publisher description.
    pub const PUBLISHING_TERMS: &[&str] =
        &["novel", "story", "character", "author", "book", "published", "review", "critic"];
}

/// Field specs for one result row.
pub mod row {
    use super::*;

    pub static TITLE: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("title", vec![Locator::new(css(r#"p[class*="titleName"]"#))])
    });

    pub static SUBTITLE: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("subtitle", vec![Locator::new(css(r#"span[class*="subTitleName"]"#))])
    });

    pub static AUTHOR: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("author", vec![Locator::new(css(r#"div[class*="contributors"]"#))])
    });

    pub static ISBN: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "isbn",
            vec![Locator::new(css("div.dotDot span")).matches(pattern(r"\d{10,13}"))],
        )
    });

    pub static COVER: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("cover", vec![Locator::new(css(r#"img[alt^="Cover for"]"#)).attr("src")])
    });

    pub static PUB_INFO: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("pubInfo", vec![Locator::new(css("div.dotDot")).contains("Pub Date")])
    });

    pub static FORMAT_PRICE: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("formatPrice", vec![Locator::new(css("div.dotDot")).matches(pattern(r"\$|Trade"))])
    });

    pub static DISCOUNT_CODE: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "discountCode",
            vec![
                Locator::new(css("div.dotDot")).contains("Discount Code").innermost(),
                Locator::new(css("span")).contains("Discount Code").innermost(),
                Locator::new(css("div")).contains("Discount Code").innermost(),
            ],
        )
    });

    pub static RELATED_PRODUCTS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "relatedProducts",
            vec![Locator::new(css(".related-products-container button"))],
        )
    });

    pub static PAGES: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "pages",
            vec![
                Locator::new(css(".biblioTwo___bgyhS div")).matches(pattern(r"\d+\s+pages")),
                Locator::new(css(r#"[class*="biblioTwo"] div"#)).matches(pattern(r"\d+\s+pages")),
            ],
        )
    });

    pub static DIMENSIONS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "dimensions",
            vec![
                Locator::new(css(".biblioTwoItemContainer___QeMy0 div")).nth(0),
                Locator::new(css(r#"[class*="biblioTwoItemContainer"] div"#)).nth(0),
            ],
        )
    });

    pub static STATUS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("status", vec![Locator::new(css("div.dotDot")).contains("Status:")])
    });

    pub static SALES_RIGHTS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "salesRights",
            vec![
                Locator::new(css(".biblioTwo___bgyhS button")).contains("View"),
                Locator::new(css(r#"[class*="biblioTwo"] button"#)).contains("View"),
            ],
        )
    });

    pub static HONORS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("honors", vec![Locator::new(css(".dotDot.flex img")).attr("alt")])
    });

    pub static COMMUNITY: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new(
            "community",
            vec![
                Locator::new(css(".communityItemsRow___utLCU button")),
                Locator::new(css(r#"[class*="communityItemsRow"] button"#)),
            ],
        )
    });
}

/// Hachette trade catalog: customer-number login, catalog links and the
/// catalog listing.
pub mod hachette {
    use super::*;

    /// Customer number input, most specific first.
    pub static CUSTOMER_INPUT: LazyLock<Vec<Target>> = LazyLock::new(|| {
        targets(&[
            r#"input[type="text"]"#,
            r#"input[name*="customer"]"#,
            r#"input[name*="number"]"#,
            r#"input[id*="customer"]"#,
            r#"input[id*="number"]"#,
            r#"input[placeholder*="customer"]"#,
            r#"input[placeholder*="number"]"#,
            "input",
        ])
    });

    pub static SUBMIT: LazyLock<Vec<Target>> = LazyLock::new(|| {
        vec![
            Target::css(r#"button[type="submit"]"#),
            Target::css(r#"input[type="submit"]"#),
            Target::css("button").with_text("Log in"),
            Target::css("button").with_text("Login"),
            Target::css("button").with_text("Submit"),
            Target::css("button"),
        ]
    });

    /// Catalog links on the landing page, matched by their text.
    pub const LINK: &str = "a";

    pub const DOCUMENT_TITLE: &str = "title";

    /// One catalog listing entry.
    pub static ENTRY: LazyLock<Selector> = LazyLock::new(|| css("li"));

    pub static TITLE: LazyLock<FieldSpec> =
        LazyLock::new(|| FieldSpec::new("title", vec![Locator::new(css("h3"))]));

    pub static AUTHOR: LazyLock<FieldSpec> =
        LazyLock::new(|| FieldSpec::new("author", vec![Locator::new(css("p.author"))]));

    /// ISBN, price, format and date on one line; line breaks are kept.
    pub static DETAILS: LazyLock<FieldSpec> = LazyLock::new(|| {
        FieldSpec::new("details", vec![Locator::new(css("p.details"))]).normalize(Normalize::Trim)
    });

    pub static COVER: LazyLock<FieldSpec> =
        LazyLock::new(|| FieldSpec::new("cover", vec![Locator::new(css("img")).attr("src")]));

    pub static ISBN: LazyLock<Regex> = LazyLock::new(|| pattern(r"97[89]\d{10}"));
    pub static PRICE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\$\d+\.\d+"));
    pub static FORMAT: LazyLock<Regex> =
        LazyLock::new(|| pattern(r"(Paperback|Hardback)(?:\s*-\s*[A-Z]\s*Format)?"));
    pub static DATE: LazyLock<Regex> = LazyLock::new(|| {
        pattern(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{4}")
    });
}
