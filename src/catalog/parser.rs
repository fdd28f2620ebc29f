//! HTML parser for Edelweiss result rows, the BISAC popover and Hachette
//! catalog listings.

use crate::catalog::models::{BookRecord, CatalogEntry};
use crate::catalog::selectors::{hachette, popover, row};
use crate::extract::field::{inner_text, Normalize};
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Parser for catalog HTML snapshots.
///
/// Works on outer-HTML snapshots taken from the live page, so parsing never
/// holds a DOM handle across an await point.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Extracts every row-level field. Reveal-dependent fields (`bisac`,
    /// `summary`) are left empty.
    pub fn parse_row(&self, html: &str) -> BookRecord {
        let fragment = Html::parse_fragment(html);
        let root = fragment.root_element();

        let record = BookRecord {
            title: row::TITLE.resolve(root),
            subtitle: row::SUBTITLE.resolve(root),
            author: row::AUTHOR.resolve(root),
            isbn: row::ISBN.resolve(root),
            cover: row::COVER.resolve(root),
            pub_info: row::PUB_INFO.resolve(root),
            format_price: row::FORMAT_PRICE.resolve(root),
            discount_code: row::DISCOUNT_CODE.resolve(root),
            bisac: Vec::new(),
            related_products: row::RELATED_PRODUCTS.resolve(root),
            pages: row::PAGES.resolve(root),
            dimensions: row::DIMENSIONS.resolve(root),
            status: row::STATUS.resolve(root),
            sales_rights: row::SALES_RIGHTS.resolve(root),
            honors: row::HONORS.resolve_all(root),
            community: row::COMMUNITY.resolve_all(root),
            summary: None,
        };

        trace!("Parsed row: {:?}", record.title);
        record
    }

    /// Reads the BISAC categories out of a popover snapshot, skipping the
    /// header entry.
    pub fn parse_popover(&self, html: &str) -> Vec<String> {
        let fragment = Html::parse_fragment(html);

        fragment
            .select(&popover::ITEM)
            .skip(1)
            .filter_map(|li| Normalize::Collapse.apply(&inner_text(li)))
            .collect()
    }

    /// Reads every priced title out of a Hachette catalog page, in page
    /// order. Entries without a title, ISBN or price are skipped, as are
    /// repeated ISBNs.
    pub fn parse_catalog(&self, html: &str) -> Vec<CatalogEntry> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for li in document.select(&hachette::ENTRY) {
            let Some(title) = hachette::TITLE.resolve(li) else {
                continue;
            };
            let details = hachette::DETAILS.resolve(li).unwrap_or_default();

            let (Some(isbn), Some(price)) =
                (hachette::ISBN.find(&details), hachette::PRICE.find(&details))
            else {
                trace!("Skipping unpriced entry: {}", title);
                continue;
            };

            if !seen.insert(isbn.as_str().to_string()) {
                continue;
            }

            entries.push(CatalogEntry {
                title,
                author: hachette::AUTHOR.resolve(li),
                isbn: isbn.as_str().to_string(),
                price: price.as_str().to_string(),
                format: hachette::FORMAT.find(&details).map(|m| m.as_str().to_string()),
                publication_date: hachette::DATE.find(&details).map(|m| m.as_str().to_string()),
                cover_url: hachette::COVER.resolve(li).map(absolute_cover),
            });
        }

        debug!("Parsed {} catalog entries", entries.len());
        entries
    }
}

/// Cover sources are protocol-relative on the catalog pages.
fn absolute_cover(src: String) -> String {
    if src.starts_with("http") {
        src
    } else {
        format!("https:{}", src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"
        <div class="productRowBody___XM7bE">
          <div class="titleContainer___zhygQ">
            <p class="titleName___t0XBl">The Lost
              Library</p>
            <span class="subTitleName___TmSIq">A Novel</span>
          </div>
          <div class="contributors___aB12c">Rebecca Stead, Wendy Mass</div>
          <img alt="Cover for The Lost Library" src="https://csimg.edelweiss.plus/9781250881502.jpg">
          <div class="dotDot"><span>Feiwel &amp; Friends</span> <span>9781250881502</span></div>
          <div class="dotDot">Pub Date: 5/2/2023</div>
          <div class="dotDot">Hardcover $17.99</div>
          <div class="dotDot"><span>Discount Code: TR</span></div>
          <div class="dotDot">Status: Available</div>
          <div class="related-products-container"><button>3 Related Products</button></div>
          <div class="biblioTwo___bgyhS">
            <div>Ages 8 to 12</div>
            <div>272 pages</div>
            <button>View Sales Rights</button>
          </div>
          <div class="biblioTwoItemContainer___QeMy0"><div>5.5 x 8.3 in</div><div>0.8 lb</div></div>
          <div class="dotDot flex"><img alt="Junior Library Guild Selection"><img alt="Indie Next List"></div>
          <div class="communityItemsRow___utLCU"><button>12 Reviews</button><button>Shelves</button></div>
          <button>BISAC</button>
        </div>
    "#;

    #[test]
    fn test_parse_row_all_fields() {
        let record = Parser::new().parse_row(ROW);

        assert_eq!(record.title.as_deref(), Some("The Lost Library"));
        assert_eq!(record.subtitle.as_deref(), Some("A Novel"));
        assert_eq!(record.author.as_deref(), Some("Rebecca Stead, Wendy Mass"));
        assert_eq!(record.isbn.as_deref(), Some("9781250881502"));
        assert_eq!(
            record.cover.as_deref(),
            Some("https://csimg.edelweiss.plus/9781250881502.jpg")
        );
        assert_eq!(record.pub_info.as_deref(), Some("Pub Date: 5/2/2023"));
        assert_eq!(record.format_price.as_deref(), Some("Hardcover $17.99"));
        assert_eq!(record.discount_code.as_deref(), Some("Discount Code: TR"));
        assert_eq!(record.related_products.as_deref(), Some("3 Related Products"));
        assert_eq!(record.pages.as_deref(), Some("272 pages"));
        assert_eq!(record.dimensions.as_deref(), Some("5.5 x 8.3 in"));
        assert_eq!(record.status.as_deref(), Some("Status: Available"));
        assert_eq!(record.sales_rights.as_deref(), Some("View Sales Rights"));
        assert_eq!(record.honors, vec!["Junior Library Guild Selection", "Indie Next List"]);
        assert_eq!(record.community, vec!["12 Reviews", "Shelves"]);
        assert!(record.bisac.is_empty());
        assert!(record.summary.is_none());
    }

    #[test]
    fn test_parse_row_empty_snapshot() {
        let record = Parser::new().parse_row("<div class=\"productRowBody___XM7bE\"></div>");
        assert!(record.is_blank());
    }

    #[test]
    fn test_parse_row_uses_fallback_classes() {
        let html = r#"
            <div class="productRowBody___Zz9">
              <div class="biblioTwo___new1"><div>320 pages</div></div>
              <div class="communityItemsRow___new2"><button>Reviews</button></div>
            </div>
        "#;
        let record = Parser::new().parse_row(html);

        assert_eq!(record.pages.as_deref(), Some("320 pages"));
        assert_eq!(record.community, vec!["Reviews"]);
        assert!(record.title.is_none());
    }

    #[test]
    fn test_parse_popover_skips_header() {
        let html = r#"
            <div class="MuiPopover-paper">
              <ul>
                <li>BISAC Subjects</li>
                <li>JUVENILE FICTION / Fantasy &amp; Magic</li>
                <li>  JUVENILE FICTION /
                      Books &amp; Libraries </li>
              </ul>
            </div>
        "#;

        assert_eq!(
            Parser::new().parse_popover(html),
            vec!["JUVENILE FICTION / Fantasy & Magic", "JUVENILE FICTION / Books & Libraries"]
        );
    }

    #[test]
    fn test_parse_catalog_entry() {
        let html = r#"
            <ul>
              <li>
                <img src="//images.hachette.co.nz/9781399630474.jpg">
                <h3> The Hollow Crown </h3>
                <p class="author">Jane Marlowe</p>
                <p class="details">
                  9781399630474 | $37.99 | Paperback - C Format | Feb 2026
                </p>
              </li>
              <li><a href="/catalogs">Back to catalogs</a></li>
            </ul>
        "#;

        let entries = Parser::new().parse_catalog(html);
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.title, "The Hollow Crown");
        assert_eq!(entry.author.as_deref(), Some("Jane Marlowe"));
        assert_eq!(entry.isbn, "9781399630474");
        assert_eq!(entry.price, "$37.99");
        assert_eq!(entry.format.as_deref(), Some("Paperback - C Format"));
        assert_eq!(entry.publication_date.as_deref(), Some("Feb 2026"));
        assert_eq!(
            entry.cover_url.as_deref(),
            Some("https://images.hachette.co.nz/9781399630474.jpg")
        );
    }

    #[test]
    fn test_parse_catalog_without_entries() {
        assert!(Parser::new().parse_catalog("<ul><li>Nothing listed yet</li></ul>").is_empty());
    }

    #[test]
    fn test_absolute_cover_keeps_full_urls() {
        assert_eq!(absolute_cover("https://a.test/c.jpg".to_string()), "https://a.test/c.jpg");
        assert_eq!(absolute_cover("//a.test/c.jpg".to_string()), "https://a.test/c.jpg");
    }

    #[test]
    fn test_parse_popover_header_only() {
        let html = r#"<div class="MuiPopover-paper"><ul><li>BISAC Subjects</li></ul></div>"#;
        assert!(Parser::new().parse_popover(html).is_empty());
    }
}
