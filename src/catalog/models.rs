//! Data models for lookup keys, book records and batch results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What a lookup key identifies. Only changes human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Isbn,
    Author,
}

impl KeyKind {
    /// Noun used in result messages.
    pub fn noun(self) -> &'static str {
        match self {
            KeyKind::Isbn => "ISBN",
            KeyKind::Author => "author",
        }
    }
}

/// A trimmed, non-empty lookup key (ISBN or author name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    /// Trims `raw`; returns `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ISBN when the key is 10 or 13 digits after dropping hyphens
    /// (ISBN-10 may end in `X`); anything else is an author or free text.
    pub fn kind(&self) -> KeyKind {
        let compact: Vec<char> = self.0.chars().filter(|c| *c != '-').collect();
        let is_isbn = match compact.len() {
            13 => compact.iter().all(char::is_ascii_digit),
            10 => {
                compact[..9].iter().all(char::is_ascii_digit)
                    && (compact[9].is_ascii_digit() || compact[9] == 'X' || compact[9] == 'x')
            }
            _ => false,
        };

        if is_isbn {
            KeyKind::Isbn
        } else {
            KeyKind::Author
        }
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome class of one lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    DataFound,
    NoDataFound,
    LoginFailed,
    Error,
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyStatus::DataFound => write!(f, "data_found"),
            KeyStatus::NoDataFound => write!(f, "no_data_found"),
            KeyStatus::LoginFailed => write!(f, "login_failed"),
            KeyStatus::Error => write!(f, "error"),
        }
    }
}

/// One catalog entry as shown in a search result row.
///
/// Every scalar is optional and list fields default to empty, so a record
/// with nothing extracted is still valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    /// Cover image URL
    pub cover: Option<String>,
    pub pub_info: Option<String>,
    pub format_price: Option<String>,
    pub discount_code: Option<String>,
    /// BISAC subject categories from the classification popover
    #[serde(default)]
    pub bisac: Vec<String>,
    pub related_products: Option<String>,
    pub pages: Option<String>,
    pub dimensions: Option<String>,
    /// Availability line ("Status: ...")
    pub status: Option<String>,
    pub sales_rights: Option<String>,
    #[serde(default)]
    pub honors: Vec<String>,
    #[serde(default)]
    pub community: Vec<String>,
    /// Description from the title side panel (authenticated runs only)
    pub summary: Option<String>,
}

impl BookRecord {
    /// True when no field was extracted at all.
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Result for a single lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResult {
    pub status: KeyStatus,
    pub message: String,
    #[serde(default)]
    pub books: Vec<BookRecord>,
}

impl KeyResult {
    pub fn found(key: &LookupKey, books: Vec<BookRecord>) -> Self {
        Self {
            status: KeyStatus::DataFound,
            message: format!("Found {} book(s) for {} {}", books.len(), key.kind().noun(), key),
            books,
        }
    }

    pub fn not_found(key: &LookupKey) -> Self {
        Self {
            status: KeyStatus::NoDataFound,
            message: format!("No results found on Edelweiss for {} {}", key.kind().noun(), key),
            books: Vec::new(),
        }
    }

    pub fn login_failed(key: &LookupKey) -> Self {
        Self {
            status: KeyStatus::LoginFailed,
            message: format!("Failed to login to Edelweiss for {} {}", key.kind().noun(), key),
            books: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: KeyStatus::Error, message: message.into(), books: Vec::new() }
    }
}

/// Aggregate counters over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_isbns_processed: usize,
    pub isbns_with_data: usize,
    pub isbns_without_data: usize,
    pub total_books_found: usize,
}

/// Complete output of a batch, keyed by lookup key in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub summary: Summary,
    pub results_by_isbn: IndexMap<String, KeyResult>,
}

impl BatchResult {
    /// Computes the summary for a batch of `total_keys` keys.
    pub fn summarize(&self, total_keys: usize) -> Summary {
        let with_data = self
            .results_by_isbn
            .values()
            .filter(|r| r.status == KeyStatus::DataFound)
            .count();

        Summary {
            total_isbns_processed: total_keys,
            isbns_with_data: with_data,
            isbns_without_data: total_keys.saturating_sub(with_data),
            total_books_found: self.results_by_isbn.values().map(|r| r.books.len()).sum(),
        }
    }

    /// Number of keys per status, in status order.
    pub fn status_counts(&self) -> [(KeyStatus, usize); 4] {
        [KeyStatus::DataFound, KeyStatus::NoDataFound, KeyStatus::LoginFailed, KeyStatus::Error]
            .map(|status| {
                (status, self.results_by_isbn.values().filter(|r| r.status == status).count())
            })
    }
}

/// One title listed in a Hachette trade catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub author: Option<String>,
    pub isbn: String,
    /// As printed, e.g. `$37.99`
    pub price: String,
    pub format: Option<String>,
    /// Month and year, e.g. `Jan 2026`
    pub publication_date: Option<String>,
    pub cover_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> LookupKey {
        LookupKey::new(raw).unwrap()
    }

    #[test]
    fn test_lookup_key_trims() {
        assert_eq!(key("  9780000000001\n").as_str(), "9780000000001");
        assert!(LookupKey::new("   ").is_none());
        assert!(LookupKey::new("").is_none());
    }

    #[test]
    fn test_lookup_key_kind() {
        assert_eq!(key("9780000000001").kind(), KeyKind::Isbn);
        assert_eq!(key("978-0-00-000000-1").kind(), KeyKind::Isbn);
        assert_eq!(key("080442957X").kind(), KeyKind::Isbn);
        assert_eq!(key("0804429570").kind(), KeyKind::Isbn);
        assert_eq!(key("Ursula K. Le Guin").kind(), KeyKind::Author);
        assert_eq!(key("97800000000").kind(), KeyKind::Author);
        assert_eq!(key("X804429570").kind(), KeyKind::Author);
    }

    #[test]
    fn test_key_result_messages() {
        let isbn = key("9780000000001");
        let author = key("Ann Patchett");

        assert_eq!(
            KeyResult::found(&isbn, vec![BookRecord::default(); 2]).message,
            "Found 2 book(s) for ISBN 9780000000001"
        );
        assert_eq!(
            KeyResult::not_found(&isbn).message,
            "No results found on Edelweiss for ISBN 9780000000001"
        );
        assert_eq!(
            KeyResult::login_failed(&author).message,
            "Failed to login to Edelweiss for author Ann Patchett"
        );
        assert_eq!(KeyResult::error("boom").status, KeyStatus::Error);
        assert!(KeyResult::not_found(&isbn).books.is_empty());
    }

    #[test]
    fn test_book_record_serializes_camel_case() {
        let record = BookRecord {
            pub_info: Some("Pub Date: 3/4/2025".to_string()),
            format_price: Some("Hardcover $28.00".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["pubInfo"], "Pub Date: 3/4/2025");
        assert_eq!(json["formatPrice"], "Hardcover $28.00");
        assert!(json["summary"].is_null());
        assert_eq!(json["bisac"], serde_json::json!([]));
        assert!(json.get("salesRights").is_some());
    }

    #[test]
    fn test_blank_record() {
        assert!(BookRecord::default().is_blank());
        let record = BookRecord { honors: vec!["Indie Next".to_string()], ..Default::default() };
        assert!(!record.is_blank());
    }

    #[test]
    fn test_key_status_serde() {
        assert_eq!(serde_json::to_string(&KeyStatus::NoDataFound).unwrap(), "\"no_data_found\"");
        let parsed: KeyStatus = serde_json::from_str("\"login_failed\"").unwrap();
        assert_eq!(parsed, KeyStatus::LoginFailed);
        assert_eq!(KeyStatus::DataFound.to_string(), "data_found");
    }

    #[test]
    fn test_summarize() {
        let mut batch = BatchResult::default();
        let a = key("9780000000001");
        let b = key("9780000000002");
        let c = key("9780000000003");

        batch.results_by_isbn.insert(
            a.to_string(),
            KeyResult::found(&a, vec![BookRecord::default(), BookRecord::default()]),
        );
        batch.results_by_isbn.insert(b.to_string(), KeyResult::not_found(&b));
        batch.results_by_isbn.insert(c.to_string(), KeyResult::error("timeout"));

        let summary = batch.summarize(3);
        assert_eq!(summary.total_isbns_processed, 3);
        assert_eq!(summary.isbns_with_data, 1);
        assert_eq!(summary.isbns_without_data, 2);
        assert_eq!(summary.total_books_found, 2);

        let counts = batch.status_counts();
        assert_eq!(counts[0], (KeyStatus::DataFound, 1));
        assert_eq!(counts[3], (KeyStatus::Error, 1));
    }

    #[test]
    fn test_catalog_entry_serializes_missing_fields_as_null() {
        let entry = CatalogEntry {
            title: "The Women".to_string(),
            author: None,
            isbn: "9781250178633".to_string(),
            price: "$37.99".to_string(),
            format: Some("Paperback".to_string()),
            publication_date: None,
            cover_url: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["publication_date"], serde_json::Value::Null);
        assert_eq!(json["format"], "Paperback");
        assert_eq!(json["isbn"], "9781250178633");
    }

    #[test]
    fn test_batch_result_preserves_order() {
        let mut batch = BatchResult::default();
        for raw in ["9780000000003", "9780000000001", "9780000000002"] {
            let k = key(raw);
            batch.results_by_isbn.insert(k.to_string(), KeyResult::not_found(&k));
        }

        let json = serde_json::to_string(&batch).unwrap();
        let parsed: BatchResult = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = parsed.results_by_isbn.keys().collect();
        assert_eq!(keys, vec!["9780000000003", "9780000000001", "9780000000002"]);
        assert!(json.find("summary").unwrap() < json.find("results_by_isbn").unwrap());
    }
}
