//! Output formatting for batch results and catalog downloads (table, JSON,
//! markdown, CSV).

use crate::catalog::{BatchResult, BookRecord, CatalogEntry, KeyResult, KeyStatus};
use crate::config::OutputFormat;
use std::path::Path;

/// Formats batch results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a finished (or partial) batch.
    pub fn format_batch(&self, batch: &BatchResult) -> String {
        if batch.results_by_isbn.is_empty() {
            return match self.format {
                OutputFormat::Json => self.json_batch(batch),
                OutputFormat::Csv => Self::csv_header(),
                _ => "No keys processed.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_batch(batch),
            OutputFormat::Table => self.table_batch(batch),
            OutputFormat::Markdown => self.markdown_batch(batch),
            OutputFormat::Csv => self.csv_batch(batch),
        }
    }

    /// Formats progress of a results file, as read mid-run.
    pub fn format_progress(&self, batch: &BatchResult, path: &Path) -> String {
        let completed = batch.results_by_isbn.len();
        let books: usize = batch.results_by_isbn.values().map(|r| r.books.len()).sum();
        let finalized = batch.summary.total_isbns_processed > 0;

        if self.format == OutputFormat::Json {
            let counts: serde_json::Map<String, serde_json::Value> = batch
                .status_counts()
                .iter()
                .map(|(status, n)| (status.to_string(), serde_json::Value::from(*n)))
                .collect();

            let progress = serde_json::json!({
                "file": path.display().to_string(),
                "finalized": finalized,
                "keys_completed": completed,
                "books_found": books,
                "statuses": counts,
            });
            return serde_json::to_string_pretty(&progress).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = Vec::new();
        lines.push(format!("File:      {}", path.display()));
        lines.push(format!(
            "State:     {}",
            if finalized { "finalized" } else { "in progress" }
        ));
        lines.push(format!("Completed: {} key(s)", completed));
        for (status, n) in batch.status_counts() {
            if n > 0 {
                lines.push(format!("  {:<14} {}", status.to_string(), n));
            }
        }
        lines.push(format!("Books:     {}", books));

        if let Some((key, result)) = batch.results_by_isbn.last() {
            lines.push(format!("Last:      {} ({})", key, result.status));
        }

        lines.join("\n")
    }

    /// Formats a downloaded trade catalog.
    pub fn format_catalog(&self, entries: &[CatalogEntry]) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => self.csv_catalog(entries),
            _ if entries.is_empty() => "No catalog entries found.".to_string(),
            OutputFormat::Table => self.table_catalog(entries),
            OutputFormat::Markdown => self.markdown_catalog(entries),
        }
    }

    // JSON formatting

    fn json_batch(&self, batch: &BatchResult) -> String {
        serde_json::to_string_pretty(batch).unwrap_or_else(|_| "{}".to_string())
    }

    // Table formatting

    fn table_batch(&self, batch: &BatchResult) -> String {
        let key_width = batch.results_by_isbn.keys().map(|k| k.chars().count()).max().unwrap_or(3).max(3);
        let status_width = 13;
        let books_width = 5;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<key_width$}  {:<status_width$}  {:>books_width$}  {}",
            "Key", "Status", "Books", "Message"
        ));
        lines.push(format!(
            "{:-<key_width$}  {:-<status_width$}  {:->books_width$}  {:-<40}",
            "", "", "", ""
        ));

        for (key, result) in &batch.results_by_isbn {
            lines.push(format!(
                "{:<key_width$}  {:<status_width$}  {:>books_width$}  {}",
                key,
                result.status.to_string(),
                result.books.len(),
                result.message
            ));
        }

        let found: Vec<(&String, &KeyResult)> =
            batch.results_by_isbn.iter().filter(|(_, r)| !r.books.is_empty()).collect();

        if !found.is_empty() {
            lines.push(String::new());
            lines.push("Books:".to_string());
            for (key, result) in found {
                for book in &result.books {
                    lines.push(format!("  {}  {}", key, Self::book_line(book)));
                }
            }
        }

        lines.push(String::new());
        lines.push(Self::totals(batch));

        lines.join("\n")
    }

    fn table_catalog(&self, entries: &[CatalogEntry]) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{:<13}  {:>8}  {:<40}  {}", "ISBN", "Price", "Title", "Author"));
        lines.push(format!("{:-<13}  {:->8}  {:-<40}  {:-<20}", "", "", "", ""));

        for entry in entries {
            lines.push(format!(
                "{:<13}  {:>8}  {:<40}  {}",
                entry.isbn,
                entry.price,
                truncate(&entry.title, 40),
                entry.author.as_deref().map(|a| truncate(a, 30)).unwrap_or_default()
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} title(s)", entries.len()));
        lines.join("\n")
    }

    fn book_line(book: &BookRecord) -> String {
        let title = truncate(book.title.as_deref().unwrap_or("<untitled>"), 50);
        let mut parts = vec![title];
        if let Some(author) = &book.author {
            parts.push(truncate(author, 30));
        }
        if let Some(isbn) = &book.isbn {
            parts.push(isbn.clone());
        }
        if let Some(price) = &book.format_price {
            parts.push(price.clone());
        }
        parts.join(" | ")
    }

    fn totals(batch: &BatchResult) -> String {
        let summary = if batch.summary.total_isbns_processed > 0 {
            batch.summary
        } else {
            batch.summarize(batch.results_by_isbn.len())
        };

        format!(
            "Total: {} key(s), {} with data, {} without, {} book(s)",
            summary.total_isbns_processed,
            summary.isbns_with_data,
            summary.isbns_without_data,
            summary.total_books_found
        )
    }

    // Markdown formatting

    fn markdown_batch(&self, batch: &BatchResult) -> String {
        let mut lines = Vec::new();

        lines.push("| Key | Status | Books | Message |".to_string());
        lines.push("|-----|--------|-------|---------|".to_string());

        for (key, result) in &batch.results_by_isbn {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                key,
                result.status,
                result.books.len(),
                result.message.replace('|', "\\|")
            ));
        }

        for (key, result) in &batch.results_by_isbn {
            if result.status != KeyStatus::DataFound || result.books.is_empty() {
                continue;
            }

            lines.push(String::new());
            lines.push(format!("## {}", key));

            for book in &result.books {
                lines.push(String::new());
                lines.push(format!("### {}", book.title.as_deref().unwrap_or("Untitled")));
                lines.push(String::new());

                let fields = [
                    ("Subtitle", &book.subtitle),
                    ("Author", &book.author),
                    ("ISBN", &book.isbn),
                    ("Published", &book.pub_info),
                    ("Format", &book.format_price),
                    ("Pages", &book.pages),
                    ("Status", &book.status),
                ];
                for (label, value) in fields {
                    if let Some(value) = value {
                        lines.push(format!("- **{}:** {}", label, value));
                    }
                }
                if !book.bisac.is_empty() {
                    lines.push(format!("- **BISAC:** {}", book.bisac.join("; ")));
                }
                if let Some(summary) = &book.summary {
                    lines.push(String::new());
                    lines.push(format!("> {}", summary));
                }
            }
        }

        lines.push(String::new());
        lines.push(format!("*{}*", Self::totals(batch)));

        lines.join("\n")
    }

    fn markdown_catalog(&self, entries: &[CatalogEntry]) -> String {
        let mut lines = Vec::new();

        lines.push("| ISBN | Title | Author | Price | Format | Published |".to_string());
        lines.push("|------|-------|--------|-------|--------|-----------|".to_string());

        let cell = |v: &Option<String>| v.as_deref().unwrap_or("").replace('|', "\\|");
        for entry in entries {
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} |",
                entry.isbn,
                entry.title.replace('|', "\\|"),
                cell(&entry.author),
                entry.price,
                cell(&entry.format),
                cell(&entry.publication_date)
            ));
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header() -> String {
        "key,status,title,subtitle,author,isbn,pub_info,format_price,discount_code,bisac,\
         related_products,pages,dimensions,availability,sales_rights,honors,community,summary,cover"
            .to_string()
    }

    fn csv_batch(&self, batch: &BatchResult) -> String {
        let mut lines = Vec::new();
        lines.push(Self::csv_header());

        for (key, result) in &batch.results_by_isbn {
            if result.books.is_empty() {
                lines.push(format!(
                    "{},{}{}",
                    Self::csv_escape(key),
                    result.status,
                    ",".repeat(17)
                ));
                continue;
            }

            for book in &result.books {
                let scalar = |v: &Option<String>| v.as_deref().map(Self::csv_escape).unwrap_or_default();
                let list = |v: &Vec<String>| Self::csv_escape(&v.join("; "));

                let cells = [
                    Self::csv_escape(key),
                    result.status.to_string(),
                    scalar(&book.title),
                    scalar(&book.subtitle),
                    scalar(&book.author),
                    scalar(&book.isbn),
                    scalar(&book.pub_info),
                    scalar(&book.format_price),
                    scalar(&book.discount_code),
                    list(&book.bisac),
                    scalar(&book.related_products),
                    scalar(&book.pages),
                    scalar(&book.dimensions),
                    scalar(&book.status),
                    scalar(&book.sales_rights),
                    list(&book.honors),
                    list(&book.community),
                    scalar(&book.summary),
                    scalar(&book.cover),
                ];
                lines.push(cells.join(","));
            }
        }

        lines.join("\n")
    }

    fn csv_catalog(&self, entries: &[CatalogEntry]) -> String {
        let mut lines = vec!["title,author,isbn,price,format,publication_date,cover_url".to_string()];

        for entry in entries {
            let scalar = |v: &Option<String>| v.as_deref().map(Self::csv_escape).unwrap_or_default();
            let cells = [
                Self::csv_escape(&entry.title),
                scalar(&entry.author),
                entry.isbn.clone(),
                Self::csv_escape(&entry.price),
                scalar(&entry.format),
                scalar(&entry.publication_date),
                scalar(&entry.cover_url),
            ];
            lines.push(cells.join(","));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// Shortens `s` to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
