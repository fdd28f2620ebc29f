//! UI actions that surface data hidden behind clicks.
//!
//! Two reveals exist on a result row: the BISAC popover (classification) and
//! the title side panel (summary). Both are optional: every failure ends in an
//! empty list or an absent value, never in an error for the record.

use crate::browser::{first_present, settle, BrowserError, ClickMethod, Page, Target};
use crate::catalog::selectors::{panel, popover, search};
use crate::catalog::Parser;
use crate::config::Waits;
use crate::extract::field::Normalize;
use regex_lite::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(panel::BOILERPLATE_WORDS).unwrap());

/// One optional UI interaction: activate a trigger, then wait for its effect.
#[derive(Debug, Clone)]
pub struct RevealStep {
    pub name: &'static str,
    /// Trigger candidates, first present wins
    pub triggers: Vec<Target>,
    /// Activation methods, tried in order until one succeeds
    pub methods: Vec<ClickMethod>,
    /// Element expected once the reveal took effect
    pub wait_for: Option<(Target, Duration)>,
    /// Fixed pause after activation
    pub settle: Duration,
}

/// How a [`RevealStep`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Revealed,
    TriggerMissing,
    TriggerDisabled,
    ActivationFailed,
    /// Trigger activated but the expected element never showed up.
    TimedOut,
}

impl RevealStep {
    /// Runs the step. Browser errors are reported as outcomes, not raised.
    pub async fn run(&self, page: &dyn Page) -> RevealOutcome {
        match self.try_run(page).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{} reveal failed: {}", self.name, e);
                RevealOutcome::ActivationFailed
            }
        }
    }

    async fn try_run(&self, page: &dyn Page) -> Result<RevealOutcome, BrowserError> {
        let Some(trigger) = first_present(page, &self.triggers).await? else {
            debug!("{}: no trigger present", self.name);
            return Ok(RevealOutcome::TriggerMissing);
        };

        if !page.is_enabled(trigger).await? {
            debug!("{}: trigger {} is disabled", self.name, trigger);
            return Ok(RevealOutcome::TriggerDisabled);
        }

        if !activate(page, trigger, &self.methods).await {
            return Ok(RevealOutcome::ActivationFailed);
        }

        let mut outcome = RevealOutcome::Revealed;
        if let Some((landmark, timeout)) = &self.wait_for {
            if !page.wait_for(landmark, *timeout).await? {
                debug!("{}: {} did not appear within {:?}", self.name, landmark, timeout);
                outcome = RevealOutcome::TimedOut;
            }
        }

        settle(self.settle).await;
        Ok(outcome)
    }
}

/// Clicks `target` with each method in turn; true once one succeeds.
async fn activate(page: &dyn Page, target: &Target, methods: &[ClickMethod]) -> bool {
    for method in methods {
        match page.click(target, *method).await {
            Ok(()) => {
                debug!("Clicked {} ({:?})", target, method);
                return true;
            }
            Err(e) => debug!("{:?} click on {} failed: {}", method, target, e),
        }
    }
    warn!("All click methods failed for {}", target);
    false
}

/// Closes whatever popover or panel is open.
async fn dismiss(page: &dyn Page) {
    if let Err(e) = page.press_key(&Target::css("body"), "Escape").await {
        debug!("Dismiss failed: {}", e);
    }
}

/// Usable as a summary: long enough and free of interface text.
pub fn is_summary(text: &str) -> bool {
    if text.chars().count() <= panel::MIN_SUMMARY_CHARS {
        return false;
    }
    let lower = text.to_lowercase();
    !panel::BOILERPLATE_PHRASES.iter().any(|p| lower.contains(p)) && !BOILERPLATE.is_match(&lower)
}

/// Usable as a fallback summary: longer and reads like a description.
pub fn is_fallback_summary(text: &str) -> bool {
    if text.chars().count() <= panel::MIN_FALLBACK_CHARS {
        return false;
    }
    let lower = text.to_lowercase();
    panel::PUBLISHING_TERMS.iter().any(|term| lower.contains(term))
}

/// First qualifying fallback text that does not wrap another qualifying
/// text. Nested containers repeat their children's text, so the tightest
/// block is the description itself.
fn innermost_fallback(texts: Vec<String>) -> Option<String> {
    let qualifying: Vec<String> = texts
        .iter()
        .filter_map(|t| Normalize::Collapse.apply(t))
        .filter(|t| is_fallback_summary(t))
        .collect();

    qualifying
        .iter()
        .find(|t| !qualifying.iter().any(|u| u.len() < t.len() && t.contains(u.as_str())))
        .cloned()
}

/// Runs the reveal protocols against one page.
pub struct RevealController<'a> {
    page: &'a dyn Page,
    waits: &'a Waits,
    parser: Parser,
}

impl<'a> RevealController<'a> {
    pub fn new(page: &'a dyn Page, waits: &'a Waits) -> Self {
        Self { page, waits, parser: Parser::new() }
    }

    /// Opens the row's BISAC popover and reads its categories.
    pub async fn classification(&self, row: usize) -> Vec<String> {
        let step = RevealStep {
            name: "BISAC",
            triggers: vec![Target::css(popover::TRIGGER)
                .with_text(popover::TRIGGER_TEXT)
                .within(search::ROW, row)],
            methods: vec![ClickMethod::Direct],
            wait_for: Some((
                Target::css(popover::CONTAINER),
                Duration::from_millis(self.waits.popover_ms),
            )),
            settle: Duration::ZERO,
        };

        match step.run(self.page).await {
            RevealOutcome::Revealed => {}
            RevealOutcome::TriggerMissing | RevealOutcome::TriggerDisabled => return Vec::new(),
            outcome => {
                debug!("Row {}: BISAC popover not revealed ({:?})", row, outcome);
                dismiss(self.page).await;
                return Vec::new();
            }
        }

        let categories = match self.page.outer_html(&Target::css(popover::CONTAINER)).await {
            Ok(Some(html)) => self.parser.parse_popover(&html),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Row {}: failed to read BISAC popover: {}", row, e);
                Vec::new()
            }
        };

        dismiss(self.page).await;
        debug!("Row {}: {} BISAC categories", row, categories.len());
        categories
    }

    /// Opens the row's title side panel and finds the description.
    pub async fn summary(&self, row: usize) -> Option<String> {
        let step = RevealStep {
            name: "Title panel",
            triggers: panel::TITLE_TRIGGERS
                .iter()
                .map(|css| Target::css(*css).within(search::ROW, row))
                .collect(),
            methods: ClickMethod::FALLBACK_ORDER.to_vec(),
            wait_for: Some((
                Target::css(panel::LANDMARK),
                Duration::from_millis(self.waits.panel_ms),
            )),
            settle: Duration::from_millis(self.waits.panel_settle_ms),
        };

        match step.run(self.page).await {
            RevealOutcome::Revealed | RevealOutcome::TimedOut => {}
            outcome => {
                debug!("Row {}: title panel not opened ({:?})", row, outcome);
                return None;
            }
        }

        let expand = RevealStep {
            name: "Content",
            triggers: vec![Target::css(panel::CONTENT_BUTTON)],
            methods: vec![ClickMethod::Direct],
            wait_for: None,
            settle: Duration::from_millis(self.waits.expand_settle_ms),
        };
        expand.run(self.page).await;
        settle(Duration::from_millis(self.waits.content_settle_ms)).await;

        let summary = match self.scan_summary().await {
            Ok(found) => found,
            Err(e) => {
                warn!("Row {}: summary scan failed: {}", row, e);
                None
            }
        };

        dismiss(self.page).await;
        summary
    }

    async fn scan_summary(&self) -> Result<Option<String>, BrowserError> {
        for css in panel::SUMMARY_CANDIDATES {
            for text in self.page.texts(css, true).await? {
                if let Some(text) = Normalize::Collapse.apply(&text) {
                    if is_summary(&text) {
                        debug!("Summary found via {}", css);
                        return Ok(Some(text));
                    }
                }
            }
        }

        for css in panel::FALLBACK_SCAN {
            let texts = self.page.texts(css, true).await?;
            if let Some(text) = innermost_fallback(texts) {
                debug!("Fallback summary found via {}", css);
                return Ok(Some(text));
            }
        }

        debug!("No summary found");
        Ok(None)
    }
}
