//! Catalog line normalizer.
//!
//! Turns the trimmed, non-empty lines extracted from a price-list document
//! into [`NewProduct`] records. Each line runs through an ordered chain of
//! [`Rule`]s; a rule either refines the line's [`LineDraft`] or discards the
//! line. The standard chain is:
//!
//! | Order | Rule | Effect |
//! |-------|------|--------|
//! | 1 | [`NoiseFilter`] | discard table headers such as `Model` or `Price` |
//! | 2 | [`PriceRule`] | first `R250` / `R 1,250.00` style price |
//! | 3 | [`CodeRule`] | first `CF244A` / `W1470X` style product code |
//! | 4 | [`NameRule`] | line text minus the price and code matches |
//! | 5 | [`ValidityGate`] | discard names shorter than 3 characters |
//!
//! Lines are processed independently and in document order. Nothing is
//! merged or deduplicated, and malformed lines are skipped rather than
//! reported.
//!
//! ```rust
//! use cartridge_shop_core::normalize::Normalizer;
//!
//! let normalizer = Normalizer::standard();
//! let outcome = normalizer.normalize(["Model", "HP 652 Black (F6V25AE) - R250", "ab"]);
//! assert_eq!(outcome.products.len(), 1);
//! assert_eq!(outcome.products[0].code.as_deref(), Some("F6V25AE"));
//! assert_eq!(outcome.products[0].price, Some(250.0));
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{NewProduct, DEFAULT_IMAGE};

/// Header words that mark a line as a table artifact rather than a product.
pub const DEFAULT_NOISE_WORDS: &[&str] = &["Model", "Code", "Price", "Cartridge", "List"];

/// Minimum number of characters a derived name must have.
pub const MIN_NAME_CHARS: usize = 3;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)R\s*(\d[\d,]*(?:\.\d+)?)").unwrap());

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{1,4}\d{1,4}[A-Z0-9-]*\b").unwrap());

/// Working state for one line as it moves through the rule chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    pub line: String,
    pub price: Option<f64>,
    pub price_span: Option<Range<usize>>,
    pub code: Option<String>,
    pub code_span: Option<Range<usize>>,
    pub name: Option<String>,
}

impl LineDraft {
    pub fn new(line: &str) -> Self {
        Self {
            line: line.to_string(),
            price: None,
            price_span: None,
            code: None,
            code_span: None,
            name: None,
        }
    }

    /// The exact text matched as the price, if any.
    pub fn price_text(&self) -> Option<&str> {
        self.price_span.clone().map(|r| &self.line[r])
    }
}

/// Why a line produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The line starts with a header word.
    Noise,
    /// Nothing usable was left once the price and code were removed.
    TooShort,
}

/// Result of applying a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Discard(SkipReason),
}

/// One step of the normalizer chain.
pub trait Rule: Send + Sync {
    /// Short identifier used in logs and tests.
    fn name(&self) -> &'static str;

    /// Inspect or refine the draft. Returning [`Verdict::Discard`] stops the
    /// chain for this line.
    fn apply(&self, draft: &mut LineDraft) -> Verdict;
}

// ============ Rules ============

/// Discards lines whose first word is a known header label.
///
/// Matching is case-insensitive and word-based, so `"MODEL: HP"` is noise
/// but `"Models of toner"` is not. An empty word list disables the rule.
pub struct NoiseFilter {
    words: Vec<String>,
}

impl NoiseFilter {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        Self {
            words: words
                .iter()
                .map(|w| w.as_ref().trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    fn is_noise(&self, line: &str) -> bool {
        let first = line
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or("");
        !first.is_empty() && self.words.iter().any(|w| w.eq_ignore_ascii_case(first))
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_WORDS)
    }
}

impl Rule for NoiseFilter {
    fn name(&self) -> &'static str {
        "noise_filter"
    }

    fn apply(&self, draft: &mut LineDraft) -> Verdict {
        if self.is_noise(&draft.line) {
            Verdict::Discard(SkipReason::Noise)
        } else {
            Verdict::Continue
        }
    }
}

/// Extracts the first Rand price: an `R` starting a word, optional
/// whitespace, digits with optional thousands commas and an optional
/// decimal fraction.
pub struct PriceRule;

impl Rule for PriceRule {
    fn name(&self) -> &'static str {
        "price"
    }

    fn apply(&self, draft: &mut LineDraft) -> Verdict {
        if let Some(caps) = PRICE_RE.captures(&draft.line) {
            let (whole, digits) = match (caps.get(0), caps.get(1)) {
                (Some(w), Some(d)) => (w, d),
                _ => return Verdict::Continue,
            };
            if let Some(price) = parse_price(digits.as_str()) {
                draft.price = Some(price);
                draft.price_span = Some(whole.range());
            }
        }
        Verdict::Continue
    }
}

/// Parses `"1,250.50"` as `1250.5`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Extracts the first product code: 1-4 uppercase letters, 1-4 digits, then
/// any run of uppercase letters, digits or hyphens, as a whole word.
///
/// The search covers the whole line, including the price match.
pub struct CodeRule;

impl Rule for CodeRule {
    fn name(&self) -> &'static str {
        "code"
    }

    fn apply(&self, draft: &mut LineDraft) -> Verdict {
        if let Some(m) = CODE_RE.find(&draft.line) {
            draft.code = Some(m.as_str().to_string());
            draft.code_span = Some(m.range());
        }
        Verdict::Continue
    }
}

/// Derives the display name by cutting the price and code matches out of
/// the line and collapsing the leftover whitespace.
pub struct NameRule;

impl Rule for NameRule {
    fn name(&self) -> &'static str {
        "name"
    }

    fn apply(&self, draft: &mut LineDraft) -> Verdict {
        let spans: Vec<Range<usize>> = [draft.price_span.clone(), draft.code_span.clone()]
            .into_iter()
            .flatten()
            .collect();
        draft.name = Some(strip_spans(&draft.line, &spans));
        Verdict::Continue
    }
}

/// Removes the byte ranges from `line`. Overlapping ranges are merged.
fn strip_spans(line: &str, spans: &[Range<usize>]) -> String {
    let mut spans = spans.to_vec();
    spans.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            out.push_str(&line[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    if cursor < line.len() {
        out.push_str(&line[cursor..]);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Discards lines whose derived name is empty or too short.
pub struct ValidityGate {
    min_chars: usize,
}

impl Default for ValidityGate {
    fn default() -> Self {
        Self {
            min_chars: MIN_NAME_CHARS,
        }
    }
}

impl Rule for ValidityGate {
    fn name(&self) -> &'static str {
        "validity_gate"
    }

    fn apply(&self, draft: &mut LineDraft) -> Verdict {
        let len = draft.name.as_deref().map(|n| n.chars().count()).unwrap_or(0);
        if len < self.min_chars {
            Verdict::Discard(SkipReason::TooShort)
        } else {
            Verdict::Continue
        }
    }
}

// ============ Normalizer ============

/// Per-line result of [`Normalizer::normalize_line`].
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Product(NewProduct),
    Skipped(SkipReason),
}

/// Aggregate result of normalizing a whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    /// Emitted records, in document order.
    pub products: Vec<NewProduct>,
    pub lines_seen: usize,
    pub skipped_noise: usize,
    pub skipped_short: usize,
}

impl NormalizeOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_noise + self.skipped_short
    }
}

/// Ordered rule chain plus the placeholder image stamped on every record.
pub struct Normalizer {
    rules: Vec<Box<dyn Rule>>,
    image: String,
}

impl Normalizer {
    /// Standard chain with the default header words and image.
    pub fn standard() -> Self {
        Self::with_options(DEFAULT_NOISE_WORDS, DEFAULT_IMAGE)
    }

    /// Standard chain with custom header words and placeholder image.
    ///
    /// An empty `noise_words` slice leaves the noise filter out entirely.
    pub fn with_options<S: AsRef<str>>(noise_words: &[S], image: &str) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();
        if !noise_words.is_empty() {
            rules.push(Box::new(NoiseFilter::new(noise_words)));
        }
        rules.push(Box::new(PriceRule));
        rules.push(Box::new(CodeRule));
        rules.push(Box::new(NameRule));
        rules.push(Box::new(ValidityGate::default()));
        Self::from_rules(rules, image)
    }

    /// Builds a normalizer from an explicit chain. The chain must include a
    /// rule that sets [`LineDraft::name`], otherwise every line is skipped.
    pub fn from_rules(rules: Vec<Box<dyn Rule>>, image: &str) -> Self {
        Self {
            rules,
            image: image.to_string(),
        }
    }

    /// Rule identifiers in execution order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Runs the chain over a single line.
    pub fn normalize_line(&self, line: &str) -> LineOutcome {
        let mut draft = LineDraft::new(line);
        for rule in &self.rules {
            if let Verdict::Discard(reason) = rule.apply(&mut draft) {
                return LineOutcome::Skipped(reason);
            }
        }
        match draft.name {
            Some(name) if !name.is_empty() => LineOutcome::Product(NewProduct::new(
                name,
                draft.price,
                draft.code,
                self.image.clone(),
            )),
            _ => LineOutcome::Skipped(SkipReason::TooShort),
        }
    }

    /// Runs the chain over every line, keeping document order.
    pub fn normalize<I, S>(&self, lines: I) -> NormalizeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = NormalizeOutcome::default();
        for line in lines {
            outcome.lines_seen += 1;
            match self.normalize_line(line.as_ref()) {
                LineOutcome::Product(p) => outcome.products.push(p),
                LineOutcome::Skipped(SkipReason::Noise) => outcome.skipped_noise += 1,
                LineOutcome::Skipped(SkipReason::TooShort) => outcome.skipped_short += 1,
            }
        }
        outcome
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::standard()
    }
}
