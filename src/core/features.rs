//! Token and structural feature extraction for code and diagnostic text.
//!
//! Two views of a snippet are produced here:
//! - a flat token stream (keywords, identifiers, operator runs, literal
//!   sentinels) that drives TF-IDF weighting;
//! - a [`StructuralVector`] of shape counts (lines, brackets, statements,
//!   keywords, operators) compared densely.

use std::collections::BTreeMap;

use memchr::memchr_iter;
use regex::Regex;

/// Sentinel emitted once per non-empty quoted string literal
pub const STRING_SENTINEL: &str = "STRING_LITERAL";

/// Sentinel emitted once when any decimal literal is present
pub const NUMBER_SENTINEL: &str = "NUMBER_LITERAL";

/// Control-flow / type keywords recognised as first-class tokens
const KEYWORD_PATTERN: &str = r"\b(?:int|char|float|double|void|if|else|for|while|return|include|define|const|static|class|struct|namespace|using|std|cout|cin|endl)\b";

/// Identifier runs: letter or underscore, then word characters
const IDENTIFIER_PATTERN: &str = r"\b[a-zA-Z_][a-zA-Z0-9_]*\b";

/// Operator runs are atomic; brackets and punctuation are single tokens
const OPERATOR_PATTERN: &str = r"[+\-*/=<>!&|^%]+|[{}()\[\];,.]";

/// Double-quoted literal, including the quotes
const STRING_PATTERN: &str = r#""[^"]*""#;

/// Whole decimal literal
const NUMBER_PATTERN: &str = r"\b\d+\b";

/// Keywords counted individually in the structural view
const STRUCTURAL_KEYWORDS: [&str; 9] =
    ["if", "else", "for", "while", "return", "int", "char", "float", "double"];

/// Regex-driven tokenizer for C-family code and compiler output
#[derive(Debug, Clone)]
pub struct FeatureExtractor
{
    keywords: Regex,
    identifiers: Regex,
    operators: Regex,
    strings: Regex,
    numbers: Regex,
}

impl Default for FeatureExtractor
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl FeatureExtractor
{
    /// Compile the fixed token patterns
    pub fn new() -> Self
    {
        Self {
            keywords: Regex::new(KEYWORD_PATTERN).expect("keyword pattern"),
            identifiers: Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern"),
            operators: Regex::new(OPERATOR_PATTERN).expect("operator pattern"),
            strings: Regex::new(STRING_PATTERN).expect("string pattern"),
            numbers: Regex::new(NUMBER_PATTERN).expect("number pattern"),
        }
    }

    /// Produce the feature tokens of `text`.
    ///
    /// Duplicates are intentional (they are the term frequencies). Keywords
    /// appear twice: once from the keyword pass and once as identifiers.
    pub fn extract<'a>(
        &self,
        text: &'a str,
    ) -> Vec<&'a str>
    {
        if text.is_empty()
        {
            return Vec::new();
        }

        let mut tokens: Vec<&'a str> = Vec::with_capacity(text.len() / 3);

        tokens.extend(
            self.keywords
                .find_iter(text)
                .map(|m| m.as_str()),
        );
        tokens.extend(
            self.identifiers
                .find_iter(text)
                .map(|m| m.as_str()),
        );
        tokens.extend(
            self.operators
                .find_iter(text)
                .map(|m| m.as_str()),
        );

        // `""` carries no content and is not counted
        for lit in self
            .strings
            .find_iter(text)
        {
            if lit.len() > 2
            {
                tokens.push(STRING_SENTINEL);
            }
        }

        if self
            .numbers
            .is_match(text)
        {
            tokens.push(NUMBER_SENTINEL);
        }

        tokens
    }

    /// Owned variant of [`extract`](Self::extract) for cached per-record tokens
    pub fn extract_owned(
        &self,
        text: &str,
    ) -> Vec<String>
    {
        self.extract(text)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}

/// Named integer shape metrics of a code snippet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralVector
{
    metrics: BTreeMap<String, u64>,
}

impl StructuralVector
{
    /// Count for `name`; absent metrics are zero
    pub fn get(
        &self,
        name: &str,
    ) -> u64
    {
        self.metrics
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Set a metric value
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: u64,
    )
    {
        self.metrics
            .insert(name.into(), value);
    }

    /// Iterate metric names and counts in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)>
    {
        self.metrics
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool
    {
        self.metrics
            .is_empty()
    }

    /// Cosine similarity over the union of both metric sets.
    ///
    /// Missing metrics count as zero; a zero norm on either side yields 0.0.
    pub fn cosine(
        &self,
        other: &StructuralVector,
    ) -> f64
    {
        let mut dot = 0.0_f64;
        let mut norm_a = 0.0_f64;
        let mut norm_b = 0.0_f64;

        // BTreeMap keys are sorted, so walking the union is a merge
        let mut names: Vec<&str> = self
            .metrics
            .keys()
            .chain(
                other
                    .metrics
                    .keys(),
            )
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();

        if names.is_empty()
        {
            return 0.0;
        }

        for name in names
        {
            let a = self.get(name) as f64;
            let b = other.get(name) as f64;
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a == 0.0 || norm_b == 0.0
        {
            return 0.0;
        }

        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Extracts [`StructuralVector`]s with precompiled keyword matchers
#[derive(Debug, Clone)]
pub struct StructureExtractor
{
    keywords: Vec<(String, Regex)>,
}

impl Default for StructureExtractor
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl StructureExtractor
{
    pub fn new() -> Self
    {
        let keywords = STRUCTURAL_KEYWORDS
            .iter()
            .map(|kw| {
                (
                    format!("keyword_{kw}"),
                    Regex::new(&format!(r"\b{kw}\b")).expect("keyword matcher"),
                )
            })
            .collect();

        Self { keywords }
    }

    /// Compute the shape metrics of `code`
    pub fn extract(
        &self,
        code: &str,
    ) -> StructuralVector
    {
        let mut v = StructuralVector::default();

        // Lines are newline-separated segments, so an unterminated tail counts
        let lines = memchr_iter(b'\n', code.as_bytes()).count() + 1;
        v.set("line_count", lines as u64);

        v.set("curly_braces", count_chars(code, &['{', '}']));
        v.set("parentheses", count_chars(code, &['(', ')']));
        v.set("square_brackets", count_chars(code, &['[', ']']));
        v.set("semicolons", count_chars(code, &[';']));

        for (name, re) in &self.keywords
        {
            v.set(
                name.clone(),
                re.find_iter(code)
                    .count() as u64,
            );
        }

        v.set("assignments", count_chars(code, &['=']));

        let comparisons = ["==", "!=", "<=", ">="]
            .iter()
            .map(|op| {
                code.matches(op)
                    .count() as u64
            })
            .sum();
        v.set("comparisons", comparisons);

        v
    }
}

fn count_chars(
    s: &str,
    set: &[char],
) -> u64
{
    s.chars()
        .filter(|c| set.contains(c))
        .count() as u64
}
