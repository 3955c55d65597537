//! Composite similarity between corpus records.
//!
//! Code similarity blends three signals over comment-stripped,
//! whitespace-collapsed code:
//!
//! ```text
//! code   = w.tfidf * tfidf_cosine + w.sequence * sequence_ratio + w.structure * structural_cosine
//! record = w.code * code + w.detail * detail_ratio + w.category * type_match
//! ```
//!
//! The TF-IDF step is fitted over just the two snippets being compared, so it
//! measures shared vocabulary local to the pair. Diagnostic text loses its
//! `path:line:col:` prefixes before comparison. Any empty side scores 0.0 for
//! its term.

use serde::{Deserialize, Serialize};
use similar::{Algorithm, TextDiff};

use crate::core::features::{FeatureExtractor, StructuralVector, StructureExtractor};
use crate::core::record::Record;
use crate::core::tfidf::{TfidfVectorizer, cosine_similarity};

/// Weights of the three code-similarity signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeWeights
{
    pub tfidf: f64,
    pub sequence: f64,
    pub structure: f64,
}

impl Default for CodeWeights
{
    fn default() -> Self
    {
        Self { tfidf: 0.5, sequence: 0.3, structure: 0.2 }
    }
}

impl CodeWeights
{
    pub fn sum(&self) -> f64
    {
        self.tfidf + self.sequence + self.structure
    }
}

/// Weights of the record-level signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordWeights
{
    pub code: f64,
    pub detail: f64,
    pub category: f64,
}

impl Default for RecordWeights
{
    fn default() -> Self
    {
        Self { code: 0.6, detail: 0.3, category: 0.1 }
    }
}

impl RecordWeights
{
    pub fn sum(&self) -> f64
    {
        self.code + self.detail + self.category
    }
}

/// Full weight set handed to the scorer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights
{
    pub code: CodeWeights,
    pub record: RecordWeights,
}

/// Strip comments and collapse whitespace.
///
/// `//` drops the rest of its line; `/* ... */` drops everything up to the
/// closing marker, across lines. Each remaining line is reduced to its
/// whitespace-separated tokens joined by one space; blank lines are dropped.
pub fn normalize_code(code: &str) -> String
{
    if code.is_empty()
    {
        return String::new();
    }

    let mut out: Vec<String> = Vec::new();
    let mut in_block = false;

    for line in code.split('\n')
    {
        let mut kept = String::with_capacity(line.len());
        let mut rest = line;

        loop
        {
            if in_block
            {
                match rest.find("*/")
                {
                    Some(end) =>
                    {
                        in_block = false;
                        rest = &rest[end + 2..];
                    }
                    None => break,
                }
            }

            let line_comment = rest.find("//");
            let block_comment = rest.find("/*");

            match (line_comment, block_comment)
            {
                (Some(lc), Some(bc)) if lc < bc =>
                {
                    kept.push_str(&rest[..lc]);
                    break;
                }
                (Some(lc), None) =>
                {
                    kept.push_str(&rest[..lc]);
                    break;
                }
                (_, Some(bc)) =>
                {
                    kept.push_str(&rest[..bc]);
                    // keep tokens on either side of the comment apart
                    kept.push(' ');
                    in_block = true;
                    rest = &rest[bc + 2..];
                }
                (None, None) =>
                {
                    kept.push_str(rest);
                    break;
                }
            }
        }

        let collapsed = kept
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !collapsed.is_empty()
        {
            out.push(collapsed);
        }
    }

    out.join("\n")
}

/// Drop `path:line:col:` style prefixes from each diagnostic line.
///
/// A line is split on at most three colons and only the last piece is kept,
/// so `a.cpp:3:5: error: x` becomes ` error: x`. The result is trimmed.
pub fn clean_diagnostic(detail: &str) -> String
{
    detail
        .split('\n')
        .map(|line| {
            line.splitn(4, ':')
                .last()
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Normalized alignment ratio `2*M / (|a| + |b|)` over characters.
///
/// Identical strings give 1.0; either side empty gives 0.0.
pub fn sequence_ratio(
    a: &str,
    b: &str,
) -> f64
{
    if a.is_empty() || b.is_empty()
    {
        return 0.0;
    }
    if a == b
    {
        return 1.0;
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(a, b);

    f64::from(diff.ratio()).clamp(0.0, 1.0)
}

/// Per-record values reused across every comparison in a bucket
#[derive(Debug, Clone)]
pub struct PreparedRecord<'r>
{
    pub record: &'r Record,
    /// Comment-free, whitespace-collapsed code
    pub code: String,
    /// Diagnostic text without location prefixes
    pub detail: String,
    /// Feature tokens of `code`
    pub tokens: Vec<String>,
    /// Shape metrics of `code`
    pub structure: StructuralVector,
}

/// Scores code snippets and whole records
#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer
{
    weights: SimilarityWeights,
    features: FeatureExtractor,
    structure: StructureExtractor,
}

impl SimilarityScorer
{
    pub fn new(weights: SimilarityWeights) -> Self
    {
        Self {
            weights,
            features: FeatureExtractor::new(),
            structure: StructureExtractor::new(),
        }
    }

    pub fn weights(&self) -> &SimilarityWeights
    {
        &self.weights
    }

    /// Precompute the normalized views of a record
    pub fn prepare<'r>(
        &self,
        record: &'r Record,
    ) -> PreparedRecord<'r>
    {
        let code = normalize_code(&record.code_text);
        let tokens = self
            .features
            .extract_owned(&code);
        let structure = self
            .structure
            .extract(&code);

        PreparedRecord {
            record,
            detail: clean_diagnostic(&record.detail_text),
            code,
            tokens,
            structure,
        }
    }

    /// Composite code similarity of two raw snippets
    pub fn code_similarity(
        &self,
        code_a: &str,
        code_b: &str,
    ) -> f64
    {
        let a = Record::new("", "", "", code_a, "");
        let b = Record::new("", "", "", code_b, "");

        self.prepared_code_similarity(&self.prepare(&a), &self.prepare(&b))
    }

    /// Ratio over diagnostics with location prefixes removed
    pub fn detail_similarity(
        &self,
        detail_a: &str,
        detail_b: &str,
    ) -> f64
    {
        sequence_ratio(&clean_diagnostic(detail_a), &clean_diagnostic(detail_b))
    }

    /// Composite record similarity, always within `[0, 1]`
    pub fn record_similarity(
        &self,
        a: &Record,
        b: &Record,
    ) -> f64
    {
        self.prepared_similarity(&self.prepare(a), &self.prepare(b))
    }

    /// Composite record similarity over prepared records
    pub fn prepared_similarity(
        &self,
        a: &PreparedRecord<'_>,
        b: &PreparedRecord<'_>,
    ) -> f64
    {
        let w = &self.weights.record;

        let code = self.prepared_code_similarity(a, b);
        let detail = sequence_ratio(&a.detail, &b.detail);
        let type_match = if a
            .record
            .same_kind(b.record)
        {
            1.0
        }
        else
        {
            0.0
        };

        (w.code * code + w.detail * detail + w.category * type_match).clamp(0.0, 1.0)
    }

    /// Code part of the composite over prepared records
    pub fn prepared_code_similarity(
        &self,
        a: &PreparedRecord<'_>,
        b: &PreparedRecord<'_>,
    ) -> f64
    {
        if a.code
            .is_empty()
            || b.code
                .is_empty()
        {
            return 0.0;
        }

        let w = &self.weights.code;

        // Pair-local TF-IDF: the document set is exactly these two snippets
        let docs = [
            a.tokens
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
            b.tokens
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
        ];
        let model = TfidfVectorizer::fit_tokens(&docs);
        let tfidf = cosine_similarity(&model.vectors[0], &model.vectors[1]);

        let sequence = sequence_ratio(&a.code, &b.code);
        let structure = a
            .structure
            .cosine(&b.structure);

        (w.tfidf * tfidf + w.sequence * sequence + w.structure * structure).clamp(0.0, 1.0)
    }

    /// Full symmetric matrix over prepared records; diagonal is exactly 1.0
    pub fn matrix(
        &self,
        items: &[PreparedRecord<'_>],
    ) -> SimilarityMatrix
    {
        let n = items.len();
        let mut m = SimilarityMatrix::identity(n);

        for i in 0..n
        {
            for j in (i + 1)..n
            {
                let s = self.prepared_similarity(&items[i], &items[j]);
                m.set_symmetric(i, j, s);
            }
        }

        m
    }
}

/// Dense `n × n` similarity matrix for one bucket
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix
{
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix
{
    /// Matrix with 1.0 on the diagonal and 0.0 elsewhere
    pub fn identity(n: usize) -> Self
    {
        let mut values = vec![0.0; n * n];
        for i in 0..n
        {
            values[i * n + i] = 1.0;
        }

        Self { n, values }
    }

    pub fn len(&self) -> usize
    {
        self.n
    }

    pub fn is_empty(&self) -> bool
    {
        self.n == 0
    }

    pub fn get(
        &self,
        i: usize,
        j: usize,
    ) -> f64
    {
        self.values[i * self.n + j]
    }

    /// Write `s` at `(i, j)` and `(j, i)`
    pub fn set_symmetric(
        &mut self,
        i: usize,
        j: usize,
        s: f64,
    )
    {
        self.values[i * self.n + j] = s;
        self.values[j * self.n + i] = s;
    }

    pub fn row(
        &self,
        i: usize,
    ) -> &[f64]
    {
        &self.values[i * self.n..(i + 1) * self.n]
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn normalize_strips_comments_and_whitespace()
    {
        let code = "int main() {\n   return 0;   // done\n\n}\n";
        assert_eq!(normalize_code(code), "int main() {\nreturn 0;\n}");
    }

    #[test]
    fn normalize_drops_multiline_block_comments()
    {
        let code = "int a; /* start\n still comment\n end */ int b;\n/* whole */\nint c;";
        assert_eq!(normalize_code(code), "int a;\nint b;\nint c;");
    }

    #[test]
    fn normalize_of_comment_only_code_is_empty()
    {
        assert_eq!(normalize_code("// nothing\n/* here */"), "");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn diagnostic_prefixes_are_removed()
    {
        let d = "/tmp/x.cpp:3:5: error: expected ';'\nnote here\nfoo.cpp:9: bad";
        assert_eq!(clean_diagnostic(d), "error: expected ';'\nnote here\n bad");
    }

    #[test]
    fn sequence_ratio_edges()
    {
        assert_eq!(sequence_ratio("", "abc"), 0.0);
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);

        // 2 * 3 matches / 8 chars
        let r = sequence_ratio("abcd", "abxd");
        assert!((r - 0.75).abs() < 1e-6);
    }

    #[test]
    fn whitespace_and_comment_variants_score_high()
    {
        let scorer = SimilarityScorer::default();
        let s = scorer.code_similarity("int main(){return 0;}", "int main() {\n  return 0; // done\n}");
        assert!(s > 0.9, "code similarity was {s}");
    }

    #[test]
    fn empty_code_scores_zero()
    {
        let scorer = SimilarityScorer::default();
        assert_eq!(scorer.code_similarity("", "int a;"), 0.0);
        assert_eq!(scorer.code_similarity("// only comment", "int a;"), 0.0);
        assert_eq!(scorer.detail_similarity("", "x"), 0.0);
    }

    #[test]
    fn type_match_contributes_category_weight()
    {
        let scorer = SimilarityScorer::default();
        let a = Record::new("a", "syntax", "semi", "", "");
        let b = Record::new("b", "syntax", "semi", "", "");
        let c = Record::new("c", "syntax", "brace", "", "");

        assert!((scorer.record_similarity(&a, &b) - 0.1).abs() < 1e-12);
        assert_eq!(scorer.record_similarity(&a, &c), 0.0);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal()
    {
        let scorer = SimilarityScorer::default();
        let recs = vec![
            Record::new("0", "t", "d", "int a = 1;", "x.c:1:1: error: e"),
            Record::new("1", "t", "d", "int b = 2;", "y.c:2:2: error: e"),
            Record::new("2", "t", "d", "while(1){}", "z.c:3:3: error: f"),
        ];
        let prepared: Vec<_> = recs
            .iter()
            .map(|r| scorer.prepare(r))
            .collect();

        let m = scorer.matrix(&prepared);
        assert_eq!(m.len(), 3);
        for i in 0..3
        {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..3
            {
                assert_eq!(m.get(i, j), m.get(j, i));
                assert!((0.0..=1.0).contains(&m.get(i, j)));
            }
        }
        assert_eq!(m.row(1).len(), 3);
    }
}
