//! TF-IDF weighting over small document sets.
//!
//! Vocabulary and document frequencies are computed from the documents
//! passed in, then each document is weighted independently:
//!
//! - `idf(t) = max(0.1, ln(N / df(t)))`
//! - `tf(t)  = count(t) / max(1, tokens_in_doc)`
//! - `w(t)   = tf(t) * idf(t)`
//!
//! Vectors are sparse and keyed by borrowed token text. Keys are kept in a
//! `BTreeMap` so dot products always sum in the same order, which makes
//! `cosine(a, b)` and `cosine(b, a)` bit-identical.

use std::collections::{BTreeMap, HashSet};

use crate::core::features::FeatureExtractor;

/// Floor applied to every IDF weight so ubiquitous tokens still count
pub const IDF_FLOOR: f64 = 0.1;

/// Sparse token → weight vector; absent tokens weigh zero
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector<'a>
{
    weights: BTreeMap<&'a str, f64>,
}

impl<'a> SparseVector<'a>
{
    pub fn get(
        &self,
        token: &str,
    ) -> f64
    {
        self.weights
            .get(token)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize
    {
        self.weights
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.weights
            .is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + '_
    {
        self.weights
            .iter()
            .map(|(k, v)| (*k, *v))
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64
    {
        self.weights
            .values()
            .map(|w| w * w)
            .sum::<f64>()
            .sqrt()
    }

    /// Dot product over shared keys (sorted merge)
    pub fn dot(
        &self,
        other: &SparseVector<'_>,
    ) -> f64
    {
        let mut a = self
            .weights
            .iter()
            .peekable();
        let mut b = other
            .weights
            .iter()
            .peekable();
        let mut sum = 0.0;

        while let (Some((ka, va)), Some((kb, vb))) = (a.peek(), b.peek())
        {
            match ka.cmp(kb)
            {
                std::cmp::Ordering::Equal =>
                {
                    sum += *va * *vb;
                    a.next();
                    b.next();
                }
                std::cmp::Ordering::Less =>
                {
                    a.next();
                }
                std::cmp::Ordering::Greater =>
                {
                    b.next();
                }
            }
        }

        sum
    }
}

impl<'a> FromIterator<(&'a str, f64)> for SparseVector<'a>
{
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self
    {
        Self {
            weights: iter
                .into_iter()
                .collect(),
        }
    }
}

/// Cosine similarity between sparse vectors.
///
/// Empty vectors or a zero norm on either side give 0.0.
pub fn cosine_similarity(
    a: &SparseVector<'_>,
    b: &SparseVector<'_>,
) -> f64
{
    if a.is_empty() || b.is_empty()
    {
        return 0.0;
    }

    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0
    {
        return 0.0;
    }

    a.dot(b) / (norm_a * norm_b)
}

/// Result of fitting a document set: one vector per document plus the IDF table
#[derive(Debug, Clone, Default)]
pub struct TfidfModel<'a>
{
    pub vectors: Vec<SparseVector<'a>>,
    pub idf: BTreeMap<&'a str, f64>,
}

impl TfidfModel<'_>
{
    /// Number of distinct tokens across the document set
    pub fn vocabulary_size(&self) -> usize
    {
        self.idf
            .len()
    }
}

/// Builds TF-IDF vectors for a document set
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer
{
    extractor: FeatureExtractor,
}

impl TfidfVectorizer
{
    pub fn new(extractor: FeatureExtractor) -> Self
    {
        Self { extractor }
    }

    /// Tokenize every text and fit the set
    pub fn fit_transform<'a>(
        &self,
        texts: &[&'a str],
    ) -> TfidfModel<'a>
    {
        let docs: Vec<Vec<&'a str>> = texts
            .iter()
            .map(|t| {
                self.extractor
                    .extract(t)
            })
            .collect();

        Self::fit_tokens(&docs)
    }

    /// Fit already-tokenized documents
    pub fn fit_tokens<'a>(docs: &[Vec<&'a str>]) -> TfidfModel<'a>
    {
        if docs.is_empty()
        {
            return TfidfModel::default();
        }

        // Document frequency: count each token once per document
        let mut df: BTreeMap<&'a str, usize> = BTreeMap::new();
        for doc in docs
        {
            let unique: HashSet<&'a str> = doc
                .iter()
                .copied()
                .collect();
            for tok in unique
            {
                *df.entry(tok)
                    .or_default() += 1;
            }
        }

        let n_docs = docs.len() as f64;
        let idf: BTreeMap<&'a str, f64> = df
            .iter()
            .map(|(tok, &count)| (*tok, (n_docs / count as f64).ln().max(IDF_FLOOR)))
            .collect();

        let vectors: Vec<SparseVector<'a>> = docs
            .iter()
            .map(|doc| {
                let total = doc
                    .len()
                    .max(1) as f64;

                let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
                for tok in doc
                {
                    *counts
                        .entry(*tok)
                        .or_default() += 1;
                }

                counts
                    .into_iter()
                    .map(|(tok, c)| {
                        let weight = idf
                            .get(tok)
                            .copied()
                            .unwrap_or(IDF_FLOOR);
                        (tok, (c as f64 / total) * weight)
                    })
                    .collect::<SparseVector<'a>>()
            })
            .collect();

        TfidfModel { vectors, idf }
    }
}
