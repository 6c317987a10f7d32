use rust_stemmers::{Algorithm, Stemmer as Snowball};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tokens shorter than this carry no signal and are never stemmed.
const MIN_TOKEN_CHARS: usize = 2;

/// An unordered set of normalized stems.
///
/// Matching between two sets is order-independent: only the size of the
/// intersection matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StemSet(BTreeSet<String>);

impl StemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stem: impl Into<String>) -> bool {
        self.0.insert(stem.into())
    }

    pub fn merge(&mut self, other: StemSet) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.0.contains(stem)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Number of stems present in both sets.
    pub fn intersection_count(&self, other: &StemSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.0.iter().filter(|stem| large.0.contains(*stem)).count()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for StemSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reduces words to root forms for approximate matching.
pub trait Stemmer: Send + Sync {
    /// Stem a single lowercase word.
    fn stem_word(&self, word: &str) -> String;

    /// Tokenize `text` on non-alphanumeric boundaries and stem every token.
    fn stem_text(&self, text: &str) -> StemSet {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .map(|token| self.stem_word(&token.to_lowercase()))
            .collect()
    }
}

/// English Snowball stemmer.
pub struct SnowballStemmer {
    inner: Snowball,
}

impl SnowballStemmer {
    pub fn english() -> Self {
        Self {
            inner: Snowball::create(Algorithm::English),
        }
    }
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::english()
    }
}

impl Stemmer for SnowballStemmer {
    fn stem_word(&self, word: &str) -> String {
        self.inner.stem(word).into_owned()
    }
}
