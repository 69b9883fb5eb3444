use crate::utils::normalize_vector;
use ndarray::Array2;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lowercases, drops everything but ASCII alphanumerics and whitespace, and collapses
/// runs of whitespace.
pub fn clean_text(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-character tokens are ignored.
pub fn tokenize(text: &str) -> Vec<String> {
    clean_text(text)
        .split(' ')
        .filter(|token| token.len() >= 2)
        .map(str::to_string)
        .collect()
}

/// TF-IDF with a capped vocabulary and smoothed idf, rows L2-normalized.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }

    /// Keeps the `max_features` terms with the highest corpus frequency (ties by term)
    /// and computes `idf = ln((1 + n) / (1 + df)) + 1`.
    pub fn fit(&mut self, documents: &[String]) -> &mut Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|doc| tokenize(doc)).collect();

        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen = HashSet::new();
            for token in tokens {
                *term_counts.entry(token.as_str()).or_default() += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.as_str()).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let n_docs = documents.len() as f32;
        self.vocabulary = terms
            .iter()
            .enumerate()
            .map(|(index, term)| (term.to_string(), index))
            .collect();
        self.idf = terms
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f32;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        self
    }

    pub fn transform(&self, documents: &[String]) -> Array2<f32> {
        let mut matrix = Array2::<f32>::zeros((documents.len(), self.vocabulary.len()));

        for (row, doc) in documents.iter().enumerate() {
            for token in tokenize(doc) {
                if let Some(&col) = self.vocabulary.get(&token) {
                    matrix[[row, col]] += 1.0;
                }
            }

            let mut row_view = matrix.row_mut(row);
            for (col, value) in row_view.iter_mut().enumerate() {
                *value *= self.idf[col];
            }
            if let Some(values) = row_view.as_slice_mut() {
                normalize_vector(values);
            }
        }

        matrix
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Array2<f32> {
        self.fit(documents);
        self.transform(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello,   World!! 2024 "), "hello world 2024");
        assert_eq!(clean_text("Café—Time"), "caftime");
    }

    #[test]
    fn test_vocabulary_is_capped_and_sorted() {
        let mut vectorizer = TfidfVectorizer::new(2);
        vectorizer.fit(&docs(&["cat cat dog", "cat bird", "fish"]));
        let vocab: Vec<&str> = vectorizer.vocabulary().collect();
        // cat (3) is kept, then the alphabetically first single-count term
        assert_eq!(vocab, vec!["bird", "cat"]);
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let mut vectorizer = TfidfVectorizer::new(50);
        let matrix = vectorizer.fit_transform(&docs(&["guitar lesson", "guitar solo live", ""]));
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 4);

        for row in 0..2 {
            let norm: f32 = matrix.row(row).iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
        assert!(matrix.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let mut vectorizer = TfidfVectorizer::new(50);
        let matrix = vectorizer.fit_transform(&docs(&["common rare", "common", "common"]));
        let vocab: Vec<&str> = vectorizer.vocabulary().collect();
        let common = vocab.iter().position(|t| *t == "common").unwrap();
        let rare = vocab.iter().position(|t| *t == "rare").unwrap();
        assert!(matrix[[0, rare]] > matrix[[0, common]]);
    }

    #[test]
    fn test_empty_corpus() {
        let mut vectorizer = TfidfVectorizer::new(50);
        let matrix = vectorizer.fit_transform(&[]);
        assert_eq!(matrix.dim(), (0, 0));
    }
}
