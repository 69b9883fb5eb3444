//! Column encoders fitted over one batch of videos. Each exposes `fit`, `transform`
//! and `fit_transform`.

use ndarray::{Array2, Axis};
use std::collections::BTreeSet;

/// Zero mean, unit (population) variance per column. Constant columns become 0.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, data: &Array2<f64>) -> &mut Self {
        if data.nrows() == 0 {
            self.means = vec![0.0; data.ncols()];
            self.scales = vec![0.0; data.ncols()];
            return self;
        }

        self.means = data
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; data.ncols()]);
        self.scales = data.std_axis(Axis(0), 0.0).to_vec();
        self
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros(data.dim());
        for ((row, col), value) in data.indexed_iter() {
            let scale = self.scales.get(col).copied().unwrap_or(0.0);
            if scale > 0.0 && scale.is_finite() {
                let mean = self.means.get(col).copied().unwrap_or(0.0);
                out[[row, col]] = ((value - mean) / scale) as f32;
            }
        }
        out
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Array2<f32> {
        self.fit(data);
        self.transform(data)
    }
}

/// One-hot encoding of several categorical columns. Each column contributes one
/// output column per distinct value seen at fit time, in sorted order.
#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_features(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn fit(&mut self, rows: &[Vec<String>]) -> &mut Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        self.categories = (0..width)
            .map(|col| {
                rows.iter()
                    .filter_map(|row| row.get(col).cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self
    }

    /// Values unseen at fit time encode as all zeros for their column group.
    pub fn transform(&self, rows: &[Vec<String>]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((rows.len(), self.num_features()));

        for (r, row) in rows.iter().enumerate() {
            let mut offset = 0;
            for (col, values) in self.categories.iter().enumerate() {
                if let Some(value) = row.get(col) {
                    if let Ok(index) = values.binary_search(value) {
                        out[[r, offset + index]] = 1.0;
                    }
                }
                offset += values.len();
            }
        }

        out
    }

    pub fn fit_transform(&mut self, rows: &[Vec<String>]) -> Array2<f32> {
        self.fit(rows);
        self.transform(rows)
    }
}

/// Multi-hot encoding of label sets, one column per distinct label (sorted).
#[derive(Debug, Clone, Default)]
pub struct MultiLabelBinarizer {
    classes: Vec<String>,
}

impl MultiLabelBinarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn fit(&mut self, labels: &[Vec<String>]) -> &mut Self {
        self.classes = labels
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self
    }

    pub fn transform(&self, labels: &[Vec<String>]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((labels.len(), self.classes.len()));
        for (row, set) in labels.iter().enumerate() {
            for label in set {
                if let Ok(col) = self.classes.binary_search(label) {
                    out[[row, col]] = 1.0;
                }
            }
        }
        out
    }

    pub fn fit_transform(&mut self, labels: &[Vec<String>]) -> Array2<f32> {
        self.fit(labels);
        self.transform(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_standard_scaler() {
        let data = array![[1.0, 5.0], [3.0, 5.0]];
        let scaled = StandardScaler::new().fit_transform(&data);
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-6);
        assert!((scaled[[1, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(scaled[[0, 1]], 0.0);
        assert_eq!(scaled[[1, 1]], 0.0);
    }

    #[test]
    fn test_standard_scaler_empty() {
        let data = Array2::<f64>::zeros((0, 6));
        let scaled = StandardScaler::new().fit_transform(&data);
        assert_eq!(scaled.dim(), (0, 6));
    }

    #[test]
    fn test_one_hot_encoder() {
        let rows = vec![
            strings(&["music", "en"]),
            strings(&["sports", "en"]),
            strings(&["music", "fr"]),
        ];
        let mut encoder = OneHotEncoder::new();
        let encoded = encoder.fit_transform(&rows);

        assert_eq!(encoded.dim(), (3, 4));
        assert_eq!(encoded.row(0).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(encoded.row(2).to_vec(), vec![1.0, 0.0, 0.0, 1.0]);

        let unseen = encoder.transform(&[strings(&["news", "en"])]);
        assert_eq!(unseen.row(0).to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_multi_label_binarizer() {
        let labels = vec![strings(&["funny", "cats"]), vec![], strings(&["cats"])];
        let mut binarizer = MultiLabelBinarizer::new();
        let encoded = binarizer.fit_transform(&labels);

        assert_eq!(binarizer.classes(), &strings(&["cats", "funny"])[..]);
        assert_eq!(encoded.row(0).to_vec(), vec![1.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(encoded.row(2).to_vec(), vec![1.0, 0.0]);
    }
}
