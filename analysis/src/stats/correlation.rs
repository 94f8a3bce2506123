//! Pearson correlation

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Pearson correlation of two equally long series; `None` when either is
/// constant or shorter than two values.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Pairwise correlations between named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Row-major, NaN where undefined
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn compute(columns: &[(String, Vec<f64>)]) -> Result<Self> {
        if let Some((name, _)) = columns
            .iter()
            .find(|(_, v)| v.len() != columns[0].1.len())
        {
            return Err(AnalysisError::invalid(format!(
                "column {:?} has a different length",
                name
            )));
        }
        let values = columns
            .iter()
            .map(|(_, a)| {
                columns
                    .iter()
                    .map(|(_, b)| pearson(a, b).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        Ok(Self {
            names: columns.iter().map(|(n, _)| n.clone()).collect(),
            values,
        })
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }

    pub fn format(&self) -> String {
        let width = self.names.iter().map(|n| n.len()).max().unwrap_or(0).max(8);
        let mut s = format!("{:width$}", "", width = width);
        for name in &self.names {
            s.push_str(&format!(" {:>width$}", name, width = width));
        }
        s.push('\n');
        for (name, row) in self.names.iter().zip(&self.values) {
            s.push_str(&format!("{:width$}", name, width = width));
            for v in row {
                s.push_str(&format!(" {:>width$.3}", v, width = width));
            }
            s.push('\n');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&a, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&a, &[1.0, 1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn test_matrix() {
        let m = CorrelationMatrix::compute(&[
            ("Price".to_string(), vec![1.0, 2.0, 3.0]),
            ("GDP".to_string(), vec![3.0, 2.0, 1.0]),
        ])
        .unwrap();
        assert!((m.get("Price", "Price").unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get("Price", "GDP").unwrap() + 1.0).abs() < 1e-12);
        assert!(m.format().contains("GDP"));
    }
}
