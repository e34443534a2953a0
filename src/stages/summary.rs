use crate::trace::NumericColumns;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    #[error("column '{column}' exceeds the summary buffer limit of {limit} values")]
    CapacityExceeded { column: &'static str, limit: usize },
}

/// Descriptive statistics of one numeric column.
///
/// `std` is the sample standard deviation (n - 1 denominator) and is absent
/// below two values. Quantiles interpolate linearly between order statistics
/// at `h = (n - 1) * q`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: u64,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    /// Compute statistics, sorting `values` in place.
    pub fn describe(values: &mut [f64]) -> Self {
        values.sort_by(f64::total_cmp);
        let sorted: &[f64] = values;
        let n = sorted.len();

        if n == 0 {
            return Self {
                count: 0,
                mean: None,
                std: None,
                min: None,
                p25: None,
                p50: None,
                p75: None,
                max: None,
            };
        }

        // Summing in sorted order makes the mean independent of input order.
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let squared: f64 = sorted.iter().map(|v| (v - mean) * (v - mean)).sum();
            Some((squared / (n - 1) as f64).sqrt())
        } else {
            None
        };

        Self {
            count: n as u64,
            mean: Some(mean),
            std,
            min: Some(sorted[0]),
            p25: Some(quantile(sorted, 0.25)),
            p50: Some(quantile(sorted, 0.5)),
            p75: Some(quantile(sorted, 0.75)),
            max: Some(sorted[n - 1]),
        }
    }
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = h - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: u64,
    pub columns: BTreeMap<String, ColumnStats>,
}

/// Buffers the numeric columns of a dataset, up to a fixed number of values
/// per column, so exact order statistics can be computed at the end.
pub struct SummaryBuilder<T> {
    rows: u64,
    limit: usize,
    values: Vec<Vec<f64>>,
    _record: PhantomData<T>,
}

impl<T: NumericColumns> SummaryBuilder<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            rows: 0,
            limit,
            values: vec![Vec::new(); T::NUMERIC_COLUMNS.len()],
            _record: PhantomData,
        }
    }

    pub fn observe(&mut self, record: &T) -> Result<(), SummaryError> {
        for (index, column) in self.values.iter_mut().enumerate() {
            if let Some(value) = record.numeric_value(index) {
                if column.len() >= self.limit {
                    return Err(SummaryError::CapacityExceeded {
                        column: T::NUMERIC_COLUMNS[index],
                        limit: self.limit,
                    });
                }
                column.push(value);
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Fold another chunk's buffered values into this one.
    pub fn merge(&mut self, other: SummaryBuilder<T>) -> Result<(), SummaryError> {
        for (index, (column, extra)) in self.values.iter_mut().zip(other.values).enumerate() {
            if column.len() + extra.len() > self.limit {
                return Err(SummaryError::CapacityExceeded {
                    column: T::NUMERIC_COLUMNS[index],
                    limit: self.limit,
                });
            }
            column.extend(extra);
        }
        self.rows += other.rows;
        Ok(())
    }

    pub fn finish(self) -> DatasetSummary {
        let columns = T::NUMERIC_COLUMNS
            .iter()
            .zip(self.values)
            .map(|(name, mut values)| (name.to_string(), ColumnStats::describe(&mut values)))
            .collect();

        DatasetSummary {
            rows: self.rows,
            columns,
        }
    }
}
