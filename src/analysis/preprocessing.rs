//! Data preprocessing utilities

use ndarray::{Array2, Axis};

use crate::models::PriceTable;

/// Columns whose standard deviation falls below this are treated as constant.
const MIN_STD: f64 = 1e-12;

/// Drop every row with a missing value in any tracked field. An absent table
/// stays absent; nothing is imputed.
pub fn clean(table: Option<PriceTable>) -> Option<PriceTable> {
    table.map(PriceTable::drop_incomplete)
}

/// Standardize each column (zero mean, unit population variance).
///
/// Constant columns become all zeros.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let (n_rows, n_cols) = data.dim();
    let mut result = Array2::zeros((n_rows, n_cols));
    if n_rows == 0 {
        return result;
    }

    let Some(mean) = data.mean_axis(Axis(0)) else {
        return result;
    };
    let std = data.std_axis(Axis(0), 0.0);

    for j in 0..n_cols {
        if std[j] < MIN_STD {
            continue;
        }
        for i in 0..n_rows {
            result[[i, j]] = (data[[i, j]] - mean[j]) / std[j];
        }
    }

    result
}
