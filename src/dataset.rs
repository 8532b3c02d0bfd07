//! The observation set consumed by the grower.

use crate::errors::TreeError;

/// Hard limit on categorical level counts, fixed by the one-character level
/// encoding in cut labels.
pub const MAX_LEVELS: usize = 32;

/// A fixed, read-only dataset: `n_obs` rows by `n_vars` predictor columns,
/// stored column-major, plus a response and per-row weights.
///
/// A predictor column is continuous when its level count is 0 and categorical
/// otherwise, with values as 1-based integer codes. Missing predictor cells
/// are NaN; the response carries no missing values. In classification mode
/// (`n_classes > 0`) the response holds 1-based class codes.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    weights: Vec<f64>,
    levels: Vec<usize>,
    ordered: Vec<bool>,
    n_obs: usize,
    n_vars: usize,
    n_classes: usize,
}

impl Dataset {
    /// A classification dataset with 1-based class codes in `y`.
    pub fn classification(
        x: Vec<f64>,
        levels: Vec<usize>,
        y: Vec<usize>,
        n_classes: usize,
        weights: Vec<f64>,
    ) -> Result<Self, TreeError> {
        if n_classes < 2 {
            return Err(TreeError::InvalidInput(format!(
                "classification needs at least 2 classes, got {}",
                n_classes
            )));
        }
        for (j, &code) in y.iter().enumerate() {
            if code < 1 || code > n_classes {
                return Err(TreeError::InvalidInput(format!(
                    "class code {} of observation {} is outside 1..={}",
                    code, j, n_classes
                )));
            }
        }
        let y = y.into_iter().map(|code| code as f64).collect();
        Self::build(x, levels, y, n_classes, weights)
    }

    /// A regression dataset with real responses in `y`.
    pub fn regression(
        x: Vec<f64>,
        levels: Vec<usize>,
        y: Vec<f64>,
        weights: Vec<f64>,
    ) -> Result<Self, TreeError> {
        if y.iter().any(|v| !v.is_finite()) {
            return Err(TreeError::InvalidInput(
                "response values must be finite".to_string(),
            ));
        }
        Self::build(x, levels, y, 0, weights)
    }

    fn build(
        x: Vec<f64>,
        levels: Vec<usize>,
        y: Vec<f64>,
        n_classes: usize,
        weights: Vec<f64>,
    ) -> Result<Self, TreeError> {
        let n_obs = y.len();
        let n_vars = levels.len();
        if x.len() != n_obs * n_vars {
            return Err(TreeError::InvalidInput(format!(
                "predictor matrix holds {} values, expected {} rows x {} columns",
                x.len(),
                n_obs,
                n_vars
            )));
        }
        if weights.len() != n_obs {
            return Err(TreeError::InvalidInput(format!(
                "{} weights for {} observations",
                weights.len(),
                n_obs
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(TreeError::InvalidInput(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        for (v, &nl) in levels.iter().enumerate() {
            if nl == 0 {
                continue;
            }
            if nl > MAX_LEVELS {
                return Err(TreeError::LevelLimit);
            }
            if nl < 2 {
                return Err(TreeError::InvalidInput(format!(
                    "categorical predictor {} declares {} level, needs at least 2",
                    v, nl
                )));
            }
            for j in 0..n_obs {
                let val = x[j + n_obs * v];
                if val.is_nan() {
                    continue;
                }
                let code = val as usize;
                if code as f64 != val || code < 1 || code > nl {
                    return Err(TreeError::InvalidInput(format!(
                        "value {} of categorical predictor {} is not a code in 1..={}",
                        val, v, nl
                    )));
                }
            }
        }
        let ordered = vec![false; n_vars];
        Ok(Self {
            x,
            y,
            weights,
            levels,
            ordered,
            n_obs,
            n_vars,
            n_classes,
        })
    }

    /// Marks categorical predictors whose level codes have a semantic order;
    /// only order-preserving bipartitions are considered for them.
    pub fn with_ordered(mut self, ordered: Vec<bool>) -> Result<Self, TreeError> {
        if ordered.len() != self.n_vars {
            return Err(TreeError::InvalidInput(format!(
                "{} ordered flags for {} predictors",
                ordered.len(),
                self.n_vars
            )));
        }
        self.ordered = ordered;
        Ok(self)
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Class count; 0 in regression mode.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn is_classification(&self) -> bool {
        self.n_classes > 0
    }

    /// Per-predictor level counts, 0 for continuous columns.
    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn ordered(&self, v: usize) -> bool {
        self.ordered[v]
    }

    #[inline]
    pub fn x(&self, j: usize, v: usize) -> f64 {
        self.x[j + self.n_obs * v]
    }

    #[inline]
    pub fn y(&self, j: usize) -> f64 {
        self.y[j]
    }

    /// 0-based class index of observation `j`; classification mode only.
    #[inline]
    pub fn class_index(&self, j: usize) -> usize {
        self.y[j] as usize - 1
    }

    #[inline]
    pub fn weight(&self, j: usize) -> f64 {
        self.weights[j]
    }

    /// The widest categorical level count, at least 1.
    pub fn max_levels(&self) -> usize {
        self.levels.iter().copied().max().unwrap_or(0).max(1)
    }
}
