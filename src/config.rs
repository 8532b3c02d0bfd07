//! Growth configuration.

use crate::errors::TreeError;
use std::fmt;

/// The loss used to score candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitCriterion {
    /// Information criterion: -2 log-likelihood for classification,
    /// weighted sum of squared residuals for regression.
    #[default]
    Deviance,
    /// Gini impurity, classification only. Forbids missing values on the
    /// candidate predictor.
    Gini,
}

impl SplitCriterion {
    pub fn parse(input: &str) -> Result<Self, TreeError> {
        match input.to_uppercase().as_str() {
            "DEVIANCE" => Ok(SplitCriterion::Deviance),
            "GINI" => Ok(SplitCriterion::Gini),
            _ => Err(TreeError::InvalidInput(format!(
                "Could not parse SplitCriterion `{}`, supported values are DEVIANCE and GINI",
                input
            ))),
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitCriterion::Deviance => write!(f, "DEVIANCE"),
            SplitCriterion::Gini => write!(f, "GINI"),
        }
    }
}

/// Tuning parameters for one growth invocation.
///
/// `min_size` and `min_cut` are weight totals, not observation counts: a node
/// whose member weight is below `min_size` is never considered for splitting,
/// and both children of any accepted split must carry at least `min_cut`
/// weight.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrowConfig {
    pub min_size: f64,
    pub min_cut: f64,
    /// Minimum improvement relative to the root deviance for a split to be
    /// accepted.
    pub min_dev: f64,
    pub criterion: SplitCriterion,
    /// Node-table capacity. `None` derives `2 * n_obs + 1` from the dataset.
    pub max_nodes: Option<usize>,
}

impl Default for GrowConfig {
    fn default() -> Self {
        Self {
            min_size: 10.0,
            min_cut: 5.0,
            min_dev: 0.01,
            criterion: SplitCriterion::Deviance,
            max_nodes: None,
        }
    }
}

impl GrowConfig {
    pub fn builder() -> GrowConfigBuilder {
        GrowConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        if !(self.min_cut >= 1.0) {
            return Err(TreeError::InvalidInput(format!(
                "Configuration parameter 'minCut' must be at least 1, but was {}",
                self.min_cut
            )));
        }
        if self.min_size < 2.0 * self.min_cut {
            return Err(TreeError::InvalidInput(format!(
                "Configuration parameter 'minSize' which was equal to {}, must be at least twice configuration parameter 'minCut' which was equal to {}",
                self.min_size, self.min_cut
            )));
        }
        if !(self.min_dev >= 0.0) {
            return Err(TreeError::InvalidInput(format!(
                "Configuration parameter 'minDev' must be non-negative, but was {}",
                self.min_dev
            )));
        }
        if let Some(max_nodes) = self.max_nodes {
            if max_nodes == 0 || max_nodes > (1 << 30) {
                return Err(TreeError::InvalidInput(format!(
                    "Configuration parameter 'maxNodes' must lie in [1, 2^30], but was {}",
                    max_nodes
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GrowConfigBuilder {
    min_size: Option<f64>,
    min_cut: Option<f64>,
    min_dev: Option<f64>,
    criterion: Option<SplitCriterion>,
    max_nodes: Option<usize>,
}

impl GrowConfigBuilder {
    pub fn min_size(mut self, min_size: f64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn min_cut(mut self, min_cut: f64) -> Self {
        self.min_cut = Some(min_cut);
        self
    }

    pub fn min_dev(mut self, min_dev: f64) -> Self {
        self.min_dev = Some(min_dev);
        self
    }

    pub fn criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn build(self) -> Result<GrowConfig, TreeError> {
        let defaults = GrowConfig::default();
        let config = GrowConfig {
            min_size: self.min_size.unwrap_or(defaults.min_size),
            min_cut: self.min_cut.unwrap_or(defaults.min_cut),
            min_dev: self.min_dev.unwrap_or(defaults.min_dev),
            criterion: self.criterion.unwrap_or(defaults.criterion),
            max_nodes: self.max_nodes.or(defaults.max_nodes),
        };
        config.validate()?;
        Ok(config)
    }
}
