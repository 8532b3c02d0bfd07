//! Rust CART - classification and regression trees
//!
//! Binary recursive partitioning of tabular data: tree growth under a
//! deviance or Gini criterion with case weights and missing values,
//! post-growth deviance recomputation, weakest-link cost-complexity pruning,
//! and deterministic or probability-weighted case routing.

pub mod config;
pub mod dataset;
pub mod deviance;
pub mod errors;
pub mod grow;
pub mod labels;
pub mod node_table;
pub mod predict;
pub mod prune;
mod scratch;
pub mod sort;

pub use config::{GrowConfig, SplitCriterion};
pub use dataset::Dataset;
pub use deviance::{
    deviance_loss_matrix, deviance_probability, deviance_squared_error, NodeDeviance,
};
pub use errors::TreeError;
pub use grow::{grow, regrow, GrownTree};
pub use node_table::NodeTable;
pub use predict::{predict, predict_distribution};
pub use prune::{leaf_flags, prune, table_order, PruneInputs, PruneStep};
