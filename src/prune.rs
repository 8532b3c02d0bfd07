//! Weakest-link cost-complexity pruning.

use crate::errors::TreeError;
use crate::node_table::NodeTable;

const EPS: f64 = 1e-4;

/// One entry of the cost-complexity sequence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PruneStep {
    /// Complexity parameter at which this subtree becomes optimal; the
    /// initial full-tree entry carries -1e200.
    pub alpha: f64,
    /// Heap id of the node collapsed at this step; 0 for the initial entry.
    pub pruned_id: i64,
    pub n_leaves: usize,
    /// Deviance of the current leaves plus stalled-case loss at kept
    /// internal nodes.
    pub total_dev: f64,
    /// The same total on the companion response.
    pub total_ndev: f64,
}

/// Per-node inputs to the pruner, all in table order.
pub struct PruneInputs<'a> {
    /// 1-based heap ids.
    pub ids: &'a [i64],
    /// Leaf flags of the full tree.
    pub leaf: &'a [bool],
    /// Topological order over table positions, parents first. Depth-first
    /// grower output is already topological, so `table_order` suffices.
    pub order: &'a [usize],
    /// Node deviance when the node stands as a leaf.
    pub dev: &'a [f64],
    /// Loss of cases stalled at the node itself.
    pub sdev: &'a [f64],
    /// Companion (e.g. held-out) counterparts of `dev` and `sdev`.
    pub ndev: &'a [f64],
    pub nsdev: &'a [f64],
}

/// Leaf flags straight off a node table.
pub fn leaf_flags(nodes: &NodeTable) -> Vec<bool> {
    (0..nodes.len()).map(|i| nodes.is_leaf(i)).collect()
}

/// The identity order over table positions.
pub fn table_order(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// Generates the nested subtree sequence by repeatedly collapsing every
/// internal node whose cost-complexity ratio attains the current minimum,
/// until only the root remains. The returned alphas are non-decreasing and
/// the leaf counts strictly decreasing.
pub fn prune(inputs: &PruneInputs<'_>) -> Result<Vec<PruneStep>, TreeError> {
    let nr = inputs.ids.len();
    if nr == 0 {
        return Err(TreeError::InvalidInput("empty node table".to_string()));
    }
    for slice_len in [
        inputs.leaf.len(),
        inputs.order.len(),
        inputs.dev.len(),
        inputs.sdev.len(),
        inputs.ndev.len(),
        inputs.nsdev.len(),
    ] {
        if slice_len != nr {
            return Err(TreeError::InvalidInput(format!(
                "pruner input lengths disagree: {} vs {}",
                slice_len, nr
            )));
        }
    }
    if inputs.order.iter().any(|&pos| pos >= nr) {
        return Err(TreeError::InvalidInput(
            "topological order references a position beyond the table".to_string(),
        ));
    }

    let mut leaf = inputs.leaf.to_vec();
    let mut keep = vec![true; nr];
    let mut g = vec![0.0; nr];
    let mut size = vec![1usize; nr];
    let mut cdev = vec![0.0; nr];
    let mut kept_count = nr;

    let mut steps = vec![PruneStep {
        alpha: -1.0e200,
        pruned_id: 0,
        n_leaves: leaf.iter().filter(|&&b| b).count(),
        total_dev: total(&leaf, &keep, inputs.dev, inputs.sdev),
        total_ndev: total(&leaf, &keep, inputs.ndev, inputs.nsdev),
    }];

    while kept_count > 1 {
        for i in 0..nr {
            cdev[i] = inputs.dev[i];
            size[i] = 1;
        }
        // bottom-up: kept subtree loss and size, and the weakest link
        let mut alpha = f64::INFINITY;
        for k in (0..nr).rev() {
            let cur = inputs.order[k];
            if keep[cur] && !leaf[cur] {
                let mut rt = inputs.sdev[cur];
                let mut sz = 0usize;
                let ir = inputs.ids[cur];
                for j in 0..nr {
                    if inputs.ids[j] / 2 == ir {
                        rt += cdev[j];
                        sz += size[j];
                    }
                }
                size[cur] = sz;
                g[cur] = (inputs.dev[cur] - rt) / (sz as f64 - 1.0);
                cdev[cur] = rt;
                if g[cur] < alpha {
                    alpha = g[cur];
                }
            }
        }
        if alpha == f64::INFINITY {
            return Err(TreeError::CorruptTree(
                "no internal node among the kept nodes".to_string(),
            ));
        }
        // top-down: collapse every node at this alpha
        for k in 0..nr {
            let cur = inputs.order[k];
            if keep[cur] && !leaf[cur] && (g[cur] - alpha).abs() < EPS * (1.0 + alpha.abs()) {
                leaf[cur] = true;
                let ir = inputs.ids[cur];
                for j in 0..nr {
                    if keep[j] {
                        let mut id = inputs.ids[j];
                        if id >= 2 * ir {
                            while id >= 2 * ir {
                                id /= 2;
                            }
                            if id == ir {
                                keep[j] = false;
                                leaf[j] = false;
                                kept_count -= 1;
                            }
                        }
                    }
                }
                steps.push(PruneStep {
                    alpha,
                    pruned_id: ir,
                    n_leaves: leaf.iter().filter(|&&b| b).count(),
                    total_dev: total(&leaf, &keep, inputs.dev, inputs.sdev),
                    total_ndev: total(&leaf, &keep, inputs.ndev, inputs.nsdev),
                });
            }
        }
    }
    Ok(steps)
}

fn total(leaf: &[bool], keep: &[bool], dev: &[f64], sdev: &[f64]) -> f64 {
    let mut sum = 0.0;
    for j in 0..leaf.len() {
        if leaf[j] {
            sum += dev[j];
        } else if keep[j] {
            sum += sdev[j];
        }
    }
    sum
}
