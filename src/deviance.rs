//! Post-growth deviance recomputation.
//!
//! Each observation's loss is evaluated at its destination node and at every
//! ancestor, using the fitted value, class or probability row of the node it
//! is evaluated at. `dev` therefore holds subtree totals while `sdev` holds
//! only the loss of cases that stop at the node itself.

use crate::errors::TreeError;
use crate::node_table::NodeTable;

/// Per-node deviance totals.
#[derive(Debug, Clone)]
pub struct NodeDeviance {
    /// Loss of every case descending through the node, evaluated per node.
    pub dev: Vec<f64>,
    /// Loss of the cases assigned to the node itself.
    pub sdev: Vec<f64>,
}

/// Classification deviance under an explicit loss matrix laid out
/// column-major by predicted class: `loss[true + n_classes * predicted]`
/// with 0-based indices.
pub fn deviance_loss_matrix(
    nodes: &NodeTable,
    where_codes: &[i64],
    y: &[usize],
    weights: &[f64],
    loss: &[f64],
) -> Result<NodeDeviance, TreeError> {
    let nc = nodes.n_classes();
    if nc == 0 {
        return Err(TreeError::InvalidInput(
            "loss-matrix deviance needs a classification table".to_string(),
        ));
    }
    if loss.len() != nc * nc {
        return Err(TreeError::InvalidInput(format!(
            "loss matrix holds {} entries, expected {}",
            loss.len(),
            nc * nc
        )));
    }
    check_lengths(where_codes, y.len(), weights)?;
    check_class_codes(y, nc)?;
    let parents = nodes.parents();
    let positions = resolve_positions(nodes, where_codes)?;
    let mut dev = vec![0.0; nodes.len()];
    let mut sdev = vec![0.0; nodes.len()];
    for j in 0..y.len() {
        let mut wh = positions[j];
        let contribution = weights[j] * matrix_loss(loss, nc, y[j], nodes.yval(wh))?;
        sdev[wh] += contribution;
        dev[wh] += contribution;
        while let Some(parent) = parents[wh] {
            wh = parent;
            dev[wh] += weights[j] * matrix_loss(loss, nc, y[j], nodes.yval(wh))?;
        }
    }
    Ok(NodeDeviance { dev, sdev })
}

/// Classification deviance from the table's class probabilities. The
/// per-case contribution is `w * ln(p + 1e-200)`; the additive term keeps
/// zero probabilities finite.
pub fn deviance_probability(
    nodes: &NodeTable,
    where_codes: &[i64],
    y: &[usize],
    weights: &[f64],
) -> Result<NodeDeviance, TreeError> {
    let nc = nodes.n_classes();
    if nc == 0 {
        return Err(TreeError::InvalidInput(
            "probability deviance needs a classification table".to_string(),
        ));
    }
    check_lengths(where_codes, y.len(), weights)?;
    check_class_codes(y, nc)?;
    let parents = nodes.parents();
    let positions = resolve_positions(nodes, where_codes)?;
    let mut dev = vec![0.0; nodes.len()];
    let mut sdev = vec![0.0; nodes.len()];
    for j in 0..y.len() {
        let mut wh = positions[j];
        let tmp = (nodes.yprob(wh)[y[j] - 1] + 1e-200).ln();
        sdev[wh] += weights[j] * tmp;
        dev[wh] += weights[j] * tmp;
        while let Some(parent) = parents[wh] {
            wh = parent;
            let tmp = (nodes.yprob(wh)[y[j] - 1] + 1e-200).ln();
            dev[wh] += weights[j] * tmp;
        }
    }
    Ok(NodeDeviance { dev, sdev })
}

/// Regression deviance: per-case contribution `w * (y - yval(node))^2`.
pub fn deviance_squared_error(
    nodes: &NodeTable,
    where_codes: &[i64],
    y: &[f64],
    weights: &[f64],
) -> Result<NodeDeviance, TreeError> {
    check_lengths(where_codes, y.len(), weights)?;
    let parents = nodes.parents();
    let positions = resolve_positions(nodes, where_codes)?;
    let mut dev = vec![0.0; nodes.len()];
    let mut sdev = vec![0.0; nodes.len()];
    for j in 0..y.len() {
        let mut wh = positions[j];
        let d = y[j] - nodes.yval(wh);
        let contribution = weights[j] * d * d;
        sdev[wh] += contribution;
        dev[wh] += contribution;
        while let Some(parent) = parents[wh] {
            wh = parent;
            let d = y[j] - nodes.yval(wh);
            dev[wh] += weights[j] * d * d;
        }
    }
    Ok(NodeDeviance { dev, sdev })
}

fn check_lengths(where_codes: &[i64], n: usize, weights: &[f64]) -> Result<(), TreeError> {
    if where_codes.len() != n || weights.len() != n {
        return Err(TreeError::InvalidInput(format!(
            "{} assignments and {} weights for {} responses",
            where_codes.len(),
            weights.len(),
            n
        )));
    }
    Ok(())
}

fn check_class_codes(y: &[usize], nc: usize) -> Result<(), TreeError> {
    for (j, &code) in y.iter().enumerate() {
        if code < 1 || code > nc {
            return Err(TreeError::InvalidInput(format!(
                "class code {} of observation {} is outside 1..={}",
                code, j, nc
            )));
        }
    }
    Ok(())
}

fn matrix_loss(loss: &[f64], nc: usize, y: usize, fitted: f64) -> Result<f64, TreeError> {
    let f = fitted as usize;
    if f < 1 || f > nc {
        return Err(TreeError::CorruptTree(format!(
            "fitted class {} out of range",
            fitted
        )));
    }
    Ok(loss[y - 1 + nc * (f - 1)])
}

/// Maps the grower's assignment codes back to table positions; negative
/// codes resolve to the position of the stalling ancestor.
fn resolve_positions(nodes: &NodeTable, where_codes: &[i64]) -> Result<Vec<usize>, TreeError> {
    let mut out = Vec::with_capacity(where_codes.len());
    for &code in where_codes {
        let pos = if code > 0 {
            let pos = code as usize - 1;
            if pos >= nodes.len() {
                return Err(TreeError::CorruptTree(format!(
                    "assignment {} beyond the node table",
                    code
                )));
            }
            pos
        } else if code < 0 {
            nodes
                .position_of(-code)
                .ok_or_else(|| TreeError::CorruptTree(format!("no node with id {}", -code)))?
        } else {
            return Err(TreeError::CorruptTree("assignment code 0".to_string()));
        };
        out.push(pos);
    }
    Ok(out)
}
