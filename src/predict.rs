//! Case routing through a grown tree.

use crate::errors::TreeError;
use crate::labels::{label_contains_level, level_char, parse_threshold};
use crate::node_table::NodeTable;

/// Drops each case down the tree and returns its 1-based destination
/// position: the reached leaf, or the node where a missing split value or an
/// unseen categorical level stopped the descent.
///
/// `x` is column-major with `n_rows` rows and one column per entry of
/// `levels` (0 for continuous predictors).
pub fn predict(
    nodes: &NodeTable,
    levels: &[usize],
    x: &[f64],
    n_rows: usize,
) -> Result<Vec<usize>, TreeError> {
    if nodes.is_empty() {
        return Err(TreeError::CorruptTree("empty node table".to_string()));
    }
    if x.len() != n_rows * levels.len() {
        return Err(TreeError::InvalidInput(format!(
            "case matrix holds {} values, expected {} rows x {} columns",
            x.len(),
            n_rows,
            levels.len()
        )));
    }
    let nnode = nodes.len();
    let (left, right) = nodes.children();
    let mut destinations = Vec::with_capacity(n_rows);
    for i in 0..n_rows {
        let mut cur = 0usize;
        loop {
            if cur >= nnode {
                return Err(TreeError::CorruptTree(
                    "node index out of range".to_string(),
                ));
            }
            let var = nodes.var(cur);
            if var == 0 {
                destinations.push(cur + 1);
                break;
            }
            if var > levels.len() {
                return Err(TreeError::CorruptTree(format!(
                    "split variable {} out of range",
                    var
                )));
            }
            let val = x[i + n_rows * (var - 1)];
            if val.is_nan() {
                destinations.push(cur + 1);
                break;
            }
            let go_left = if levels[var - 1] == 0 {
                let threshold = parse_threshold(nodes.cut_left(cur))?;
                Some(val < threshold)
            } else {
                route_level(nodes, cur, val)?
            };
            match go_left {
                Some(true) => cur = left[cur],
                Some(false) => cur = right[cur],
                None => {
                    destinations.push(cur + 1);
                    break;
                }
            }
        }
    }
    Ok(destinations)
}

/// Distributes unit probability mass over the nodes each case visits.
///
/// Mass routes deterministically when the split value is observed and its
/// level is known to the split; otherwise it divides `p_left` to the left
/// child and the rest to the right, with `p_left` computed from the training
/// member counts `fn_counts`. The result is case-major: case `i` occupies
/// `out[i * nnode .. (i + 1) * nnode]`, one slot per table position,
/// ancestors included.
pub fn predict_distribution(
    nodes: &NodeTable,
    levels: &[usize],
    fn_counts: &[f64],
    x: &[f64],
    n_rows: usize,
) -> Result<Vec<f64>, TreeError> {
    if nodes.is_empty() {
        return Err(TreeError::CorruptTree("empty node table".to_string()));
    }
    if x.len() != n_rows * levels.len() {
        return Err(TreeError::InvalidInput(format!(
            "case matrix holds {} values, expected {} rows x {} columns",
            x.len(),
            n_rows,
            levels.len()
        )));
    }
    if fn_counts.len() != nodes.len() {
        return Err(TreeError::InvalidInput(format!(
            "{} member counts for {} nodes",
            fn_counts.len(),
            nodes.len()
        )));
    }
    let nnode = nodes.len();
    let (left, right) = nodes.children();
    let mut p_left = vec![0.0; nnode];
    for i in 0..nnode {
        if nodes.var(i) > 0 {
            if left[i] >= nnode || right[i] >= nnode {
                return Err(TreeError::CorruptTree(format!(
                    "node {} is missing a child",
                    nodes.id(i)
                )));
            }
            p_left[i] = fn_counts[left[i]] / (fn_counts[left[i]] + fn_counts[right[i]]);
        }
    }
    let mut out = vec![0.0; n_rows * nnode];
    for i in 0..n_rows {
        let case = &mut out[i * nnode..(i + 1) * nnode];
        down_tree(nodes, levels, &left, &right, &p_left, x, n_rows, i, 0, 1.0, case)?;
    }
    Ok(out)
}

fn route_level(nodes: &NodeTable, cur: usize, val: f64) -> Result<Option<bool>, TreeError> {
    let lvl = val as usize;
    if level_char(lvl).is_none() {
        return Ok(None); // unforeseen level
    }
    if label_contains_level(nodes.cut_left(cur), lvl)? {
        Ok(Some(true))
    } else if label_contains_level(nodes.cut_right(cur), lvl)? {
        Ok(Some(false))
    } else {
        Ok(None)
    }
}

#[allow(clippy::too_many_arguments)]
fn down_tree(
    nodes: &NodeTable,
    levels: &[usize],
    left: &[usize],
    right: &[usize],
    p_left: &[f64],
    x: &[f64],
    n_rows: usize,
    case: usize,
    cur: usize,
    mass: f64,
    out: &mut [f64],
) -> Result<(), TreeError> {
    out[cur] += mass;
    let var = nodes.var(cur);
    if var == 0 {
        return Ok(());
    }
    if var > levels.len() {
        return Err(TreeError::CorruptTree(format!(
            "split variable {} out of range",
            var
        )));
    }
    let val = x[case + n_rows * (var - 1)];
    let go_left = if val.is_nan() {
        p_left[cur]
    } else if levels[var - 1] == 0 {
        let threshold = parse_threshold(nodes.cut_left(cur))?;
        if val < threshold {
            1.0
        } else {
            0.0
        }
    } else {
        match route_level(nodes, cur, val)? {
            Some(true) => 1.0,
            Some(false) => 0.0,
            None => p_left[cur],
        }
    };
    if go_left > 0.0 {
        down_tree(
            nodes,
            levels,
            left,
            right,
            p_left,
            x,
            n_rows,
            case,
            left[cur],
            mass * go_left,
            out,
        )?;
    }
    if go_left < 1.0 {
        down_tree(
            nodes,
            levels,
            left,
            right,
            p_left,
            x,
            n_rows,
            case,
            right[cur],
            mass * (1.0 - go_left),
            out,
        )?;
    }
    Ok(())
}
