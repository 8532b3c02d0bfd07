//! Recursive tree growth.
//!
//! Growth is an in-place recursion over the node table: each accepted split
//! parks the unvisited tail of the table above the arena, writes the two
//! children, recurses depth-first, and moves the tail back right after the
//! newly grown subtree. The table is therefore in strict depth-first,
//! left-before-right order at all times.

mod split_categorical;
mod split_continuous;

use crate::config::{GrowConfig, SplitCriterion};
use crate::dataset::Dataset;
use crate::errors::TreeError;
use crate::node_table::NodeTable;
use crate::scratch::ScratchArena;

/// Added to a 0-based node position in the working assignment vector to
/// freeze an observation at the node whose split variable it is missing.
/// Large enough that any frozen entry is strictly negative at any capacity.
pub(crate) const NA_LEVEL: i32 = -(1 << 30);

/// Heap ids at or beyond this cannot be split further.
const MAX_ID: i64 = 1 << 30;

/// Minimum observed weight for a split scan to proceed.
const EPS: f64 = 1e-4;

pub(crate) fn xlogx(x: f64) -> f64 {
    if x > 0.0 {
        x * x.ln()
    } else {
        0.0
    }
}

/// Doubled two-child classification loss over left/right weighted class
/// counts. Information deviance uses `D(n, {c_k}) = n ln n - sum c_k ln c_k`
/// per side; Gini subtracts both sides' `sum c_k^2 / n` from `gini_base`.
pub(crate) fn class_split_loss(
    gini: bool,
    left: &[f64],
    right: &[f64],
    cntl: f64,
    cntr: f64,
    gini_base: f64,
) -> f64 {
    let mut ldev;
    if gini {
        let mut lsum = 0.0;
        let mut rsum = 0.0;
        for k in 0..left.len() {
            lsum += left[k] * left[k];
            rsum += right[k] * right[k];
        }
        ldev = gini_base - lsum / cntl - rsum / cntr;
    } else {
        ldev = xlogx(cntl) + xlogx(cntr);
        for k in 0..left.len() {
            ldev -= xlogx(left[k]) + xlogx(right[k]);
        }
    }
    2.0 * ldev
}

/// A grown tree: the depth-first node table plus per-observation leaf
/// assignments.
///
/// `where_codes[j]` is the 1-based table position of observation `j`'s leaf,
/// or the negative heap id of the ancestor it stalled at because a split
/// variable was missing.
#[derive(Debug, Clone)]
pub struct GrownTree {
    pub nodes: NodeTable,
    pub where_codes: Vec<i64>,
}

/// Grows a tree from scratch.
pub fn grow(data: &Dataset, config: &GrowConfig) -> Result<GrownTree, TreeError> {
    config.validate()?;
    let gini = config.criterion == SplitCriterion::Gini;
    if gini && !data.is_classification() {
        return Err(TreeError::InvalidInput(
            "the Gini criterion requires a classification response".to_string(),
        ));
    }
    if data.n_obs() == 0 {
        return Err(TreeError::InvalidInput("empty dataset".to_string()));
    }
    let capacity = config.max_nodes.unwrap_or(2 * data.n_obs() + 1);
    let mut grower = Grower {
        data,
        min_size: config.min_size,
        min_cut: config.min_cut,
        min_dev: config.min_dev,
        gini,
        nodes: NodeTable::with_capacity(capacity, data.n_classes()),
        where_pos: vec![0; data.n_obs()],
        preexisting: vec![false; capacity],
        scratch: ScratchArena::new(data.n_obs(), data.max_levels(), data.n_classes()),
        offset: 0,
        avail_top: capacity,
    };
    grower.nodes.append(1);
    grower.divide_node(0)?;
    Ok(grower.finish())
}

/// Resumes growth on a partially grown tree: every existing leaf position is
/// revisited with the supplied configuration. Pre-existing classification
/// nodes keep their predicted class.
pub fn regrow(data: &Dataset, config: &GrowConfig, tree: GrownTree) -> Result<GrownTree, TreeError> {
    config.validate()?;
    let gini = config.criterion == SplitCriterion::Gini;
    if gini && !data.is_classification() {
        return Err(TreeError::InvalidInput(
            "the Gini criterion requires a classification response".to_string(),
        ));
    }
    let GrownTree { nodes, where_codes } = tree;
    if nodes.is_empty() {
        return grow(data, config);
    }
    if nodes.n_classes() != data.n_classes() {
        return Err(TreeError::InvalidInput(format!(
            "tree carries {} classes, dataset {}",
            nodes.n_classes(),
            data.n_classes()
        )));
    }
    if where_codes.len() != data.n_obs() {
        return Err(TreeError::InvalidInput(format!(
            "{} assignments for {} observations",
            where_codes.len(),
            data.n_obs()
        )));
    }
    let capacity = config
        .max_nodes
        .unwrap_or(2 * data.n_obs() + 1)
        .max(nodes.capacity());
    let nodes = if capacity > nodes.capacity() {
        nodes.into_capacity(capacity)?
    } else {
        nodes
    };

    let mut where_pos = Vec::with_capacity(data.n_obs());
    for &code in &where_codes {
        if code > 0 {
            let pos = code as usize - 1;
            if pos >= nodes.len() {
                return Err(TreeError::CorruptTree(format!(
                    "assignment {} beyond the node table",
                    code
                )));
            }
            where_pos.push(pos as i32);
        } else if code < 0 {
            let pos = nodes.position_of(-code).ok_or_else(|| {
                TreeError::CorruptTree(format!("no node with id {}", -code))
            })?;
            where_pos.push(pos as i32 + NA_LEVEL);
        } else {
            return Err(TreeError::CorruptTree("assignment code 0".to_string()));
        }
    }

    let exists = nodes.len();
    let mut preexisting = vec![false; capacity];
    for flag in preexisting[..exists].iter_mut() {
        *flag = true;
    }
    let mut grower = Grower {
        data,
        min_size: config.min_size,
        min_cut: config.min_cut,
        min_dev: config.min_dev,
        gini,
        nodes,
        where_pos,
        preexisting,
        scratch: ScratchArena::new(data.n_obs(), data.max_levels(), data.n_classes()),
        offset: 0,
        avail_top: capacity,
    };
    for i in 0..exists {
        let pos = i + grower.offset;
        if grower.nodes.var(pos) == 0 {
            grower.divide_node(pos)?;
        }
    }
    Ok(grower.finish())
}

/// Per-invocation growth state: the configuration, the node table under
/// construction, the working assignment vector and the scratch arena.
pub(crate) struct Grower<'a> {
    pub(crate) data: &'a Dataset,
    pub(crate) min_size: f64,
    pub(crate) min_cut: f64,
    pub(crate) min_dev: f64,
    pub(crate) gini: bool,
    pub(crate) nodes: NodeTable,
    /// 0-based position of each observation's current node, or position +
    /// `NA_LEVEL` when frozen at an ancestor.
    pub(crate) where_pos: Vec<i32>,
    /// Slots holding nodes supplied by the caller; those keep their
    /// predicted class through re-growth.
    pub(crate) preexisting: Vec<bool>,
    pub(crate) scratch: ScratchArena,
    /// Accumulated displacement of not-yet-visited pre-existing nodes.
    pub(crate) offset: usize,
    /// First slot of the parked tail; appends below it only.
    pub(crate) avail_top: usize,
}

impl Grower<'_> {
    /// Computes size, prediction and deviance of node `inode` from its
    /// current members and resets it to an unlabelled leaf.
    fn fill_in(&mut self, inode: usize) {
        let data = self.data;
        let nc = data.n_classes();
        let target = inode as i32;
        self.nodes.set_var(inode, 0);
        self.nodes.set_labels(inode, String::new(), String::new());
        if nc > 0 {
            let mut n1 = 0.0;
            for p in self.nodes.yprob_mut(inode).iter_mut() {
                *p = 0.0;
            }
            for j in 0..data.n_obs() {
                if self.where_pos[j] == target {
                    let w = data.weight(j);
                    n1 += w;
                    self.nodes.yprob_mut(inode)[data.class_index(j)] += w;
                }
            }
            self.nodes.set_n(inode, n1);
            // the parent's predicted class wins ties, keeping labels stable
            // through splits that do not change the majority
            let mut yparent: i64 = -1;
            if inode > 0 {
                let half = self.nodes.id(inode) / 2;
                for k in 0..inode {
                    if self.nodes.id(k) == half {
                        yparent = self.nodes.yval(k) as i64 - 1;
                    }
                }
            }
            let mut best = -1.0f64;
            let mut majority = 0usize;
            for k in 0..nc {
                let count = self.nodes.yprob(inode)[k];
                if count >= best {
                    if count == best {
                        if k as i64 == yparent {
                            majority = k;
                        }
                    } else {
                        majority = k;
                        best = count;
                    }
                }
            }
            for p in self.nodes.yprob_mut(inode).iter_mut() {
                if n1 > 0.0 {
                    *p /= n1;
                } else {
                    *p = 1.0 / nc as f64;
                }
            }
            if !self.preexisting[inode] {
                self.nodes.set_yval(inode, (majority + 1) as f64);
            }
            let mut sum = 0.0;
            for j in 0..data.n_obs() {
                if self.where_pos[j] == target {
                    let w = data.weight(j);
                    if w > 0.0 {
                        sum += w * self.nodes.yprob(inode)[data.class_index(j)].ln();
                    }
                }
            }
            self.nodes.set_dev(inode, -2.0 * sum);
        } else {
            let mut n1 = 0.0;
            let mut sum = 0.0;
            for j in 0..data.n_obs() {
                if self.where_pos[j] == target {
                    n1 += data.weight(j);
                    sum += data.weight(j) * data.y(j);
                }
            }
            self.nodes.set_n(inode, n1);
            let mean = sum / n1;
            self.nodes.set_yval(inode, mean);
            let mut ss = 0.0;
            for j in 0..data.n_obs() {
                if self.where_pos[j] == target {
                    let d = data.y(j) - mean;
                    ss += data.weight(j) * d * d;
                }
            }
            self.nodes.set_dev(inode, ss);
        }
    }

    /// Fills in node `inode`, searches every predictor for the best split,
    /// and if one beats the deviance target, writes both children and
    /// recurses depth-first.
    fn divide_node(&mut self, inode: usize) -> Result<(), TreeError> {
        if inode >= self.nodes.capacity() {
            return Err(TreeError::CapacityExceeded);
        }
        self.fill_in(inode);
        if self.nodes.n(inode) < self.min_size {
            return Ok(());
        }
        let root_dev = self.nodes.dev(0);
        let mut bval;
        let devtarget;
        if self.gini {
            let mut psq = 0.0;
            for &p in self.nodes.yprob(inode) {
                psq += p * p;
            }
            bval = 2.0 * self.nodes.n(inode) * (1.0 - psq);
            devtarget = bval;
        } else {
            bval = self.nodes.dev(inode);
            devtarget = bval - self.min_dev * root_dev;
        }
        if devtarget <= 1e-6 * root_dev {
            return Ok(());
        }
        log::debug!(
            "evaluating node at {} (id {}) size {}",
            inode,
            self.nodes.id(inode),
            self.nodes.n(inode)
        );
        for iv in 0..self.data.n_vars() {
            if self.data.levels()[iv] > 0 {
                self.split_categorical(inode, iv, devtarget, &mut bval)?;
            } else {
                self.split_continuous(inode, iv, devtarget, &mut bval)?;
            }
        }
        if bval >= devtarget {
            return Ok(());
        }
        log::debug!("splitting at value {}", bval);
        let id = self.nodes.id(inode);
        if id >= MAX_ID {
            return Err(TreeError::DepthExceeded);
        }

        // park the tail above the arena so the subtree can grow in place
        let nnode = self.nodes.len();
        let mut parked = None;
        if inode < nnode - 1 {
            debug_assert_eq!(self.avail_top, self.nodes.capacity());
            let dist = self.nodes.capacity() - nnode;
            for i in (inode + 1..nnode).rev() {
                self.relocate(i, i + dist);
            }
            self.nodes.set_len(inode + 1);
            self.avail_top = inode + 1 + dist;
            parked = Some(nnode);
        }

        let target = inode as i32;
        let left = self.append_child(2 * id)?;
        for j in 0..self.data.n_obs() {
            match self.scratch.routing[j] {
                0 => self.where_pos[j] = left as i32,
                r if r == NA_LEVEL => self.where_pos[j] += NA_LEVEL,
                _ => {}
            }
        }
        self.divide_node(left)?;

        let right = self.append_child(2 * id + 1)?;
        for j in 0..self.data.n_obs() {
            if self.where_pos[j] == target {
                self.where_pos[j] = right as i32;
            }
        }
        self.divide_node(right)?;

        if let Some(shifted) = parked {
            let shift = self.nodes.len() - inode - 1;
            let dist = self.nodes.capacity() - shifted;
            for i in inode + 1..shifted {
                self.relocate(i + dist, i + shift);
            }
            self.offset += shift;
            self.nodes.set_len(shifted + shift);
            self.avail_top = self.nodes.capacity();
        }
        Ok(())
    }

    /// Moves a whole record, its pre-existing flag and its members' working
    /// assignments (frozen ones included) from one slot to another.
    fn relocate(&mut self, from: usize, to: usize) {
        self.nodes.move_record(from, to);
        self.preexisting[to] = self.preexisting[from];
        let from_i = from as i32;
        let to_i = to as i32;
        for j in 0..self.data.n_obs() {
            if self.where_pos[j] == from_i {
                self.where_pos[j] = to_i;
            } else if self.where_pos[j] == from_i + NA_LEVEL {
                self.where_pos[j] = to_i + NA_LEVEL;
            }
        }
    }

    fn append_child(&mut self, id: i64) -> Result<usize, TreeError> {
        if self.nodes.len() >= self.avail_top {
            return Err(TreeError::CapacityExceeded);
        }
        let pos = self.nodes.append(id);
        self.preexisting[pos] = false;
        Ok(pos)
    }

    fn finish(self) -> GrownTree {
        let mut where_codes = Vec::with_capacity(self.data.n_obs());
        for j in 0..self.data.n_obs() {
            let v = self.where_pos[j];
            if v < 0 {
                let pos = (v - NA_LEVEL) as usize;
                where_codes.push(-self.nodes.id(pos));
            } else {
                where_codes.push(v as i64 + 1);
            }
        }
        GrownTree {
            nodes: self.nodes,
            where_codes,
        }
    }
}
