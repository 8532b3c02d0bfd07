//! Per-growth scratch buffers.

/// Work buffers reused across every split of one growth invocation.
///
/// Sized once from the observation count, the widest categorical predictor
/// and the class count; never grown mid-computation. Each growth owns its
/// arena exclusively, so independent growths can run side by side.
#[derive(Debug)]
pub(crate) struct ScratchArena {
    /// Observed predictor values of the current node's members.
    pub xs: Vec<f64>,
    /// 0-based class codes carried alongside `xs` through the sort.
    pub classes: Vec<usize>,
    /// Regression responses carried alongside `xs` through the sort.
    pub responses: Vec<f64>,
    /// Weights carried alongside `xs` through the sort.
    pub ws: Vec<f64>,
    /// Per-observation level slot: 0-based level, `NA_LEVEL` for missing,
    /// -1 outside the current node.
    pub member_level: Vec<i32>,
    /// Routing signal of the best split so far: 0 left, 1 right, `NA_LEVEL`
    /// missing at this node, -1 outside.
    pub routing: Vec<i32>,
    /// Presence flag per original level.
    pub seen: Vec<bool>,
    /// Compaction map: `present[l]` is the original index of the l-th
    /// present level.
    pub present: Vec<usize>,
    /// Weight per level (original indexing, then compacted in place).
    pub cnt: Vec<f64>,
    /// Weighted class-by-level counts, `class + n_classes * level`.
    pub tab: Vec<f64>,
    /// Weighted response sum per level.
    pub ys: Vec<f64>,
    /// Per-level score and a sorted copy of it.
    pub score: Vec<f64>,
    pub sorted_score: Vec<f64>,
    /// Throwaway payload/weight lanes for sorting scores.
    pub score_payload: Vec<usize>,
    pub score_weight: Vec<f64>,
    /// Left-side membership over compacted levels.
    pub left_compact: Vec<bool>,
    /// Left-side membership over the full level space.
    pub left_full: Vec<bool>,
}

impl ScratchArena {
    pub fn new(n_obs: usize, max_levels: usize, n_classes: usize) -> Self {
        let nl = max_levels.max(1);
        Self {
            xs: vec![0.0; n_obs],
            classes: vec![0; n_obs],
            responses: vec![0.0; n_obs],
            ws: vec![0.0; n_obs],
            member_level: vec![0; n_obs],
            routing: vec![-1; n_obs],
            seen: vec![false; nl],
            present: vec![0; nl],
            cnt: vec![0.0; nl],
            tab: vec![0.0; nl.max(2) * n_classes.max(1)],
            ys: vec![0.0; nl],
            score: vec![0.0; nl],
            sorted_score: vec![0.0; nl],
            score_payload: vec![0; nl],
            score_weight: vec![0.0; nl],
            left_compact: vec![false; nl],
            left_full: vec![false; nl],
        }
    }
}
