//! Growth scenarios and structural invariants.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_cart::{grow, regrow, Dataset, GrowConfig, GrownTree, SplitCriterion, TreeError};

fn loose_config() -> GrowConfig {
    GrowConfig::builder()
        .min_cut(1.0)
        .min_size(2.0)
        .min_dev(0.0)
        .build()
        .unwrap()
}

#[test]
fn regression_step_function_splits_once() {
    // x = 1..6, y jumps from 0 to 10 between x=3 and x=4
    let data = Dataset::regression(
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        vec![0],
        vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
        vec![1.0; 6],
    )
    .unwrap();
    let tree = grow(&data, &loose_config()).unwrap();
    let nodes = &tree.nodes;

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes.id(0), 1);
    assert_eq!(nodes.var(0), 1);
    assert_eq!(nodes.cut_left(0), "<3.5");
    assert_eq!(nodes.cut_right(0), ">3.5");
    assert!((nodes.dev(0) - 150.0).abs() < 1e-9);

    // depth-first: left child right after the root
    assert_eq!(nodes.id(1), 2);
    assert_eq!(nodes.yval(1), 0.0);
    assert!(nodes.dev(1).abs() < 1e-12);
    assert_eq!(nodes.n(1), 3.0);

    assert_eq!(nodes.id(2), 3);
    assert_eq!(nodes.yval(2), 10.0);
    assert!(nodes.dev(2).abs() < 1e-12);

    assert_eq!(tree.where_codes, vec![2, 2, 2, 3, 3, 3]);
}

#[test]
fn classification_tie_prefers_parent_class() {
    // the best split isolates the pure pair, leaving a 50/50 child whose
    // label must follow the parent's majority
    let grow_with = |y: Vec<usize>| {
        let data = Dataset::classification(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0],
            y,
            2,
            vec![1.0; 4],
        )
        .unwrap();
        grow(&data, &loose_config()).unwrap()
    };

    let tree = grow_with(vec![2, 2, 1, 2]);
    let nodes = &tree.nodes;
    assert_eq!(nodes.yval(0), 2.0);
    // position 2 holds the {1, 2} child
    assert_eq!(nodes.id(2), 3);
    assert_eq!(nodes.yprob(2), &[0.5, 0.5]);
    assert_eq!(nodes.yval(2), 2.0);

    let tree = grow_with(vec![1, 1, 2, 1]);
    let nodes = &tree.nodes;
    assert_eq!(nodes.yval(0), 1.0);
    assert_eq!(nodes.yprob(2), &[0.5, 0.5]);
    assert_eq!(nodes.yval(2), 1.0);
}

#[test]
fn categorical_three_levels_uses_sorted_shortcut() {
    // levels {1,2} are class 1, level {3} class 2
    let data = Dataset::classification(
        vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0],
        vec![3],
        vec![1, 1, 1, 1, 2, 2],
        2,
        vec![1.0; 6],
    )
    .unwrap();
    let tree = grow(&data, &loose_config()).unwrap();
    let nodes = &tree.nodes;

    assert_eq!(nodes.var(0), 1);
    assert_eq!(nodes.cut_left(0), ":ab");
    assert_eq!(nodes.cut_right(0), ":c");
    assert_eq!(nodes.n(1), 4.0);
    assert_eq!(nodes.yval(1), 1.0);
    assert!(nodes.dev(1).abs() < 1e-12);
    assert_eq!(nodes.n(2), 2.0);
    assert_eq!(nodes.yval(2), 2.0);
}

#[test]
fn missing_value_freezes_case_at_ancestor() {
    let mut x: Vec<f64> = (1..=9).map(|v| v as f64).collect();
    x.push(f64::NAN);
    let mut y = vec![0.0; 5];
    y.extend_from_slice(&[10.0, 10.0, 10.0, 10.0, 5.0]);
    let data = Dataset::regression(x, vec![0], y, vec![1.0; 10]).unwrap();
    let tree = grow(&data, &loose_config()).unwrap();
    let nodes = &tree.nodes;

    // the split ignores the missing row; its deviance contribution rides on
    // every candidate equally
    assert_eq!(nodes.var(0), 1);
    assert_eq!(nodes.cut_left(0), "<5.5");
    assert_eq!(nodes.n(0), 10.0);
    assert_eq!(nodes.n(1), 5.0);
    assert_eq!(nodes.n(2), 4.0);
    assert!(nodes.dev(1).abs() < 1e-9);
    assert!(nodes.dev(2).abs() < 1e-9);

    // the missing row stalls at the root, encoded as minus its heap id
    assert_eq!(tree.where_codes[9], -1);
    for j in 0..5 {
        assert_eq!(tree.where_codes[j], 2);
    }
    for j in 5..9 {
        assert_eq!(tree.where_codes[j], 3);
    }
}

#[test]
fn gini_with_missing_values_fails() {
    let data = Dataset::classification(
        vec![1.0, 2.0, 3.0, f64::NAN],
        vec![0],
        vec![1, 1, 2, 2],
        2,
        vec![1.0; 4],
    )
    .unwrap();
    let config = GrowConfig::builder()
        .min_cut(1.0)
        .min_size(2.0)
        .min_dev(0.0)
        .criterion(SplitCriterion::Gini)
        .build()
        .unwrap();
    let err = grow(&data, &config).unwrap_err();
    assert_eq!(err.to_string(), "cannot use 'Gini' with missing values");
}

#[test]
fn gini_growth_matches_deviance_structure_on_clean_split() {
    let data = Dataset::classification(
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        vec![0],
        vec![1, 1, 1, 2, 2, 2],
        2,
        vec![1.0; 6],
    )
    .unwrap();
    let config = GrowConfig::builder()
        .min_cut(1.0)
        .min_size(2.0)
        .min_dev(0.0)
        .criterion(SplitCriterion::Gini)
        .build()
        .unwrap();
    let tree = grow(&data, &config).unwrap();
    assert_eq!(tree.nodes.len(), 3);
    assert_eq!(tree.nodes.cut_left(0), "<3.5");
    assert_eq!(tree.nodes.yval(1), 1.0);
    assert_eq!(tree.nodes.yval(2), 2.0);
}

fn random_classification() -> Dataset {
    let mut rng = StdRng::seed_from_u64(42);
    let n = 150;
    let mut col0 = Vec::with_capacity(n);
    let mut col1 = Vec::with_capacity(n);
    let mut col2 = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);
    for _ in 0..n {
        let a: f64 = rng.gen_range(0.0..10.0);
        let level = rng.gen_range(1..=4u32) as f64;
        let b: f64 = rng.gen_range(-1.0..1.0);
        let class = if a < 3.0 {
            1
        } else if level >= 3.0 && rng.gen_bool(0.8) {
            2
        } else {
            3
        };
        col0.push(a);
        col1.push(level);
        col2.push(b);
        y.push(class);
        w.push(if rng.gen_bool(0.5) { 1.0 } else { 2.0 });
    }
    let mut x = col0;
    x.extend(col1);
    x.extend(col2);
    Dataset::classification(x, vec![0, 4, 0], y, 3, w).unwrap()
}

/// Weight of every observation whose root-to-leaf path passes through each
/// node, resolved through the parent chain.
fn routed_weight(tree: &GrownTree, weights: &[f64]) -> Vec<f64> {
    let parents = tree.nodes.parents();
    let mut routed = vec![0.0; tree.nodes.len()];
    for (j, &code) in tree.where_codes.iter().enumerate() {
        let mut pos = if code > 0 {
            code as usize - 1
        } else {
            tree.nodes.position_of(-code).unwrap()
        };
        routed[pos] += weights[j];
        while let Some(p) = parents[pos] {
            pos = p;
            routed[pos] += weights[j];
        }
    }
    routed
}

fn subtree_span(tree: &GrownTree, left: &[usize], right: &[usize], pos: usize) -> usize {
    if tree.nodes.is_leaf(pos) {
        1
    } else {
        1 + subtree_span(tree, left, right, left[pos])
            + subtree_span(tree, left, right, right[pos])
    }
}

#[test]
fn growth_invariants_hold_on_random_data() {
    let data = random_classification();
    let weights: Vec<f64> = (0..data.n_obs()).map(|j| data.weight(j)).collect();
    let config = GrowConfig::builder()
        .min_cut(2.0)
        .min_size(5.0)
        .min_dev(0.005)
        .build()
        .unwrap();
    let tree = grow(&data, &config).unwrap();
    let nodes = &tree.nodes;
    assert!(nodes.len() > 3, "expected a non-trivial tree");

    // member weight per node matches the routed weight exactly
    let routed = routed_weight(&tree, &weights);
    for i in 0..nodes.len() {
        assert!(
            (routed[i] - nodes.n(i)).abs() < 1e-9 * nodes.n(0),
            "node {} holds {} but routes {}",
            i,
            nodes.n(i),
            routed[i]
        );
    }

    // heap ids and depth-first placement
    let (left, right) = nodes.children();
    for i in 0..nodes.len() {
        if nodes.is_leaf(i) {
            continue;
        }
        assert!(left[i] < nodes.len(), "internal node {} lacks a left child", i);
        assert!(right[i] < nodes.len(), "internal node {} lacks a right child", i);
        assert_eq!(nodes.id(left[i]), 2 * nodes.id(i));
        assert_eq!(nodes.id(right[i]), 2 * nodes.id(i) + 1);
        assert_eq!(left[i], i + 1, "left child must follow its parent");
        assert_eq!(
            right[i],
            left[i] + subtree_span(&tree, &left, &right, left[i]),
            "right child must follow the left subtree"
        );
        // splitting never increases total deviance
        assert!(
            nodes.dev(i) >= nodes.dev(left[i]) + nodes.dev(right[i]) - 1e-9 * nodes.dev(0)
        );
        // both children honour the minimum cut weight
        assert!(nodes.n(left[i]) >= config.min_cut);
        assert!(nodes.n(right[i]) >= config.min_cut);
    }

    // class probabilities are normalized everywhere
    for i in 0..nodes.len() {
        let total: f64 = nodes.yprob(i).iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "node {} probs sum to {}", i, total);
    }

    // no duplicate heap ids
    let mut ids: Vec<i64> = (0..nodes.len()).map(|i| nodes.id(i)).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), nodes.len());
}

#[test]
fn regrow_expands_existing_leaves_in_place() {
    let data = Dataset::regression(
        (1..=8).map(|v| v as f64).collect(),
        vec![0],
        vec![0.0, 0.0, 1.0, 1.0, 10.0, 10.0, 11.0, 11.0],
        vec![1.0; 8],
    )
    .unwrap();
    // one split only: the children stay below min_size
    let coarse = GrowConfig::builder()
        .min_cut(1.0)
        .min_size(8.0)
        .min_dev(0.0)
        .build()
        .unwrap();
    let tree = grow(&data, &coarse).unwrap();
    assert_eq!(tree.nodes.len(), 3);
    assert_eq!(tree.where_codes, vec![2, 2, 2, 2, 3, 3, 3, 3]);

    let fine = GrowConfig::builder()
        .min_cut(1.0)
        .min_size(2.0)
        .min_dev(0.0)
        .build()
        .unwrap();
    let tree = regrow(&data, &fine, tree).unwrap();
    let nodes = &tree.nodes;

    // splitting the middle leaf exercised the shift-up/shift-down path and
    // the table stayed depth-first
    let got: Vec<i64> = (0..nodes.len()).map(|i| nodes.id(i)).collect();
    assert_eq!(got, vec![1, 2, 4, 5, 3, 6, 7]);
    assert_eq!(tree.where_codes, vec![3, 3, 4, 4, 6, 6, 7, 7]);
    for (pos, yval) in [(2usize, 0.0), (3, 1.0), (5, 10.0), (6, 11.0)] {
        assert_eq!(nodes.yval(pos), yval);
        assert!(nodes.dev(pos).abs() < 1e-12);
    }
}

#[test]
fn capacity_overflow_is_reported() {
    let data = random_classification();
    let config = GrowConfig::builder()
        .min_cut(2.0)
        .min_size(5.0)
        .min_dev(0.0)
        .max_nodes(5)
        .build()
        .unwrap();
    match grow(&data, &config) {
        Err(TreeError::CapacityExceeded) => {}
        other => panic!("expected CapacityExceeded, got {:?}", other.map(|t| t.nodes.len())),
    }
}
