//! Exact path-dependent TreeSHAP (Lundberg et al., "Consistent Individualized
//! Feature Attribution for Tree Ensembles", algorithm 2).
//!
//! For one tree and one row the attributions satisfy
//! `expected_value + Σ phi = predict_row(row)`, where unknown features are
//! marginalized using the training cover of each branch.

use crate::tree::{Node, RegressionTree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

impl RegressionTree {
    /// Add this tree's attributions for `row` into `phi`.
    pub fn accumulate_shap(&self, row: &[f64], phi: &mut [f64]) {
        if self.nodes.is_empty() {
            return;
        }
        self.recurse(0, row, &[], 1.0, 1.0, None, phi);
    }

    #[allow(clippy::too_many_arguments)]
    fn recurse(
        &self,
        index: usize,
        row: &[f64],
        parent_path: &[PathElement],
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
        phi: &mut [f64],
    ) {
        let mut path = parent_path.to_vec();
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match &self.nodes[index] {
            Node::Leaf { value, .. } => {
                let depth = path.len() - 1;
                for i in 1..=depth {
                    let element = path[i];
                    if let Some(f) = element.feature {
                        let w = unwound_path_sum(&path, i);
                        phi[f] += w * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split_feature,
                threshold,
                left,
                right,
                cover,
                ..
            } => {
                let (hot, cold) = if row[*split_feature] <= *threshold {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                let hot_zero_fraction = self.nodes[hot].cover() / cover;
                let cold_zero_fraction = self.nodes[cold].cover() / cover;

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;

                // a feature already on the path is undone and re-applied here
                if let Some(k) = path
                    .iter()
                    .position(|e| e.feature == Some(*split_feature))
                {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.recurse(
                    hot,
                    row,
                    &path,
                    hot_zero_fraction * incoming_zero,
                    incoming_one,
                    Some(*split_feature),
                    phi,
                );
                self.recurse(
                    cold,
                    row,
                    &path,
                    cold_zero_fraction * incoming_zero,
                    0.0,
                    Some(*split_feature),
                    phi,
                );
            }
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].weight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].weight = path[i].weight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed,
/// without mutating it.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].weight - tmp * zero_fraction * ((depth - i) as f64 / denom);
        } else {
            total += (path[i].weight / zero_fraction) / ((depth - i) as f64 / denom);
        }
    }
    total
}
