use nalgebra::DMatrix;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

/// Arena node. `cover` is the number of training samples (with bootstrap
/// multiplicity) that reached the node; `value` is their mean target.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf {
        value: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        value: f64,
        cover: f64,
    },
}

impl Node {
    pub(crate) fn value(&self) -> f64 {
        match self {
            Node::Leaf { value, .. } | Node::Split { value, .. } => *value,
        }
    }

    pub(crate) fn cover(&self) -> f64 {
        match self {
            Node::Leaf { cover, .. } | Node::Split { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
}

/// CART regression tree with squared-error splits
#[derive(Debug, Clone)]
pub struct RegressionTree {
    pub(crate) nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree over the rows listed in `samples`; repeated indices count
    /// once per occurrence.
    pub(crate) fn fit(
        x: &DMatrix<f64>,
        y: &[f64],
        samples: &mut [usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if !samples.is_empty() {
            tree.grow(x, y, samples, 0, params);
        }
        tree
    }

    fn grow(
        &mut self,
        x: &DMatrix<f64>,
        y: &[f64],
        samples: &mut [usize],
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let n = samples.len();
        let value = samples.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
        let cover = n as f64;

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value, cover });

        let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
        if n < params.min_samples_split || depth_reached || is_pure(y, samples) {
            return node_id;
        }

        let Some(split) = best_split(x, y, samples, params.min_samples_leaf) else {
            return node_id;
        };

        samples.sort_by(|&a, &b| x[(a, split.feature)].total_cmp(&x[(b, split.feature)]));
        let mid = samples.partition_point(|&i| x[(i, split.feature)] <= split.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(mid);

        let left = self.grow(x, y, left_samples, depth + 1, params);
        let right = self.grow(x, y, right_samples, depth + 1, params);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            value,
            cover,
        };
        node_id
    }

    /// Follow the decision path of `row` to a leaf value.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Cover-weighted mean of the leaves, i.e. the prediction when no
    /// feature is known.
    pub fn expected_value(&self) -> f64 {
        self.nodes.first().map(Node::value).unwrap_or(0.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

fn is_pure(y: &[f64], samples: &[usize]) -> bool {
    let first = y[samples[0]];
    samples.iter().all(|&i| y[i] == first)
}

/// Best squared-error split over every feature. Thresholds sit halfway
/// between consecutive distinct values; ties keep the first candidate found.
fn best_split(
    x: &DMatrix<f64>,
    y: &[f64],
    samples: &[usize],
    min_samples_leaf: usize,
) -> Option<Split> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();

    let mut best: Option<(f64, Split)> = None;
    let mut order = samples.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[(a, feature)].total_cmp(&x[(b, feature)]));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += y[order[k - 1]];

            let lo = x[(order[k - 1], feature)];
            let hi = x[(order[k], feature)];
            if lo >= hi {
                continue;
            }
            if k < min_samples_leaf || n - k < min_samples_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            // maximizing this is equivalent to minimizing the children's SSE
            let proxy = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;

            if best.as_ref().map_or(true, |(score, _)| proxy > *score) {
                let mut threshold = lo / 2.0 + hi / 2.0;
                if threshold >= hi || !threshold.is_finite() {
                    threshold = lo;
                }
                best = Some((proxy, Split { feature, threshold }));
            }
        }
    }

    best.map(|(_, split)| split)
}
