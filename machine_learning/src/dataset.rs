use std::collections::HashSet;

use ndarray::Array2;

use crate::{
    MlErr, Result,
    sparse::{GraphOperator, SparseOperator, WalkPolynomial},
};

/// The graph side inputs of the model: features plus every kernel it convolves with.
#[derive(Debug, Clone)]
pub struct GraphInputs {
    /// Dense `nodes × features` matrix.
    pub features: Array2<f32>,
    /// The symmetrically normalized adjacency with self loops.
    pub adj: SparseOperator,
    /// The row normalized adjacency with self loops used by the residual layer.
    pub a_tilde: SparseOperator,
    /// The scattering wavelets, indexed by the model's selectors.
    pub wavelets: Vec<WalkPolynomial>,
}

impl GraphInputs {
    pub fn num_nodes(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        let kernels = [self.adj.dim(), self.a_tilde.dim()]
            .into_iter()
            .chain(self.wavelets.iter().map(|w| w.dim()));

        for dim in kernels {
            if dim != n {
                return Err(MlErr::SizeMismatch {
                    what: "graph operator nodes",
                    got: dim,
                    expected: n,
                });
            }
        }

        Ok(())
    }
}

/// The train, validation and test node index sets.
///
/// They are disjoint and lie within `[0, nodes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    train: Vec<usize>,
    val: Vec<usize>,
    test: Vec<usize>,
}

impl Split {
    /// Creates a new `Split`.
    ///
    /// # Arguments
    /// * `train`, `val`, `test` - The node indices of each set.
    /// * `num_nodes` - The amount of nodes in the graph.
    ///
    /// # Returns
    /// A new `Split` or an error if any index is repeated or out of range.
    pub fn new(
        train: Vec<usize>,
        val: Vec<usize>,
        test: Vec<usize>,
        num_nodes: usize,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(train.len() + val.len() + test.len());

        for (name, set) in [("train", &train), ("val", &val), ("test", &test)] {
            for &idx in set {
                if idx >= num_nodes {
                    return Err(MlErr::InvalidSplit(format!(
                        "{name} index {idx} is out of range for {num_nodes} nodes"
                    )));
                }

                if !seen.insert(idx) {
                    return Err(MlErr::InvalidSplit(format!(
                        "{name} index {idx} appears more than once"
                    )));
                }
            }
        }

        Ok(Self { train, val, test })
    }

    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn val(&self) -> &[usize] {
        &self.val
    }

    pub fn test(&self) -> &[usize] {
        &self.test
    }
}

/// A fully loaded node classification problem.
#[derive(Debug, Clone)]
pub struct GraphDataset {
    inputs: GraphInputs,
    labels: Vec<usize>,
    num_classes: usize,
    split: Split,
}

impl GraphDataset {
    /// Creates a new `GraphDataset`.
    ///
    /// # Arguments
    /// * `inputs` - The features and graph kernels.
    /// * `labels` - One class id per node.
    /// * `split` - The train, validation and test sets.
    ///
    /// # Returns
    /// A new `GraphDataset` or an error if the node counts of the parts disagree.
    pub fn new(inputs: GraphInputs, labels: Vec<usize>, split: Split) -> Result<Self> {
        inputs.validate()?;

        if labels.len() != inputs.num_nodes() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: inputs.num_nodes(),
            });
        }

        let num_classes = labels.iter().max().map_or(0, |&max| max + 1);

        Ok(Self {
            inputs,
            labels,
            num_classes,
            split,
        })
    }

    pub fn inputs(&self) -> &GraphInputs {
        &self.inputs
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Returns the amount of classes, that is, the largest label plus one.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn num_nodes(&self) -> usize {
        self.inputs.num_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_accepts_disjoint_sets() {
        let split = Split::new(vec![0], vec![1], vec![2, 3], 4).unwrap();

        assert_eq!(split.train(), [0]);
        assert_eq!(split.val(), [1]);
        assert_eq!(split.test(), [2, 3]);
    }

    #[test]
    fn split_rejects_overlaps() {
        let res = Split::new(vec![0, 1], vec![1], vec![2], 4);
        assert!(matches!(res, Err(MlErr::InvalidSplit(_))));
    }

    #[test]
    fn split_rejects_out_of_range_indices() {
        let res = Split::new(vec![0], vec![1], vec![4], 4);
        assert!(matches!(res, Err(MlErr::InvalidSplit(_))));
    }
}
