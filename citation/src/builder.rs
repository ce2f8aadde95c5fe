use log::debug;
use machine_learning::{
    MlErr,
    dataset::{GraphDataset, GraphInputs, Split},
    sparse::{Backend, CsrMatrix, SparseOperator},
};
use ndarray::Array2;

use crate::{
    DataErr, Result, SplitSizes,
    normalization::{Links, Normalization, row_normalize, row_normalized_with_loops},
    planetoid_split,
    scattering::{lazy_walk, wavelets},
};

/// Builds a `GraphDataset` from in memory features, labels and edges.
///
/// Edges are undirected: duplicates and self loops are dropped and both directions are
/// linked.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    features: Array2<f32>,
    labels: Vec<usize>,
    edges: Vec<(usize, usize)>,
    normalization: Normalization,
    backend: Backend,
    wavelets: u32,
    normalize_features: bool,
}

impl GraphBuilder {
    /// Creates a new `GraphBuilder` for a graph without edges.
    ///
    /// # Arguments
    /// * `features` - The `nodes × features` matrix.
    /// * `labels` - One class id per node.
    pub fn new(features: Array2<f32>, labels: Vec<usize>) -> Self {
        Self {
            features,
            labels,
            edges: Vec::new(),
            normalization: Normalization::default(),
            backend: Backend::default(),
            wavelets: 0,
            normalize_features: true,
        }
    }

    pub fn edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        self.edges.extend(edges);
        self
    }

    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the amount of scattering wavelets to build.
    pub fn wavelets(mut self, count: u32) -> Self {
        self.wavelets = count;
        self
    }

    /// Whether the features are scaled so each row sums 1, on by default.
    pub fn normalize_features(mut self, normalize: bool) -> Self {
        self.normalize_features = normalize;
        self
    }

    /// Builds the dataset with the standard split over the nodes in their given order.
    pub fn build_planetoid(self, sizes: SplitSizes) -> Result<GraphDataset> {
        let num_classes = self.labels.iter().max().map_or(0, |&max| max + 1);
        let split = planetoid_split(self.labels.len(), num_classes, sizes)?;
        self.build(split)
    }

    /// Builds the dataset with an explicit split.
    pub fn build(self, split: Split) -> Result<GraphDataset> {
        let n = self.features.nrows();
        if n == 0 {
            return Err(DataErr::Empty("graph"));
        }

        let links = self.links(n)?;
        debug!("building operators for {n} nodes and {} links", links.len() / 2);

        let operator = |matrix: CsrMatrix| SparseOperator::new(matrix.with_backend(self.backend));
        let adj = operator(self.normalization.adjacency(&links, n)?)?;
        let a_tilde = operator(row_normalized_with_loops(&links, n)?)?;
        let walk = lazy_walk(&links, n)?.with_backend(self.backend);
        let wavelets = wavelets(walk, self.wavelets)?;

        let mut features = self.features;
        if self.normalize_features {
            row_normalize(&mut features);
        }

        let inputs = GraphInputs {
            features,
            adj,
            a_tilde,
            wavelets,
        };

        Ok(GraphDataset::new(inputs, self.labels, split)?)
    }

    fn links(&self, n: usize) -> Result<Links> {
        let mut links = Links::new();

        for &(u, v) in &self.edges {
            if let Some(&index) = [u, v].iter().find(|&&i| i >= n) {
                return Err(MlErr::IndexOutOfBounds {
                    what: "edge endpoint",
                    index,
                    len: n,
                }
                .into());
            }

            if u != v {
                links.insert((u, v));
                links.insert((v, u));
            }
        }

        Ok(links)
    }
}
