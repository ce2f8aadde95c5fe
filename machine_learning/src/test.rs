#![cfg(test)]

use std::collections::BTreeSet;

use ndarray::array;

use crate::{
    arch::{ModelConfig, Selector},
    dataset::{GraphDataset, GraphInputs, Split},
    sparse::{CsrMatrix, GraphOperator, SparseOperator, WalkPolynomial},
    training::{TrainerBuilder, TrainingConfig},
};

const EDGES: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (0, 2)];
const NODES: usize = 4;

fn operator(entries: Vec<(usize, usize, f32)>) -> SparseOperator {
    let matrix = CsrMatrix::from_triplets((NODES, NODES), entries).unwrap();
    SparseOperator::new(matrix).unwrap()
}

/// A 4 node graph with 2 positive features, 2 classes and the split `{0}, {1}, {2, 3}`.
///
/// # Arguments
/// * `wavelets` - The amount of scattering wavelets to build.
pub fn toy_dataset(wavelets: u32) -> GraphDataset {
    let mut links = BTreeSet::new();
    for (u, v) in EDGES {
        links.insert((u, v));
        links.insert((v, u));
    }

    let mut degree = [0f32; NODES];
    for &(u, _) in &links {
        degree[u] += 1.;
    }

    let loops = (0..NODES).map(|i| (i, i));
    let with_loops: Vec<_> = links.iter().copied().chain(loops).collect();
    let aug = degree.map(|d| d + 1.);

    let adj = with_loops
        .iter()
        .map(|&(u, v)| (u, v, 1. / (aug[u] * aug[v]).sqrt()))
        .collect();

    let a_tilde = with_loops
        .iter()
        .map(|&(u, v)| (u, v, 1. / aug[u]))
        .collect();

    let walk: Vec<_> = links
        .iter()
        .map(|&(u, v)| (u, v, 0.5 / degree[v]))
        .chain((0..NODES).map(|i| (i, i, 0.5)))
        .collect();
    let walk = operator(walk);

    let inputs = GraphInputs {
        features: array![[1.0, 0.2], [0.4, 0.9], [0.7, 0.5], [0.1, 1.0]],
        adj: operator(adj),
        a_tilde: operator(a_tilde),
        wavelets: (1..=wavelets)
            .map(|scale| WalkPolynomial::wavelet(walk.clone(), scale).unwrap())
            .collect(),
    };

    let split = Split::new(vec![0], vec![1], vec![2, 3], NODES).unwrap();
    GraphDataset::new(inputs, vec![0, 1, 0, 1], split).unwrap()
}

#[test]
fn single_epoch_end_to_end() {
    let model = ModelConfig {
        nfeat: 2,
        hid1: 2,
        hid2: 2,
        nclass: 2,
        dropout: 0.5,
        smoo: 0.5,
        selectors: [Selector::new(1, 0), Selector::new(1, 1)],
    };

    let training = TrainingConfig {
        epochs: 1,
        ..Default::default()
    };

    let mut trainer = TrainerBuilder::new()
        .build(&model, &training, toy_dataset(2))
        .unwrap();
    let initial = trainer.params().to_vec();

    let history = trainer.train().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.val_accuracy().len(), 1);
    assert!(trainer.finished());
    assert_ne!(trainer.params(), initial);

    let test = trainer.test().unwrap();
    assert!(test.loss.is_finite() && test.loss >= 0.);
    assert!([0., 0.5, 1.].contains(&test.accuracy));
}

#[test]
fn toy_walk_is_column_stochastic() {
    let data = toy_dataset(1);
    let ones = ndarray::Array2::ones((NODES, 1));

    // 1ᵀ Ψ₁ = 0 only holds if 1ᵀ P = 1ᵀ.
    let got = data.inputs().wavelets[0].apply_transpose(ones.view()).unwrap();
    assert!(got.iter().all(|v| v.abs() < 1e-6));
}
