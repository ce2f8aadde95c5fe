use std::{collections::HashMap, fs, path::Path};

use log::{info, warn};
use machine_learning::{MlErr, dataset::GraphDataset, sparse::Backend};
use ndarray::Array2;
use serde::Serialize;

use crate::{DataErr, GraphBuilder, Normalization, Result, SplitSizes};

/// How a citation dataset is turned into model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadOptions {
    pub normalization: Normalization,
    pub backend: Backend,
    /// The amount of scattering wavelets to build.
    pub wavelets: u32,
    pub split: SplitSizes,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            normalization: Normalization::default(),
            backend: Backend::default(),
            wavelets: 5,
            split: SplitSizes::default(),
        }
    }
}

/// Loads the `<dataset>.content` and `<dataset>.cites` files found in `dir`.
///
/// Every content line holds a node id, its features and its label name, all separated by
/// whitespace. Every cites line holds the two node ids of an edge. Label names get class
/// ids in order of first appearance.
///
/// # Arguments
/// * `dir` - The directory holding the dataset files.
/// * `dataset` - The file stem, e.g. `cora`.
/// * `options` - The normalization, backend, wavelets and split to use.
///
/// # Returns
/// The loaded dataset or an error if a file is missing or malformed.
pub fn load_citation(dir: &Path, dataset: &str, options: &LoadOptions) -> Result<GraphDataset> {
    info!("Loading {dataset} dataset...");

    let content_path = dir.join(format!("{dataset}.content"));
    let cites_path = dir.join(format!("{dataset}.cites"));

    let content = parse_content(&content_path, &read(&content_path)?)?;
    let edges = parse_cites(&cites_path, &read(&cites_path)?, &content.ids)?;

    info!(
        "{} nodes, {} features, {} classes, {} edges",
        content.features.nrows(),
        content.features.ncols(),
        content.classes,
        edges.len()
    );

    GraphBuilder::new(content.features, content.labels)
        .edges(edges)
        .normalization(options.normalization)
        .backend(options.backend)
        .wavelets(options.wavelets)
        .build_planetoid(options.split)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| DataErr::Io {
        path: path.to_path_buf(),
        source,
    })
}

struct Content {
    ids: HashMap<String, usize>,
    features: Array2<f32>,
    labels: Vec<usize>,
    classes: usize,
}

fn parse_error(path: &Path, line: usize, msg: String) -> DataErr {
    DataErr::Parse {
        path: path.to_path_buf(),
        line,
        msg,
    }
}

fn parse_content(path: &Path, text: &str) -> Result<Content> {
    let mut ids = HashMap::new();
    let mut classes = HashMap::new();
    let mut labels = Vec::new();
    let mut flat = Vec::new();
    let mut num_features = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let tokens: Vec<_> = line.split_whitespace().collect();
        let [id, features @ .., label] = tokens.as_slice() else {
            if !tokens.is_empty() {
                return Err(parse_error(
                    path,
                    line_no,
                    "expected a node id, its features and a label".into(),
                ));
            }

            continue;
        };

        let expected = *num_features.get_or_insert(features.len());
        if features.len() != expected {
            return Err(parse_error(
                path,
                line_no,
                format!("expected {expected} features, got {}", features.len()),
            ));
        }

        for token in features {
            let value = token.parse::<f32>().map_err(|e| {
                parse_error(path, line_no, format!("invalid feature {token:?}: {e}"))
            })?;
            flat.push(value);
        }

        let node = ids.len();
        if ids.insert(id.to_string(), node).is_some() {
            return Err(parse_error(path, line_no, format!("node {id:?} is repeated")));
        }

        let next_class = classes.len();
        labels.push(*classes.entry(label.to_string()).or_insert(next_class));
    }

    if labels.is_empty() {
        return Err(DataErr::Empty("content file"));
    }

    let shape = (labels.len(), num_features.unwrap_or(0));
    let features = Array2::from_shape_vec(shape, flat).map_err(MlErr::from)?;

    Ok(Content {
        ids,
        features,
        labels,
        classes: classes.len(),
    })
}

fn parse_cites(
    path: &Path,
    text: &str,
    ids: &HashMap<String, usize>,
) -> Result<Vec<(usize, usize)>> {
    let mut edges = Vec::new();
    let node = |id: &str, line: usize| {
        ids.get(id).copied().ok_or_else(|| DataErr::UnknownNode {
            path: path.to_path_buf(),
            line,
            id: id.to_string(),
        })
    };

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let tokens: Vec<_> = line.split_whitespace().collect();

        match tokens.as_slice() {
            [] => continue,
            [cited, citing] => edges.push((node(*cited, line_no)?, node(*citing, line_no)?)),
            _ => {
                return Err(parse_error(
                    path,
                    line_no,
                    format!("expected 2 node ids, got {}", tokens.len()),
                ));
            }
        }
    }

    if edges.is_empty() {
        warn!("{} holds no edges", path.display());
    }

    Ok(edges)
}
