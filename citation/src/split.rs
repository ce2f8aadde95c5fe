use machine_learning::dataset::Split;
use serde::Serialize;

use crate::{DataErr, Result};

/// The sizes of the standard semi supervised split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSizes {
    pub train_per_class: usize,
    pub val: usize,
    pub test: usize,
}

impl Default for SplitSizes {
    fn default() -> Self {
        Self {
            train_per_class: 20,
            val: 500,
            test: 1000,
        }
    }
}

/// Splits the nodes in file order: the first `train_per_class · classes` nodes train, the
/// next `val` validate and the last `test` nodes test.
///
/// # Returns
/// The split or an error if the sets don't fit in the graph without overlapping.
pub fn planetoid_split(num_nodes: usize, num_classes: usize, sizes: SplitSizes) -> Result<Split> {
    let train_end = sizes.train_per_class * num_classes;
    let val_end = train_end + sizes.val;

    let Some(test_start) = num_nodes.checked_sub(sizes.test) else {
        return Err(DataErr::Split(format!(
            "{} test nodes requested from a graph of {num_nodes}",
            sizes.test
        )));
    };

    if val_end > test_start {
        return Err(DataErr::Split(format!(
            "train and validation take {val_end} nodes but testing starts at node {test_start}"
        )));
    }

    let split = Split::new(
        (0..train_end).collect(),
        (train_end..val_end).collect(),
        (test_start..num_nodes).collect(),
        num_nodes,
    )?;

    Ok(split)
}
