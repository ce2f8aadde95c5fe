use std::ops::Range;

use super::L1Mode;
use crate::arch::ParamTensor;

fn penalized(tensors: &[ParamTensor], mode: L1Mode) -> impl Iterator<Item = Range<usize>> + '_ {
    let selected = match mode {
        L1Mode::LastTensor => tensors.len().saturating_sub(1),
        L1Mode::AllTensors => 0,
    };

    tensors[selected..].iter().map(|t| t.range.clone())
}

/// Computes `Σ |p|` over the tensors selected by `mode`.
pub fn l1_penalty(params: &[f32], tensors: &[ParamTensor], mode: L1Mode) -> f32 {
    penalized(tensors, mode)
        .filter_map(|range| params.get(range))
        .flatten()
        .map(|p| p.abs())
        .sum()
}

/// Adds the subgradient `coeff · sign(p)` of the L1 penalty to `grad`.
///
/// Zero parameters get a zero subgradient.
pub fn add_l1_grad(
    params: &[f32],
    grad: &mut [f32],
    tensors: &[ParamTensor],
    mode: L1Mode,
    coeff: f32,
) {
    if coeff == 0. {
        return;
    }

    for range in penalized(tensors, mode) {
        let (Some(p), Some(g)) = (params.get(range.clone()), grad.get_mut(range)) else {
            continue;
        };

        for (g, &p) in g.iter_mut().zip(p) {
            if p != 0. {
                *g += coeff * p.signum();
            }
        }
    }
}
