use std::{cell::RefCell, rc::Rc};

use log::debug;
use ndarray::{Array2, ArrayView2, Axis, s};
use rand::Rng;
use serde::Serialize;

use super::{
    Mode, Model, ParamTensor,
    activations::ActFn,
    layers::{Dropout, GraphChannel, LogSoftmax, ResidualConv},
};
use crate::{
    MlErr, Result,
    dataset::GraphInputs,
    initialization::{ChainedParamGen, ParamGen, RandParamGen},
    sparse::{GraphOperator, MatrixPower, ResidualOperator},
};

/// The amount of low pass channels, using the first, second and third adjacency powers.
const LOW_PASS_CHANNELS: u32 = 3;

/// Picks one scattering wavelet and the order of the modulus applied after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selector {
    /// The exponent `q` of `|·|^q`.
    pub order: u32,
    /// The 0-based index into the loaded wavelets.
    pub index: usize,
}

impl Selector {
    pub fn new(order: u32, index: usize) -> Self {
        Self { order, index }
    }
}

/// Sizing and regularization of a `ScatteringGcn`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub nfeat: usize,
    /// Width of each low pass channel.
    pub hid1: usize,
    /// Width of each band pass channel.
    pub hid2: usize,
    pub nclass: usize,
    pub dropout: f32,
    /// The residual layer's smoothing coefficient `α`.
    pub smoo: f32,
    pub selectors: [Selector; 2],
}

#[derive(Debug, Clone, Copy)]
enum Kernel {
    LowPass(u32),
    BandPass(usize),
}

impl Kernel {
    fn resolve<'a>(&self, inputs: &'a GraphInputs) -> Result<Box<dyn GraphOperator + 'a>> {
        match *self {
            Kernel::LowPass(power) => Ok(Box::new(MatrixPower::new(&inputs.adj, power))),
            Kernel::BandPass(index) => match inputs.wavelets.get(index) {
                Some(wavelet) => Ok(Box::new(wavelet)),
                None => Err(MlErr::InvalidSelector {
                    index,
                    available: inputs.wavelets.len(),
                }),
            },
        }
    }
}

/// A graph convolutional network augmented with scattering channels.
///
/// The first layer concatenates three low pass channels `ReLU(Aᵏ X W + b)` and two band pass
/// channels `|Ψ X W + b|^q`, the hidden representation then goes through dropout and a
/// residual graph convolution that outputs class log probabilities.
#[derive(Debug, Clone)]
pub struct ScatteringGcn {
    channels: Vec<(Kernel, GraphChannel)>,
    dropout: Dropout,
    residual: ResidualConv,
    log_softmax: LogSoftmax,
    smoo: f32,
    nfeat: usize,

    tensors: Vec<ParamTensor>,
    size: usize,
}

impl ScatteringGcn {
    /// Creates a new `ScatteringGcn`.
    ///
    /// # Arguments
    /// * `config` - The sizing of the model.
    ///
    /// # Returns
    /// A new `ScatteringGcn` or an error if some dimension is zero or a coefficient is out
    /// of its domain.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let &ModelConfig {
            nfeat,
            hid1,
            hid2,
            nclass,
            dropout,
            smoo,
            selectors,
        } = config;

        if [nfeat, hid1, hid2, nclass].contains(&0) {
            return Err(MlErr::InvalidConfig(format!(
                "model dimensions must be positive, got {config:?}"
            )));
        }

        if smoo.is_nan() || smoo < 0. {
            return Err(MlErr::InvalidConfig(format!(
                "smoothing coefficient must be non negative, got {smoo}"
            )));
        }

        let low_pass = (1..=LOW_PASS_CHANNELS)
            .map(|power| (Kernel::LowPass(power), GraphChannel::new((nfeat, hid1), ActFn::relu())));

        let band_pass = selectors.iter().map(|sel| {
            let layer = GraphChannel::new((nfeat, hid2), ActFn::modulus(sel.order));
            (Kernel::BandPass(sel.index), layer)
        });

        let channels: Vec<_> = low_pass.chain(band_pass).collect();
        let width: usize = channels.iter().map(|(_, c)| c.dim().1).sum();
        let residual = ResidualConv::new((width, nclass));

        let mut tensors = Vec::with_capacity(2 * (channels.len() + 1));
        let mut offset = 0;
        let names = ["low1", "low2", "low3", "band1", "band2"];
        let dims = channels
            .iter()
            .map(|(_, c)| c.dim())
            .chain([residual.dim()]);

        for (name, (fan_in, fan_out)) in names.into_iter().chain(["residual"]).zip(dims) {
            for (kind, len) in [("weight", fan_in * fan_out), ("bias", fan_out)] {
                tensors.push(ParamTensor {
                    name: format!("{name}.{kind}"),
                    range: offset..offset + len,
                    fan_out,
                });
                offset += len;
            }
        }

        debug!(
            "built scattering gcn: {} channels, hidden width {width}, {offset} parameters",
            channels.len()
        );

        Ok(Self {
            channels,
            dropout: Dropout::new(dropout)?,
            residual,
            log_softmax: LogSoftmax::new(),
            smoo,
            nfeat,
            tensors,
            size: offset,
        })
    }

    /// Samples the initial parameters, every tensor being drawn from `U(-1/√out, 1/√out)`.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The flat parameter buffer.
    pub fn init_params<R: Rng + 'static>(&self, rng: Rc<RefCell<R>>) -> Result<Vec<f32>> {
        let mut gens: Vec<Box<dyn ParamGen>> = Vec::with_capacity(self.tensors.len());

        for tensor in &self.tensors {
            let len = tensor.range.len();
            let param_gen = RandParamGen::fan_out_uniform(rng.clone(), len, tensor.fan_out)?;

            gens.push(Box::new(param_gen));
        }

        let params = ChainedParamGen::new(gens)
            .sample(self.size)
            .unwrap_or_default();

        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: self.size,
            });
        }

        Ok(params)
    }

    fn layer_sizes(&self) -> Vec<usize> {
        self.channels
            .iter()
            .map(|(_, c)| c.size())
            .chain([self.residual.size()])
            .collect()
    }

    fn check(&self, params: &[f32], inputs: &GraphInputs) -> Result<()> {
        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: self.size,
            });
        }

        if inputs.num_features() != self.nfeat {
            return Err(MlErr::SizeMismatch {
                what: "node features",
                got: inputs.num_features(),
                expected: self.nfeat,
            });
        }

        Ok(())
    }
}

impl Model for ScatteringGcn {
    fn size(&self) -> usize {
        self.size
    }

    fn tensors(&self) -> &[ParamTensor] {
        &self.tensors
    }

    fn forward<R: Rng + ?Sized>(
        &mut self,
        params: &[f32],
        inputs: &GraphInputs,
        mode: Mode,
        rng: &mut R,
    ) -> Result<Array2<f32>> {
        self.check(params, inputs)?;

        let sizes = self.layer_sizes();
        let slices = split_params(params, &sizes)?;
        let x = inputs.features.view();
        let mut outputs = Vec::with_capacity(self.channels.len());

        for ((kernel, channel), p) in self.channels.iter_mut().zip(&slices) {
            let op = kernel.resolve(inputs)?;
            outputs.push(channel.forward(p, x, op.as_ref())?);
        }

        let views: Vec<_> = outputs.iter().map(|o| o.view()).collect();
        let h = ndarray::concatenate(Axis(1), &views)?;
        let h = self.dropout.forward(h, mode, rng)?;

        let residual = ResidualOperator::new(&inputs.a_tilde, self.smoo);
        let z = self.residual.forward(slices[slices.len() - 1], h, &residual)?;

        Ok(self.log_softmax.forward(z))
    }

    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        inputs: &GraphInputs,
        d_out: ArrayView2<f32>,
    ) -> Result<()> {
        self.check(params, inputs)?;

        let sizes = self.layer_sizes();
        let slices = split_params(params, &sizes)?;
        let mut grads = split_grad(grad, &sizes)?;
        let Some((g_res, g_channels)) = grads.split_last_mut() else {
            return Err(MlErr::SizeMismatch {
                what: "model layers",
                got: 0,
                expected: sizes.len(),
            });
        };

        let dz = self.log_softmax.backward(d_out)?;
        let residual = ResidualOperator::new(&inputs.a_tilde, self.smoo);
        let dh = self
            .residual
            .backward(slices[slices.len() - 1], g_res, &residual, dz.view())?;
        let dh = self.dropout.backward(dh);

        let x = inputs.features.view();
        let mut col = 0;

        for ((kernel, channel), g) in self.channels.iter_mut().zip(g_channels.iter_mut()) {
            let width = channel.dim().1;
            let op = kernel.resolve(inputs)?;
            channel.backward(g, x, op.as_ref(), dh.slice(s![.., col..col + width]))?;
            col += width;
        }

        Ok(())
    }
}

/// Splits `params` in consecutive chunks of the given sizes.
fn split_params<'a>(params: &'a [f32], sizes: &[usize]) -> Result<Vec<&'a [f32]>> {
    check_total(params.len(), sizes)?;

    let mut rest = params;
    let mut chunks = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let chunk;
        (chunk, rest) = rest.split_at(size);
        chunks.push(chunk);
    }

    Ok(chunks)
}

/// Splits `grad` in consecutive mutable chunks of the given sizes.
fn split_grad<'a>(grad: &'a mut [f32], sizes: &[usize]) -> Result<Vec<&'a mut [f32]>> {
    check_total(grad.len(), sizes)?;

    let mut rest = grad;
    let mut chunks = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let chunk;
        (chunk, rest) = rest.split_at_mut(size);
        chunks.push(chunk);
    }

    Ok(chunks)
}

fn check_total(len: usize, sizes: &[usize]) -> Result<()> {
    let expected = sizes.iter().sum();
    if len != expected {
        return Err(MlErr::SizeMismatch {
            what: "parameter buffer",
            got: len,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::loss::{LossFn, NllLoss},
        test::toy_dataset,
    };

    fn config(nfeat: usize, nclass: usize) -> ModelConfig {
        ModelConfig {
            nfeat,
            hid1: 3,
            hid2: 2,
            nclass,
            dropout: 0.5,
            smoo: 0.5,
            selectors: [Selector::new(2, 0), Selector::new(2, 1)],
        }
    }

    #[test]
    fn tensors_cover_the_buffer_in_order() {
        let model = ScatteringGcn::new(&config(2, 2)).unwrap();
        let tensors = model.tensors();

        assert_eq!(tensors.len(), 12);
        assert_eq!(tensors[0].range.start, 0);
        for pair in tensors.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
        }

        let last = tensors.last().unwrap();
        assert_eq!(last.name, "residual.bias");
        assert_eq!(last.range.len(), 2);
        assert_eq!(last.range.end, model.size());

        // 3 low pass (2·3 + 3) + 2 band pass (2·2 + 2) + residual ((9 + 4)·2 + 2)
        assert_eq!(model.size(), 3 * 9 + 2 * 6 + 28);
    }

    #[test]
    fn init_is_seeded_and_bounded() {
        let model = ScatteringGcn::new(&config(2, 2)).unwrap();
        let init = || {
            let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(42)));
            model.init_params(rng).unwrap()
        };

        let params = init();
        assert_eq!(params, init());
        assert_eq!(params.len(), model.size());

        for tensor in model.tensors() {
            let stdv = 1. / (tensor.fan_out as f32).sqrt();
            assert!(params[tensor.range.clone()].iter().all(|p| p.abs() <= stdv));
        }
    }

    #[test]
    fn forward_outputs_log_probabilities() {
        let data = toy_dataset(3);
        let mut model = ScatteringGcn::new(&config(2, 2)).unwrap();
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(42)));
        let params = model.init_params(rng.clone()).unwrap();

        let out = model
            .forward(&params, data.inputs(), Mode::Train, &mut *rng.borrow_mut())
            .unwrap();

        assert_eq!(out.dim(), (4, 2));
        for row in out.axis_iter(Axis(0)) {
            let total: f32 = row.iter().map(|v| v.exp()).sum();
            assert!((total - 1.).abs() < 1e-5);
        }
    }

    #[test]
    fn invalid_selectors_fail_on_forward() {
        let data = toy_dataset(2);
        let mut cfg = config(2, 2);
        cfg.selectors[1].index = 4;

        let mut model = ScatteringGcn::new(&cfg).unwrap();
        let params = vec![0.1; model.size()];
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            model.forward(&params, data.inputs(), Mode::Eval, &mut rng),
            Err(MlErr::InvalidSelector {
                index: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn invalid_configs_fail() {
        let mut cfg = config(2, 2);
        cfg.hid1 = 0;
        assert!(ScatteringGcn::new(&cfg).is_err());

        let mut cfg = config(2, 2);
        cfg.smoo = -1.;
        assert!(ScatteringGcn::new(&cfg).is_err());

        let mut cfg = config(2, 2);
        cfg.dropout = 2.;
        assert!(ScatteringGcn::new(&cfg).is_err());
    }

    #[test]
    fn gradient_matches_finite_differences() {
        const EPS: f32 = 1e-2;

        let data = toy_dataset(3);
        let mut cfg = config(2, 2);
        cfg.dropout = 0.;
        let mut model = ScatteringGcn::new(&cfg).unwrap();

        // Positive features, weights and biases keep every low pass channel away from the
        // ReLU kink.
        let params: Vec<f32> = (0..model.size())
            .map(|i| 0.1 + 0.4 * ((i * 7919) % 13) as f32 / 13.)
            .collect();

        let mask = data.split().train().to_vec();
        let mut rng = StdRng::seed_from_u64(0);
        let mut loss_at = |model: &mut ScatteringGcn, p: &[f32]| {
            let out = model.forward(p, data.inputs(), Mode::Eval, &mut rng).unwrap();
            NllLoss.loss(out.view(), data.labels(), &mask).unwrap()
        };

        let out = model
            .forward(&params, data.inputs(), Mode::Eval, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let d = NllLoss.loss_prime(out.view(), data.labels(), &mask).unwrap();
        let mut grad = vec![0.; model.size()];
        model.backward(&params, &mut grad, data.inputs(), d.view()).unwrap();

        for i in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[i] += EPS;
            minus[i] -= EPS;

            let numeric = (loss_at(&mut model, &plus) - loss_at(&mut model, &minus)) / (2. * EPS);
            assert!(
                (numeric - grad[i]).abs() < 2e-2 * (1. + numeric.abs()),
                "param {i}: numeric {numeric}, analytic {}",
                grad[i]
            );
        }
    }
}
