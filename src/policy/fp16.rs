//! Mixed-precision training
//!
//! The model computes in reduced precision while the optimizer updates fp32
//! master copies of the trainable parameters. The loss is scaled before the
//! backward pass so small gradients survive half precision.

use crate::data::ToHalf;
use crate::nn::Param;
use crate::precision::{round_array, LossScaler, Precision, DEFAULT_MAX_NOSKIP};
use crate::train::callback::{Callback, CallbackAction, CallbackContext};
use crate::train::loss::LossOutput;
use crate::train::Learner;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Mixed-precision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedPrecisionConfig {
    /// Compute precision of the model
    pub precision: Precision,
    pub loss_scale: f32,
    /// Keep one flat master buffer per layer group
    pub flat_master: bool,
    /// Halve the scale on overflow and grow it after `max_noskip` clean steps
    pub dynamic: bool,
    pub max_noskip: usize,
}

impl Default for MixedPrecisionConfig {
    fn default() -> Self {
        Self {
            precision: Precision::Fp16,
            loss_scale: 512.0,
            flat_master: false,
            dynamic: false,
            max_noskip: DEFAULT_MAX_NOSKIP,
        }
    }
}

/// fp32 copies of the trainable parameters
///
/// Indices refer to the order of `Model::params_mut`.
#[derive(Debug, Clone)]
pub enum MasterWeights {
    PerParam(Vec<(usize, Array2<f32>)>),
    /// One buffer per layer group, parameters laid out back to back
    Flat(Vec<FlatGroup>),
}

#[derive(Debug, Clone)]
pub struct FlatGroup {
    pub group: usize,
    pub indices: Vec<usize>,
    /// Number of values of each parameter in `indices`
    pub lens: Vec<usize>,
    pub data: Array1<f32>,
}

impl MasterWeights {
    pub fn build(params: &[&mut Param], flat: bool) -> Self {
        let trainable = params.iter().enumerate().filter(|(_, p)| p.requires_grad);
        if !flat {
            return MasterWeights::PerParam(trainable.map(|(i, p)| (i, p.data.clone())).collect());
        }
        let mut groups: BTreeMap<usize, (Vec<usize>, Vec<usize>, Vec<f32>)> = BTreeMap::new();
        for (i, p) in trainable {
            let (indices, lens, data) = groups.entry(p.group).or_default();
            indices.push(i);
            lens.push(p.len());
            data.extend(p.data.iter());
        }
        MasterWeights::Flat(
            groups
                .into_iter()
                .map(|(group, (indices, lens, data))| FlatGroup { group, indices, lens, data: Array1::from(data) })
                .collect(),
        )
    }

    /// Number of scalar values held
    pub fn len(&self) -> usize {
        match self {
            MasterWeights::PerParam(m) => m.iter().map(|(_, d)| d.len()).sum(),
            MasterWeights::Flat(groups) => groups.iter().map(|g| g.data.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the masters into the model parameters
    fn install(&self, params: &mut [&mut Param]) {
        match self {
            MasterWeights::PerParam(m) => {
                for (i, data) in m {
                    params[*i].data.assign(data);
                }
            }
            MasterWeights::Flat(groups) => {
                for g in groups {
                    let mut offset = 0;
                    for (&i, &n) in g.indices.iter().zip(&g.lens) {
                        for (dst, src) in params[i].data.iter_mut().zip(g.data.iter().skip(offset)) {
                            *dst = *src;
                        }
                        offset += n;
                    }
                }
            }
        }
    }

    /// Read updated values back from the model parameters
    fn store(&mut self, params: &[&mut Param]) {
        match self {
            MasterWeights::PerParam(m) => {
                for (i, data) in m.iter_mut() {
                    data.assign(&params[*i].data);
                }
            }
            MasterWeights::Flat(groups) => {
                for g in groups.iter_mut() {
                    let mut offset = 0;
                    for (&i, &n) in g.indices.iter().zip(&g.lens) {
                        for (dst, src) in g.data.iter_mut().skip(offset).zip(params[i].data.iter()) {
                            *dst = *src;
                        }
                        offset += n;
                    }
                }
            }
        }
    }

    /// Master values of parameter `index`, if it is trainable
    pub fn get(&self, index: usize) -> Option<Vec<f32>> {
        match self {
            MasterWeights::PerParam(m) => m.iter().find(|(i, _)| *i == index).map(|(_, d)| d.iter().copied().collect()),
            MasterWeights::Flat(groups) => groups.iter().find_map(|g| {
                let pos = g.indices.iter().position(|&i| i == index)?;
                let offset: usize = g.lens[..pos].iter().sum();
                Some(g.data.iter().skip(offset).take(g.lens[pos]).copied().collect())
            }),
        }
    }
}

/// Callback driving mixed-precision training
pub struct MixedPrecision {
    precision: Precision,
    flat_master: bool,
    scaler: LossScaler,
    masters: Option<MasterWeights>,
    installed: bool,
}

impl MixedPrecision {
    pub const NAME: &'static str = "MixedPrecision";

    pub fn new(config: &MixedPrecisionConfig) -> Self {
        let scaler = if config.dynamic {
            LossScaler::dynamic(config.loss_scale, config.max_noskip)
        } else {
            LossScaler::fixed(config.loss_scale)
        };
        Self { precision: config.precision, flat_master: config.flat_master, scaler, masters: None, installed: false }
    }

    pub fn loss_scale(&self) -> f32 {
        self.scaler.scale()
    }

    pub fn masters(&self) -> Option<&MasterWeights> {
        self.masters.as_ref()
    }

    pub fn overflow_count(&self) -> usize {
        self.scaler.overflow_count()
    }
}

impl Callback for MixedPrecision {
    fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        let params = ctx.model.params_mut();
        let masters = MasterWeights::build(&params, self.flat_master);
        debug!(values = masters.len(), flat = self.flat_master, "master weights created");
        self.masters = Some(masters);
        self.installed = false;
    }

    fn on_backward_begin(&mut self, _ctx: &mut CallbackContext<'_>, loss: &mut LossOutput) {
        loss.value = self.scaler.scale_loss(loss.value);
        loss.grad *= self.scaler.scale();
    }

    fn on_backward_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        let Some(masters) = &self.masters else {
            return CallbackAction::Continue;
        };
        let mut params = ctx.model.params_mut();
        let valid = self.scaler.unscale_and_check(
            params.iter_mut().filter(|p| p.requires_grad).flat_map(|p| p.grad.iter_mut()),
        );
        if self.scaler.is_dynamic() && !valid {
            self.scaler.update(false);
            for p in params.iter_mut() {
                p.zero_grad();
            }
            warn!(iteration = ctx.progress.iteration, loss_scale = self.scaler.scale(), "gradient overflow, step skipped");
            return CallbackAction::SkipStep;
        }
        let before = self.scaler.scale();
        self.scaler.update(true);
        if self.scaler.scale() != before {
            debug!(loss_scale = self.scaler.scale(), "loss scale increased");
        }
        masters.install(&mut params);
        self.installed = true;
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &mut CallbackContext<'_>) {
        let precision = self.precision;
        let mut params = ctx.model.params_mut();
        if self.installed {
            if let Some(masters) = self.masters.as_mut() {
                masters.store(&params);
            }
            self.installed = false;
        }
        for p in params.iter_mut() {
            if !p.is_norm() {
                round_array(&mut p.data, precision);
            }
            p.zero_grad();
        }
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Train `learn` in mixed precision
///
/// Any previous mixed-precision setup is replaced.
pub fn to_fp16<'a>(learn: &'a mut Learner, config: &MixedPrecisionConfig) -> &'a mut Learner {
    learn.remove_callbacks(MixedPrecision::NAME);
    learn.model.set_precision(config.precision);
    for dl in learn.data.loaders_mut() {
        if !dl.has_tfm(ToHalf::NAME) {
            dl.add_tfm(Box::new(ToHalf::new(config.precision)));
        }
    }
    learn.add_callback(Box::new(MixedPrecision::new(config)));
    info!(precision = %config.precision, loss_scale = config.loss_scale, dynamic = config.dynamic, "mixed precision enabled");
    learn
}

/// Undo `to_fp16`
pub fn to_fp32(learn: &mut Learner) -> &mut Learner {
    for dl in learn.data.loaders_mut() {
        dl.remove_tfm(ToHalf::NAME);
    }
    let removed = learn.remove_callbacks(MixedPrecision::NAME);
    learn.model.set_precision(Precision::Fp32);
    info!(removed, "mixed precision disabled");
    learn
}
