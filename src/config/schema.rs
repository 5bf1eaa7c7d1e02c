//! YAML schema of a training run

use crate::data::BlobsConfig;
use crate::interpret::PlotOptions;
use crate::policy::{LrFindConfig, MixedPrecisionConfig, MixupConfig, OneCycleConfig};
use crate::train::LrSpec;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected 'true' or 'false', got '{other}'"))),
        },
    }
}

fn default_true() -> bool {
    true
}

/// Complete run description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub data: DataSpec,

    #[serde(default)]
    pub model: ModelSpec,

    #[serde(default)]
    pub optimizer: OptimSpec,

    /// Policies attached before training
    #[serde(default)]
    pub policies: PolicySpec,

    #[serde(default)]
    pub training: TrainingSpec,

    /// Optional interpretation of the validation predictions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpret: Option<InterpretSpec>,
}

/// Synthetic dataset and its split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    #[serde(flatten)]
    pub blobs: BlobsConfig,

    #[serde(default = "default_valid_pct")]
    pub valid_pct: f32,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Class names; indices are used when empty
    #[serde(default)]
    pub classes: Vec<String>,
}

fn default_valid_pct() -> f32 {
    0.2
}

fn default_batch_size() -> usize {
    16
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            blobs: BlobsConfig::default(),
            valid_pct: default_valid_pct(),
            batch_size: default_batch_size(),
            classes: Vec::new(),
        }
    }
}

/// Reference MLP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Hidden layer widths
    #[serde(default = "default_hidden")]
    pub hidden: Vec<usize>,

    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub batch_norm: bool,

    /// Layer indices where layer groups 1.. begin
    #[serde(default)]
    pub layer_groups: Vec<usize>,
}

fn default_hidden() -> Vec<usize> {
    vec![16]
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self { hidden: default_hidden(), batch_norm: true, layer_groups: Vec::new() }
    }
}

/// Optimizer choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    #[serde(default)]
    pub name: OptimizerKind,

    /// Weight decay used when the run gives none
    #[serde(default = "default_wd")]
    pub wd: f32,

    /// Decoupled weight decay instead of L2 on the gradients
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub true_wd: bool,
}

fn default_wd() -> f32 {
    crate::train::learner::DEFAULT_WD
}

impl Default for OptimSpec {
    fn default() -> Self {
        Self { name: OptimizerKind::default(), wd: default_wd(), true_wd: true }
    }
}

/// Policies to attach
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_precision: Option<MixedPrecisionConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixup: Option<MixupConfig>,

    /// Global gradient norm limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<f32>,

    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub bn_freeze: bool,

    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub show_graph: bool,

    /// Freeze every layer group but the last
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub freeze: bool,

    /// Keep normalisation layers trainable when frozen
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub train_bn: bool,
}

/// What the run does once the learner is set up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Fit,
    #[default]
    FitOneCycle,
    LrFind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSpec {
    #[serde(default)]
    pub action: Action,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Learning rate, per-group rates or a slice
    #[serde(default = "default_lr")]
    pub lr: LrSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wd: Option<f32>,

    #[serde(default)]
    pub one_cycle: OneCycleConfig,

    #[serde(default)]
    pub lr_find: LrFindConfig,
}

fn default_epochs() -> usize {
    5
}

fn default_lr() -> LrSpec {
    LrSpec::Scalar(1e-2)
}

impl Default for TrainingSpec {
    fn default() -> Self {
        Self {
            action: Action::default(),
            epochs: default_epochs(),
            lr: default_lr(),
            wd: None,
            one_cycle: OneCycleConfig::default(),
            lr_find: LrFindConfig::default(),
        }
    }
}

/// Interpretation report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretSpec {
    #[serde(default)]
    pub plot: PlotOptions,

    /// Report confusions above this count
    #[serde(default)]
    pub min_val: usize,

    #[serde(default = "default_top_losses")]
    pub top_losses: usize,
}

fn default_top_losses() -> usize {
    5
}

impl Default for InterpretSpec {
    fn default() -> Self {
        Self { plot: PlotOptions::default(), min_val: 0, top_losses: default_top_losses() }
    }
}
