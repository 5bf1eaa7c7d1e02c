//! Data loaders and the train/valid/test bundle

use super::{Batch, BatchTransform, Targets};
use crate::{Error, Result};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which split of a `DataBunch` to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Train,
    #[default]
    Valid,
    Test,
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetType::Train => "train",
            DatasetType::Valid => "valid",
            DatasetType::Test => "test",
        };
        write!(f, "{name}")
    }
}

/// Yields mini-batches over an in-memory dataset
pub struct DataLoader {
    x: Array2<f32>,
    y: Targets,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    tfms: Vec<Box<dyn BatchTransform>>,
}

impl DataLoader {
    pub fn new(x: Array2<f32>, y: Targets, batch_size: usize, shuffle: bool, seed: u64) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(Error::ShapeMismatch { context: "loader targets", expected: x.nrows(), actual: y.len() });
        }
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
        }
        Ok(Self { x, y, batch_size, shuffle, rng: StdRng::seed_from_u64(seed), tfms: Vec::new() })
    }

    /// Number of batches per pass
    pub fn len(&self) -> usize {
        self.x.nrows().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn targets(&self) -> &Targets {
        &self.y
    }

    /// One pass over the data, shuffled when the loader shuffles
    pub fn batches(&mut self) -> Vec<Batch> {
        let mut order: Vec<usize> = (0..self.x.nrows()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        self.collect(&order)
    }

    /// One pass in dataset order
    pub fn ordered_batches(&self) -> Vec<Batch> {
        let order: Vec<usize> = (0..self.x.nrows()).collect();
        self.collect(&order)
    }

    fn collect(&self, order: &[usize]) -> Vec<Batch> {
        order
            .chunks(self.batch_size)
            .map(|idx| {
                let mut batch = Batch::new(self.x.select(Axis(0), idx), self.y.select(idx));
                for tfm in &self.tfms {
                    tfm.apply(&mut batch);
                }
                batch
            })
            .collect()
    }

    pub fn add_tfm(&mut self, tfm: Box<dyn BatchTransform>) {
        self.tfms.push(tfm);
    }

    /// Remove every transform called `name`; returns whether one was found
    pub fn remove_tfm(&mut self, name: &str) -> bool {
        let before = self.tfms.len();
        self.tfms.retain(|t| t.name() != name);
        self.tfms.len() != before
    }

    pub fn has_tfm(&self, name: &str) -> bool {
        self.tfms.iter().any(|t| t.name() == name)
    }
}

/// Train, validation and optional test loaders plus class metadata
pub struct DataBunch {
    pub train_dl: DataLoader,
    pub valid_dl: DataLoader,
    pub test_dl: Option<DataLoader>,
    /// Number of classes
    pub c: usize,
    /// Class names; empty means "use indices"
    pub classes: Vec<String>,
}

impl DataBunch {
    pub fn new(train_dl: DataLoader, valid_dl: DataLoader, c: usize) -> Self {
        Self { train_dl, valid_dl, test_dl: None, c, classes: Vec::new() }
    }

    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_test(mut self, test_dl: DataLoader) -> Self {
        self.test_dl = Some(test_dl);
        self
    }

    /// Random train/valid split of labelled arrays
    pub fn from_arrays(
        x: Array2<f32>,
        y: Vec<usize>,
        c: usize,
        valid_pct: f32,
        batch_size: usize,
        seed: u64,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(Error::ShapeMismatch { context: "dataset labels", expected: x.nrows(), actual: y.len() });
        }
        if !(0.0..1.0).contains(&valid_pct) {
            return Err(Error::InvalidConfig(format!("valid_pct must be in [0, 1), got {valid_pct}")));
        }
        if let Some(&label) = y.iter().find(|&&l| l >= c) {
            return Err(Error::LabelOutOfRange { label, n_classes: c });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..x.nrows()).collect();
        order.shuffle(&mut rng);
        let n_valid = (x.nrows() as f32 * valid_pct).round() as usize;
        let (valid_idx, train_idx) = order.split_at(n_valid);
        if train_idx.is_empty() {
            return Err(Error::EmptyData("training split is empty".to_string()));
        }

        let labels = Targets::Classes(y);
        let train_dl = DataLoader::new(
            x.select(Axis(0), train_idx),
            labels.select(train_idx),
            batch_size,
            true,
            seed.wrapping_add(1),
        )?;
        let valid_dl = DataLoader::new(
            x.select(Axis(0), valid_idx),
            labels.select(valid_idx),
            batch_size,
            false,
            seed.wrapping_add(2),
        )?;
        Ok(Self::new(train_dl, valid_dl, c))
    }

    pub fn dl(&self, ds_type: DatasetType) -> Option<&DataLoader> {
        match ds_type {
            DatasetType::Train => Some(&self.train_dl),
            DatasetType::Valid => Some(&self.valid_dl),
            DatasetType::Test => self.test_dl.as_ref(),
        }
    }

    /// Every loader that exists
    pub fn loaders_mut(&mut self) -> impl Iterator<Item = &mut DataLoader> {
        [Some(&mut self.train_dl), Some(&mut self.valid_dl), self.test_dl.as_mut()]
            .into_iter()
            .flatten()
    }

    /// Display name for class `i`
    pub fn class_name(&self, i: usize) -> String {
        self.classes.get(i).cloned().unwrap_or_else(|| i.to_string())
    }
}
