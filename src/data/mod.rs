//! Batches, data loaders and the synthetic dataset used by the CLI

mod batch;
mod loader;
mod synthetic;
mod transform;

pub(crate) use batch::argmax;
pub use batch::{Batch, MixPlan, Targets};
pub use loader::{DataBunch, DataLoader, DatasetType};
pub use synthetic::{blobs, BlobsConfig};
pub use transform::{BatchTransform, ToHalf};
