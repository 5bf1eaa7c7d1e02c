//! Classification interpretation: confusion matrix, most confused classes
//! and top losses

mod confusion;
mod interpretation;

pub use confusion::ConfusionMatrix;
pub use interpretation::{ClassificationInterpretation, PlotOptions};
