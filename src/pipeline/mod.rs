//! Pipeline entry points.
//!
//! - `Harvester`: one authenticated collection run over a document source
//! - `run_harvest`: the same run against a freshly launched Chrome

pub mod harvest;

#[cfg(feature = "chrome")]
pub use harvest::run_harvest;
pub use harvest::{HarvestReport, HarvestState, Harvester};
