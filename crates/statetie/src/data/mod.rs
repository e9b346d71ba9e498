//! Input data: state contexts, densities, and the corpus being clustered.
//!
//! - [`StateCorpus`]: per-state counts, occupancy, context and Gaussians
//! - [`DistributionVector`], [`NodeDensity`]: merged statistics of a group
//! - [`DensityMerger`]: accumulates corpus rows into node densities
//! - [`IdRemapper`]: dense indices for sparse external ids

pub mod context;
pub mod corpus;
pub mod density;
pub mod gaussian;
pub mod remap;

pub use context::{StateContext, WordPosition};
pub use corpus::{CorpusError, StateCorpus};
pub use density::{DensityMerger, DistributionVector, NodeDensity};
pub use gaussian::{GaussianAccumulator, GaussianStats};
pub use remap::{next_prime, IdRemapper};
