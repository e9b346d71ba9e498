//! statetie: decision-tree state tying.
//!
//! Groups context-dependent acoustic model states into clusters by growing a
//! binary tree of phonetic yes/no questions, always splitting on the question
//! that most reduces weighted entropy.
//!
//! # Key Types
//!
//! - [`StateCorpus`] - Per-state codeword counts, occupancy and context
//! - [`QuestionSet`] - Atomic phonetic questions
//! - [`ClusterConfig`] - Configuration builder
//! - [`TreeGrower`] - Grows a [`ClusterTree`]
//!
//! # Clustering
//!
//! ```
//! use statetie::testing::{four_state_corpus, four_state_questions};
//! use statetie::{ClusterConfig, TreeGrower};
//!
//! let corpus = four_state_corpus();
//! let questions = four_state_questions();
//! let config = ClusterConfig::builder().build().unwrap();
//! let tree = TreeGrower::new(&corpus, &questions, config).unwrap().grow().unwrap();
//!
//! let clusters = tree.assignments();
//! assert_eq!(clusters[&0], clusters[&1]);
//! assert_ne!(clusters[&0], clusters[&2]);
//! ```

// Re-export approx traits for users who want to compare densities
pub use approx;

pub mod data;
pub mod error;
pub mod math;
pub mod questions;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::ClusterError;

pub use data::{CorpusError, StateContext, StateCorpus, WordPosition};
pub use math::{LogMath, LogMode};
pub use questions::{ParseOptions, PhoneInventory, Question, QuestionSet};
pub use repr::{ClusterTree, NodeId, TreeSchema};
pub use training::{ClusterConfig, GrowthStrategy, TreeGrower};

pub use utils::{run_with_threads, Parallelism};
