//! Clustering: configuration, scoring, search, growth and pruning.
//!
//! - [`ClusterConfig`]: every tunable of a run, built with a validating builder
//! - [`Metric`]: weighted entropy of node densities
//! - [`HeapSelector`]: bounded best-k selection
//! - [`TwoClassSplitter`]: iterative two-way clustering of node members
//! - [`BestQuestionSearch`]: scores candidate questions at one node
//! - [`TreeGrower`]: top-down growth driver
//! - [`PhoneClassBuilder`]: phone-class questions clustered from a corpus
//! - [`prune_to_leaves`], [`prune_low_occupancy`]: post-growth pruning
//! - [`GrowthLogger`], [`Verbosity`]: structured progress logging

pub mod config;
pub mod grower;
pub mod heap;
pub mod logger;
pub mod metric;
pub mod phone_classes;
pub mod prune;
pub mod search;
pub mod two_class;

pub use config::{ClusterConfig, ConfigError, DensityKind, GainParams, GrowthStrategy};
pub use grower::TreeGrower;
pub use heap::{HeapEntry, HeapOrder, HeapSelector};
pub use logger::{GrowthLogger, StopReason, Verbosity};
pub use metric::Metric;
pub use phone_classes::{PhoneClassBuilder, PhoneClassParams};
pub use prune::{prune_low_occupancy, prune_to_leaves};
pub use search::{BestQuestionSearch, QuestionStrategy, SearchOutcome, SearchParams, SplitCandidate};
pub use two_class::{SeedPolicy, TwoClassParams, TwoClassResult, TwoClassSplitter};
