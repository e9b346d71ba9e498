//! Phonetic questions.
//!
//! - [`AtomicQuestion`]: phone-set membership at a context offset, or word position
//! - [`QuestionSet`]: the loaded atomic questions and their text format
//! - [`CompositeQuestion`], [`Question`]: unions of atomic questions and
//!   synthesized cluster memberships
//! - [`subsets`]: combination enumeration used by the exhaustive search

pub mod atomic;
pub mod composite;
pub mod set;
pub mod subsets;

pub use atomic::{AtomicQuestion, Predicate};
pub use composite::{CompositeQuestion, Question};
pub use set::{ParseOptions, PhoneInventory, QuestionError, QuestionSet};
pub use subsets::{n_choose_r, next_subset, Combinations};
