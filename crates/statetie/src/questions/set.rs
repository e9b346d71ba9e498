//! The atomic question set and its text format.
//!
//! # Format
//!
//! One question per line: a name followed by the phones it contains.
//!
//! ```text
//! # comment
//! NASAL   M N NG
//! STOP    P T K B D G
//! WDBNDRY_B
//! ```
//!
//! A name with no phones must be one of the word-position questions
//! `WDBNDRY_B`, `WDBNDRY_E`, `WDBNDRY_S`, `WDBNDRY_I`. Phones not in the
//! inventory are skipped with a warning. Each phone-set line is instantiated
//! once per configured context offset, and every question also gets its
//! negation.

use std::collections::HashMap;

use super::atomic::AtomicQuestion;
use crate::data::WordPosition;
use crate::training::{GrowthLogger, Verbosity};

/// Errors raised while parsing a question file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuestionError {
    #[error("line {line}: question '{name}' has no phones and is not a word-position question")]
    UnknownNullQuestion { line: usize, name: String },

    #[error("line {line}: duplicate question '{name}'")]
    DuplicateName { line: usize, name: String },

    #[error("context offsets must not be empty")]
    NoOffsets,
}

// =============================================================================
// PhoneInventory
// =============================================================================

/// Phone names and their integer ids.
#[derive(Clone, Debug, Default)]
pub struct PhoneInventory {
    names: Vec<String>,
    index: HashMap<String, u32>,
}

impl PhoneInventory {
    /// Ids are assigned in iteration order; repeated names keep their first id.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inventory = Self::default();
        for name in names {
            inventory.insert(name);
        }
        inventory
    }

    /// Id of `name`, adding it if new.
    pub fn insert(&mut self, name: impl Into<String>) -> u32 {
        let name = name.into();
        if let Some(&id) = self.index.get(&name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.index.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    #[inline]
    pub fn id(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// =============================================================================
// QuestionSet
// =============================================================================

/// Options controlling how question lines are instantiated.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Context offsets each phone-set question is asked about.
    pub offsets: Vec<i32>,
    /// Also emit the negation of every question.
    pub negations: bool,
    /// Skipped phones and questions are reported at [`Verbosity::Warning`].
    pub verbosity: Verbosity,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { offsets: vec![-1, 1], negations: true, verbosity: Verbosity::Warning }
    }
}

/// Immutable collection of atomic questions, addressed by index.
#[derive(Clone, Debug, Default)]
pub struct QuestionSet {
    questions: Vec<AtomicQuestion>,
}

impl QuestionSet {
    pub fn new(questions: Vec<AtomicQuestion>) -> Self {
        Self { questions }
    }

    /// Parse the question file format described in the module docs.
    pub fn parse(
        text: &str,
        phones: &PhoneInventory,
        options: &ParseOptions,
    ) -> Result<Self, QuestionError> {
        if options.offsets.is_empty() {
            return Err(QuestionError::NoOffsets);
        }

        let logger = GrowthLogger::new(options.verbosity);
        let mut questions = Vec::new();
        let mut seen = HashMap::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line_no = line_no + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            if seen.insert(name.to_string(), line_no).is_some() {
                return Err(QuestionError::DuplicateName { line: line_no, name: name.to_string() });
            }

            let members: Vec<&str> = fields.collect();
            let base = if members.is_empty() {
                let position = WordPosition::from_question_name(name).ok_or_else(|| {
                    QuestionError::UnknownNullQuestion { line: line_no, name: name.to_string() }
                })?;
                vec![AtomicQuestion::position(position)]
            } else {
                let mut ids = Vec::with_capacity(members.len());
                for phone in members {
                    match phones.id(phone) {
                        Some(id) => ids.push(id),
                        None => logger.log_unknown_phone(line_no, name, phone),
                    }
                }
                if ids.is_empty() {
                    logger.log_empty_question(line_no, name);
                    continue;
                }
                options
                    .offsets
                    .iter()
                    .map(|&offset| AtomicQuestion::membership(name, offset, ids.iter().copied()))
                    .collect()
            };

            for q in base {
                if options.negations {
                    let negated = q.negate();
                    questions.push(q);
                    questions.push(negated);
                } else {
                    questions.push(q);
                }
            }
        }

        Ok(Self { questions })
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&AtomicQuestion> {
        self.questions.get(index as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtomicQuestion> {
        self.questions.iter()
    }

    pub fn push(&mut self, question: AtomicQuestion) -> u32 {
        self.questions.push(question);
        (self.questions.len() - 1) as u32
    }
}
