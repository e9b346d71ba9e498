//! Atomic phonetic questions.

use std::fmt;

use fixedbitset::FixedBitSet;

use crate::data::{StateContext, WordPosition};

/// What an atomic question tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Is the phone at `offset` in `phones`?
    PhoneMembership { offset: i32, phones: FixedBitSet },
    /// Is the base phone at this word position?
    Position(WordPosition),
}

/// An indivisible yes/no question about a state's context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicQuestion {
    name: String,
    predicate: Predicate,
    negated: bool,
}

impl AtomicQuestion {
    /// Membership question on the phone at `offset`.
    pub fn membership<I>(name: impl Into<String>, offset: i32, phones: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut set = FixedBitSet::new();
        for phone in phones {
            let idx = phone as usize;
            if idx >= set.len() {
                set.grow(idx + 1);
            }
            set.insert(idx);
        }
        Self {
            name: name.into(),
            predicate: Predicate::PhoneMembership { offset, phones: set },
            negated: false,
        }
    }

    /// Word-position question.
    pub fn position(position: WordPosition) -> Self {
        Self {
            name: position.question_name().to_string(),
            predicate: Predicate::Position(position),
            negated: false,
        }
    }

    /// The same question with the answer inverted.
    pub fn negate(&self) -> Self {
        Self { negated: !self.negated, ..self.clone() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[inline]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Answer the question for a context.
    ///
    /// A membership question whose offset falls outside the context window
    /// answers "no" (before negation).
    #[inline]
    pub fn evaluate(&self, context: &StateContext) -> bool {
        let answer = match &self.predicate {
            Predicate::PhoneMembership { offset, phones } => context
                .phone_at(*offset)
                .map_or(false, |p| phones.contains(p as usize)),
            Predicate::Position(pos) => context.position() == *pos,
        };
        answer != self.negated
    }
}

impl fmt::Display for AtomicQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        f.write_str(&self.name)?;
        if let Predicate::PhoneMembership { offset, .. } = &self.predicate {
            write!(f, " {offset}")?;
        }
        Ok(())
    }
}
