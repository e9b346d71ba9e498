//! Phonetic context of a state.

use serde::{Deserialize, Serialize};

/// Position of the base phone within its word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordPosition {
    Begin,
    End,
    Internal,
    Single,
}

impl WordPosition {
    /// Name of the positional question that selects this position.
    pub fn question_name(self) -> &'static str {
        match self {
            WordPosition::Begin => "WDBNDRY_B",
            WordPosition::End => "WDBNDRY_E",
            WordPosition::Single => "WDBNDRY_S",
            WordPosition::Internal => "WDBNDRY_I",
        }
    }

    /// Inverse of [`question_name`](Self::question_name).
    pub fn from_question_name(name: &str) -> Option<Self> {
        match name {
            "WDBNDRY_B" => Some(WordPosition::Begin),
            "WDBNDRY_E" => Some(WordPosition::End),
            "WDBNDRY_S" => Some(WordPosition::Single),
            "WDBNDRY_I" => Some(WordPosition::Internal),
            _ => None,
        }
    }
}

/// Phones surrounding a state plus its word position.
///
/// `phones` is a window with the base phone at `base`; context offset `k`
/// refers to `phones[base + k]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateContext {
    phones: Vec<u32>,
    base: usize,
    position: WordPosition,
}

impl StateContext {
    /// Create a context from a phone window. `base` is clamped into the window.
    pub fn new(phones: Vec<u32>, base: usize, position: WordPosition) -> Self {
        let base = base.min(phones.len().saturating_sub(1));
        Self { phones, base, position }
    }

    /// Left/base/right context.
    pub fn triphone(left: u32, base: u32, right: u32, position: WordPosition) -> Self {
        Self::new(vec![left, base, right], 1, position)
    }

    /// Phone at a context offset, if the window covers it.
    #[inline]
    pub fn phone_at(&self, offset: i32) -> Option<u32> {
        let idx = self.base as i64 + offset as i64;
        if idx < 0 {
            return None;
        }
        self.phones.get(idx as usize).copied()
    }

    #[inline]
    pub fn position(&self) -> WordPosition {
        self.position
    }

    #[inline]
    pub fn phones(&self) -> &[u32] {
        &self.phones
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }
}
