use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a recipe's method. `step` is one-based and dense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instruction {
    pub id: Option<String>,
    pub step: u32,
    pub text: String,
    pub title: Option<String>,
}

impl Instruction {
    pub fn new(step: u32, text: impl Into<String>) -> Self {
        Self {
            id: None,
            step,
            text: text.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.step, self.text)
    }
}
