use std::{fs, path::Path};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Question;

lazy_static! {
    static ref BUILTIN: QuizBank =
        QuizBank::from_ron_str(include_str!("builtin.ron")).expect("built-in quiz bank is valid");
}

/// Every preset question needs at least this many options to choose from
const MIN_OPTIONS: usize = 2;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Could not read quiz bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse quiz bank: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Invalid quiz bank: {0}")]
    Invalid(String),
}

/// The fixed table of preset questions, grouped by category.
///
/// A bank never changes once loaded. Its version is logged on startup so a night's
/// questions can be traced back to the file they came from.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizBank {
    pub version: String,
    pub categories: Vec<QuizCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub questions: Vec<BankQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

/// A category as listed to participants
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub questions_count: usize,
}

impl QuizBank {
    /// The bank shipped with neonpub
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Loads a bank from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let data = fs::read_to_string(path)?;
        Self::from_ron_str(&data)
    }

    pub fn from_ron_str(data: &str) -> Result<Self, BankError> {
        let bank: Self = ron::from_str(data)?;
        bank.validate()?;

        Ok(bank)
    }

    pub fn category(&self, id: &str) -> Option<&QuizCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|c| CategorySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                description: c.description.clone(),
                icon: c.icon.clone(),
                questions_count: c.questions.len(),
            })
            .collect()
    }

    fn validate(&self) -> Result<(), BankError> {
        for (i, category) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|c| c.id == category.id) {
                return Err(BankError::Invalid(format!(
                    "category {} is defined twice",
                    category.id
                )));
            }

            if category.questions.is_empty() {
                return Err(BankError::Invalid(format!(
                    "category {} has no questions",
                    category.id
                )));
            }

            for question in &category.questions {
                if question.options.len() < MIN_OPTIONS
                    || question.correct_index >= question.options.len()
                {
                    return Err(BankError::Invalid(format!(
                        "question '{}' in {} has no valid answer",
                        question.question, category.id
                    )));
                }
            }
        }

        Ok(())
    }
}

impl BankQuestion {
    /// Snapshots the question, worth `points`
    pub fn to_question(&self, points: i32) -> Question {
        Question {
            question: self.question.clone(),
            options: self.options.clone(),
            correct_index: self.correct_index,
            points,
        }
    }
}
