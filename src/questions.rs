//! Prompt bank
//!
//! Loaded once at startup from a JSON array of strings. Rounds draw two
//! distinct prompts per pair from it.

use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

/// Used when no question file is available
const FALLBACK_PROMPTS: &[&str] = &[
    "What is the most ridiculous situation you have ever been in?",
    "If you were a superhero for one day, what would you do?",
    "Which habit of yours would you like to get rid of?",
    "What advice would you give your 10-year-old self?",
    "What is the strangest food you have ever tried?",
    "Which skill would you master overnight if you could?",
];

/// Every pair needs two different prompts
pub const MIN_PROMPTS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("need {needed} distinct prompts, bank has {available}")]
    TooFew { needed: usize, available: usize },
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    prompts: Vec<String>,
}

impl QuestionBank {
    /// Build a bank, dropping blank and repeated prompts
    pub fn new(prompts: Vec<String>) -> Result<Self, QuestionError> {
        let mut seen = HashSet::new();
        let prompts: Vec<String> = prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();

        if prompts.len() < MIN_PROMPTS {
            return Err(QuestionError::TooFew {
                needed: MIN_PROMPTS,
                available: prompts.len(),
            });
        }

        Ok(Self { prompts })
    }

    pub fn fallback() -> Self {
        Self {
            prompts: FALLBACK_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, QuestionError> {
        let raw = std::fs::read_to_string(path)?;
        let prompts: Vec<String> = serde_json::from_str(&raw)?;
        Self::new(prompts)
    }

    /// Load from `path`, falling back to the built-in prompts on any error
    pub fn load_or_fallback(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(bank) => {
                tracing::info!("Loaded {} questions from {}", bank.len(), path.display());
                bank
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load questions from {} ({}), using fallback questions",
                    path.display(),
                    e
                );
                Self::fallback()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Pick `n` distinct prompts in random order
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> Result<Vec<String>, QuestionError> {
        if n > self.prompts.len() {
            return Err(QuestionError::TooFew {
                needed: n,
                available: self.prompts.len(),
            });
        }

        Ok(rand::seq::index::sample(rng, self.prompts.len(), n)
            .into_iter()
            .map(|i| self.prompts[i].clone())
            .collect())
    }
}
