//! Stimulus catalog
//!
//! The catalog is an immutable configuration object constructed once and
//! passed by reference into the block planner. An empty or unbalanced catalog
//! is a fatal configuration error at session start, never a recoverable one.

use crate::error::EngineError;
use crate::types::{CategoryTag, StimulusItem};
use serde::{Deserialize, Serialize};

/// Immutable set of categorized stimuli for one test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusCatalog {
    items: Vec<StimulusItem>,
}

impl StimulusCatalog {
    /// Build a catalog from explicit items, validating balance up front
    pub fn new(items: Vec<StimulusItem>) -> Result<Self, EngineError> {
        let catalog = Self { items };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in communication-disorder stimulus set: five word stimuli per
    /// target category and five image references per attribute category.
    pub fn builtin() -> Self {
        let mut items = Vec::with_capacity(20);

        for word in ["stuttering", "lisp", "hoarse voice", "slurred speech", "mutism"] {
            items.push(StimulusItem::new(word, CategoryTag::CommunicationDisorder));
        }
        for word in ["clear speech", "fluent", "articulate", "steady voice", "easy talker"] {
            items.push(StimulusItem::new(word, CategoryTag::NormalCommunication));
        }
        for asset in [
            "img/positive/joy.png",
            "img/positive/love.png",
            "img/positive/laughter.png",
            "img/positive/peace.png",
            "img/positive/pleasure.png",
        ] {
            items.push(StimulusItem::new(asset, CategoryTag::PositiveAttribute));
        }
        for asset in [
            "img/negative/agony.png",
            "img/negative/hurt.png",
            "img/negative/failure.png",
            "img/negative/nasty.png",
            "img/negative/rotten.png",
        ] {
            items.push(StimulusItem::new(asset, CategoryTag::NegativeAttribute));
        }

        Self { items }
    }

    /// Validate that every category is present and all categories hold the
    /// same number of stimuli. Block trial counts depend on this balance.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.items.is_empty() {
            return Err(EngineError::InvalidCatalog("catalog is empty".to_string()));
        }

        let mut counts = [0usize; 4];
        for item in &self.items {
            let idx = CategoryTag::ALL
                .iter()
                .position(|c| *c == item.category)
                .unwrap_or(0);
            counts[idx] += 1;
        }

        for (category, count) in CategoryTag::ALL.iter().zip(counts.iter()) {
            if *count == 0 {
                return Err(EngineError::InvalidCatalog(format!(
                    "category {} has no stimuli",
                    category.as_str()
                )));
            }
            if *count != counts[0] {
                return Err(EngineError::InvalidCatalog(format!(
                    "category {} has {} stimuli, expected {}",
                    category.as_str(),
                    count,
                    counts[0]
                )));
            }
        }

        Ok(())
    }

    /// Number of stimuli per category (catalog is validated to be balanced)
    pub fn per_category_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.category == CategoryTag::CommunicationDisorder)
            .count()
    }

    /// All stimuli belonging to any of the given categories
    pub fn items_in(&self, categories: &[CategoryTag]) -> Vec<&StimulusItem> {
        self.items
            .iter()
            .filter(|i| categories.contains(&i.category))
            .collect()
    }

    /// All stimuli in the catalog
    pub fn items(&self) -> &[StimulusItem] {
        &self.items
    }
}
