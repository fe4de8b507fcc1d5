use serde::{Deserialize, Serialize};

use crate::error::{QuoteField, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Quote {
    pub text: String,
    pub category: String,
}

/// The `(text, category)` pair used to decide whether two quotes are the same record.
pub type QuoteKey<'a> = (&'a str, &'a str);

impl Quote {
    /// Trims both fields and rejects blank ones.
    pub fn new(text: &str, category: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() {
            return Err(ValidationError::Empty(QuoteField::Text));
        }

        if category.is_empty() {
            return Err(ValidationError::Empty(QuoteField::Category));
        }

        Ok(Quote {
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    pub fn key(&self) -> QuoteKey<'_> {
        (self.text.as_str(), self.category.as_str())
    }

    /// Whether the quote already satisfies the trimmed, non-empty invariant.
    pub fn is_well_formed(&self) -> bool {
        !self.text.is_empty()
            && !self.category.is_empty()
            && self.text.trim() == self.text
            && self.category.trim() == self.category
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

pub const ALL_CATEGORIES: &str = "all";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// `None`, a blank string and the "all" sentinel all select every quote.
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => CategoryFilter::All,
            Some(category) => CategoryFilter::Only(category.to_string()),
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => quote.category == *category,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Only(category) => category,
        }
    }
}
