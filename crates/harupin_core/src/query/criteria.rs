//! Filter criteria for note observation.

use crate::model::note::Note;
use crate::store::NotePredicate;
use serde::{Deserialize, Serialize};

/// Primary filter; exactly one is active per subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    None,
    /// Case-sensitive substring of title or location label.
    Keyword { keyword: String },
    /// Four-digit year, e.g. `2025`.
    Year { year: String },
    /// Year plus month, e.g. `2025` + `06`.
    YearMonth { year: String, month: String },
}

/// Active filter plus the client-side favorites post-filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub filter: Filter,
    #[serde(default)]
    pub favorites_only: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::all()
    }
}

impl FilterCriteria {
    pub fn all() -> Self {
        Self {
            filter: Filter::None,
            favorites_only: false,
        }
    }

    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            filter: Filter::Keyword {
                keyword: keyword.into(),
            },
            favorites_only: false,
        }
    }

    pub fn year(year: impl Into<String>) -> Self {
        Self {
            filter: Filter::Year { year: year.into() },
            favorites_only: false,
        }
    }

    pub fn year_month(year: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            filter: Filter::YearMonth {
                year: year.into(),
                month: month.into(),
            },
            favorites_only: false,
        }
    }

    pub fn favorites_only(mut self, favorites_only: bool) -> Self {
        self.favorites_only = favorites_only;
        self
    }

    /// Store predicate for the primary filter. Favorites are not pushed down.
    pub fn predicate(&self) -> NotePredicate {
        match &self.filter {
            Filter::None => NotePredicate::All,
            Filter::Keyword { keyword } => NotePredicate::KeywordSubstring(keyword.clone()),
            Filter::Year { year } => NotePredicate::DatePrefix(year.trim().to_string()),
            Filter::YearMonth { year, month } => {
                NotePredicate::DatePrefix(format!("{}-{}", year.trim(), pad_month(month)))
            }
        }
    }

    /// Applies the favorites post-filter in place.
    pub fn post_filter(&self, notes: &mut Vec<Note>) {
        if self.favorites_only {
            notes.retain(|note| note.is_favorite);
        }
    }
}

fn pad_month(month: &str) -> String {
    let trimmed = month.trim();
    if trimmed.len() == 1 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    }
}
