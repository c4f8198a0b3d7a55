//! Year/month archive index over a note set.
//!
//! # Responsibility
//! - List the years and the months within a year that have notes, feeding the
//!   `Year` and `YearMonth` filters.
//!
//! # Invariants
//! - Output is distinct and sorted descending (newest first).
//! - Dates that do not split into `YYYY-MM-...` are skipped.

use crate::model::note::Note;
use std::collections::BTreeSet;

/// Distinct years with at least one note, newest first.
pub fn years(notes: &[Note]) -> Vec<String> {
    let distinct: BTreeSet<&str> = notes
        .iter()
        .filter_map(|note| date_parts(&note.date).map(|(year, _)| year))
        .collect();
    distinct.into_iter().rev().map(str::to_string).collect()
}

/// Distinct two-digit months of `year` with at least one note, newest first.
pub fn months_in(notes: &[Note], year: &str) -> Vec<String> {
    let year = year.trim();
    let distinct: BTreeSet<&str> = notes
        .iter()
        .filter_map(|note| date_parts(&note.date))
        .filter(|(note_year, _)| *note_year == year)
        .map(|(_, month)| month)
        .collect();
    distinct.into_iter().rev().map(str::to_string).collect()
}

fn date_parts(date: &str) -> Option<(&str, &str)> {
    let mut parts = date.splitn(3, '-');
    let year = parts.next().filter(|year| !year.is_empty())?;
    let month = parts.next().filter(|month| !month.is_empty())?;
    Some((year, month))
}
