//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical geotagged note record and its insert shape.
//! - Validate coordinates, calendar fields and image slots before persistence.
//!
//! # Invariants
//! - `id` is assigned by the store, immutable, and never reused.
//! - `latitude` is within `[-90, 90]`, `longitude` within `[-180, 180]`.
//! - At most [`MAX_IMAGES`] image references are attached to one note.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of image references attached to one note.
pub const MAX_IMAGES: usize = 3;

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date regex")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid time regex"));

/// Store-assigned note identifier.
pub type NoteId = i64;

/// WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Validation failures for note write paths.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteValidationError {
    /// Latitude/longitude outside WGS84 range or not finite.
    MalformedCoordinate { latitude: f64, longitude: f64 },
    /// Date is not a `YYYY-MM-DD` calendar date.
    InvalidDate(String),
    /// Time is not a `HH:MM` wall-clock time.
    InvalidTime(String),
    /// More image references than slots.
    TooManyImages(usize),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedCoordinate {
                latitude,
                longitude,
            } => write!(
                f,
                "malformed coordinate ({latitude}, {longitude}); expected lat in [-90, 90] and lng in [-180, 180]"
            ),
            Self::InvalidDate(value) => write!(f, "invalid date `{value}`; expected YYYY-MM-DD"),
            Self::InvalidTime(value) => write!(f, "invalid time `{value}`; expected HH:MM"),
            Self::TooManyImages(count) => {
                write!(f, "note has {count} images; at most {MAX_IMAGES} are allowed")
            }
        }
    }
}

impl Error for NoteValidationError {}

/// Insert shape for a note. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub body: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock time, `HH:MM`.
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable place label, e.g. `Gyeongbokgung`.
    pub location_name: String,
    pub weather: String,
    /// Up to [`MAX_IMAGES`] opaque image references.
    pub image_uris: Vec<String>,
    pub is_favorite: bool,
}

impl NoteDraft {
    /// Creates a draft with empty body/metadata and no images.
    pub fn new(
        title: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
        position: GeoPoint,
    ) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            date: date.into(),
            time: time.into(),
            latitude: position.latitude,
            longitude: position.longitude,
            location_name: String::new(),
            weather: String::new(),
            image_uris: Vec::new(),
            is_favorite: false,
        }
    }

    pub fn with_location_name(mut self, location_name: impl Into<String>) -> Self {
        self.location_name = location_name.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_fields(
            self.position(),
            &self.date,
            &self.time,
            self.image_uris.len(),
        )
    }

    /// Attaches a store-assigned id.
    pub fn into_note(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            body: self.body,
            date: self.date,
            time: self.time,
            latitude: self.latitude,
            longitude: self.longitude,
            location_name: self.location_name,
            weather: self.weather,
            image_uris: self.image_uris,
            is_favorite: self.is_favorite,
        }
    }
}

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub weather: String,
    pub image_uris: Vec<String>,
    pub is_favorite: bool,
}

impl Note {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Validates write-path invariants. Same rules as [`NoteDraft::validate`].
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_fields(
            self.position(),
            &self.date,
            &self.time,
            self.image_uris.len(),
        )
    }
}

fn validate_fields(
    position: GeoPoint,
    date: &str,
    time: &str,
    image_count: usize,
) -> Result<(), NoteValidationError> {
    if !position.is_valid() {
        return Err(NoteValidationError::MalformedCoordinate {
            latitude: position.latitude,
            longitude: position.longitude,
        });
    }
    if !DATE_RE.is_match(date) {
        return Err(NoteValidationError::InvalidDate(date.to_string()));
    }
    if !TIME_RE.is_match(time) {
        return Err(NoteValidationError::InvalidTime(time.to_string()));
    }
    if image_count > MAX_IMAGES {
        return Err(NoteValidationError::TooManyImages(image_count));
    }
    Ok(())
}
