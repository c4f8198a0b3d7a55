//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store calls into use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod note_service;
