//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and engine runs into use-case level APIs.
//! - Keep the dispatch/API layer decoupled from storage details.

pub mod grid_service;
