//! Core types and shared functionality for fora.
//!
//! This crate provides:
//! - The thread data model (posts, page locators, chapter references)
//! - Unified error types
//! - Configuration structures
//! - Chapter list and thread archive codecs

pub mod archive;
pub mod chapters;
pub mod config;
pub mod error;
pub mod model;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{Chapter, ChapterReference, PageLocator, PageSelection, Post, Thread};
