//! recipe-acquire: get recipe text off hostile web pages and turn model
//! output into a canonical recipe.
//!
//! - [`scrapers`]: block detection, randomized identities and the escalating
//!   fetch controller (direct HTTP, headless browser, unblocking proxy).
//! - [`extraction`]: JSON recovery from model output and recipe
//!   normalization.
//! - [`llm`]: the model boundary.
//! - [`pipeline`]: the caller-facing [`RecipeExtractor`].

pub mod cli;
pub mod config;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod utils;

pub use config::Config;
pub use models::Recipe;
pub use pipeline::{ExtractError, RecipeExtractor};
