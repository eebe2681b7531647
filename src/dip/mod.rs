//! DIP module - the heart of the registry
//!
//! Parses proposal documents, validates their metadata, and tracks them
//! through the review lifecycle.

mod models;
mod parser;
mod validator;
pub mod lifecycle;
mod registry;
mod loader;

pub use models::*;
pub use parser::parse;
pub use validator::{SchemaValidator, ValidationError, ValidationReport};
pub use lifecycle::TransitionEngine;
pub use registry::{DipFilter, DipRegistry};
pub use loader::DipLoader;
