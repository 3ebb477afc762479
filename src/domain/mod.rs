//! Domain types and DTOs
//!
//! These types define the data structures exchanged between the dashboard,
//! the workspace and the analysis service.

pub mod analysis;
pub mod files;
pub mod settings;

// Re-export commonly used types
pub use analysis::*;
pub use files::*;
pub use settings::*;
