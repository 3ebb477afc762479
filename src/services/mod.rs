//! Service layer modules.
//!
//! Contains the analysis request builder, the AI service client, the dashboard
//! workspace and user preferences.

pub mod ai_client;
pub mod preferences;
pub mod request_builder;
pub mod workspace;

pub use ai_client::AiClient;
pub use preferences::Preferences;
pub use request_builder::ModelSelection;
pub use workspace::Workspace;
