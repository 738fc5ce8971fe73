//! membank-core: Shared types, errors, and configuration for the membank
//! graph memory service.

pub mod cancel;
pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use cancel::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use types::*;
