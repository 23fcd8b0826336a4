// Platform-specific code module
pub mod providers;

pub use providers::{create_provider, http_client};
