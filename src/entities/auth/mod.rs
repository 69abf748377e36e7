//! Token authentication and account self-service

pub mod descriptor;
pub mod handlers;
pub mod provider;

pub use descriptor::AuthDescriptor;
pub use provider::JwtAuthProvider;
