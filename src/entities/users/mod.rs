//! Registered accounts and their admin routes

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::UserDescriptor;
pub use model::User;
