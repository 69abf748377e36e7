//! Bootcamp listings

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::BootcampDescriptor;
pub use model::Bootcamp;
