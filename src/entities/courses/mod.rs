//! Courses offered by a bootcamp

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::CourseDescriptor;
pub use model::{AVERAGE_COST, Course};
