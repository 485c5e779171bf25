//! ECS components (transform, collision).

pub mod collision;
pub mod transform;

pub use collision::*;
pub use transform::*;
