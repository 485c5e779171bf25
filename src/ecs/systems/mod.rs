//! ECS systems run once per frame.

pub mod transform;

pub use transform::reset_prev_transform_system;
