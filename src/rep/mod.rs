pub mod angle;
pub mod counter;
pub mod exercise;

pub use angle::{joint_angle, AngleWindow};
pub use counter::{Phase, RepCounter, RepState};
pub use exercise::ExerciseKind;
