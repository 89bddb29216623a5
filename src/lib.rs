pub mod clock;
pub mod config;
pub mod pipeline;
pub mod pose;
pub mod rep;
pub mod stabilizer;
