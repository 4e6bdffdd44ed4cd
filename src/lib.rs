pub mod config;
pub mod model;
pub mod output;
pub mod predict;
pub mod progress;
