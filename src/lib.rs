pub mod config;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod math;
pub mod pipeline;
pub mod scene;
pub mod tessellation;

pub use error::{Result, SightlineError};
