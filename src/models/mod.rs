//! Data models for the tour catalog.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod tour;

pub use tour::*;
