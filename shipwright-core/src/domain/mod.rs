//! Core domain types
//!
//! These types represent the entities of a release run. They are built fresh
//! for every tag push and shared read-only between the two publish branches.

pub mod image;
pub mod release;
pub mod repository;
pub mod run;
pub mod tag;
