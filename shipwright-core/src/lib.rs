//! Shipwright Core
//!
//! Core types and pure logic for the Shipwright release orchestrator.
//!
//! This crate contains:
//! - Domain types: tags, repository identity, image metadata, release records, run state
//! - Tag resolution and image metadata derivation (no I/O)
//! - The error taxonomy shared by the runner and the CLI

pub mod deriver;
pub mod domain;
pub mod error;
pub mod resolver;
pub mod secret;

pub use deriver::{MetadataDeriver, TagConventions};
pub use domain::image::ImageMetadata;
pub use domain::release::ReleaseRecord;
pub use domain::repository::RepositoryIdentity;
pub use domain::tag::Tag;
pub use error::{MetadataError, PublishError, ResolutionError};
pub use resolver::{EventContext, ResolvedTags, TagResolver, parse_tag_list};
pub use secret::Secret;
