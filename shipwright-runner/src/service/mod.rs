//! Service layer
//!
//! The three publishers a release run drives. Each one wraps an external
//! collaborator (package registry, hosting platform, image registry) behind a
//! trait so the orchestrator can be exercised with fakes.

mod image;
mod package;
mod release;

#[cfg(test)]
pub mod fakes;

// Re-export traits
pub use image::ImagePublisher;
pub use package::PackagePublisher;
pub use release::ReleaseNotePublisher;

// Re-export implementations and their inputs
pub use image::{BuildContext, EngineImagePublisher, RegistryCredentials};
pub use package::{ArtifactContext, CargoPackagePublisher};
pub use release::{PlatformReleaseNotePublisher, ReleaseTemplate};
