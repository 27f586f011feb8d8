//! Repository layer
//!
//! Repositories are stateless adapters over the hosting platform API. They
//! carry no release policy; the services decide what a response means.
//!
//! All repositories are trait-based to enable testing and mocking.

mod releases;

// Re-export traits
pub use releases::ReleaseRepository;

// Re-export implementations
pub use releases::HttpReleaseRepository;
