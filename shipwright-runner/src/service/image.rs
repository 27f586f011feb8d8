//! Image publisher
//!
//! Builds the container image once with every derived tag and label, then
//! pushes each tag separately so a failure on one tag is reported without
//! hiding the others.

use async_trait::async_trait;
use shipwright_core::domain::image::{ImagePushReport, TagOutcome, TagPush};
use shipwright_core::{ImageMetadata, PublishError, Secret};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::engine::{BuildRequest, ContainerEngine};
use crate::retry::RetryPolicy;

/// Where to build from and where to push to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub context_dir: PathBuf,
    pub recipe: PathBuf,
    /// Image repository without tag, e.g. `ghcr.io/org/pkg`
    pub repository: String,
}

/// Image registry login
#[derive(Debug, Clone)]
pub struct RegistryCredentials {
    pub registry: String,
    pub username: String,
    pub token: Secret,
}

/// Service trait for building and pushing the release image
#[async_trait]
pub trait ImagePublisher: Send + Sync {
    /// Builds the image and pushes every tag in `metadata`
    ///
    /// # Returns
    /// A per-tag report once the build succeeded. Individual push failures
    /// live in the report; `Err` means nothing was pushed.
    async fn build_and_push(
        &self,
        context: &BuildContext,
        metadata: &ImageMetadata,
        credentials: &RegistryCredentials,
    ) -> Result<ImagePushReport, PublishError>;
}

/// [`ImagePublisher`] driving a [`ContainerEngine`]
#[derive(Debug, Clone)]
pub struct EngineImagePublisher<E> {
    engine: E,
    retry: RetryPolicy,
}

impl<E: ContainerEngine> EngineImagePublisher<E> {
    pub fn new(engine: E, retry: RetryPolicy) -> Self {
        Self { engine, retry }
    }

    async fn login(&self, credentials: &RegistryCredentials) -> Result<(), PublishError> {
        if credentials.token.is_empty() {
            warn!(
                "No image registry token configured, pushing to {} with ambient credentials",
                credentials.registry
            );
            return Ok(());
        }

        self.retry
            .run("registry login", || {
                self.engine.login(
                    &credentials.registry,
                    &credentials.username,
                    &credentials.token,
                )
            })
            .await
            .result
    }
}

fn failed(tag: &str, reference: &str, error: &PublishError, attempts: u32) -> TagPush {
    TagPush {
        tag: tag.to_string(),
        reference: reference.to_string(),
        outcome: TagOutcome::Failed {
            kind: error.kind().to_string(),
            error: error.to_string(),
            attempts,
        },
    }
}

#[async_trait]
impl<E: ContainerEngine> ImagePublisher for EngineImagePublisher<E> {
    async fn build_and_push(
        &self,
        context: &BuildContext,
        metadata: &ImageMetadata,
        credentials: &RegistryCredentials,
    ) -> Result<ImagePushReport, PublishError> {
        self.engine.check_available().await?;
        self.login(credentials).await?;

        let references = metadata.references(&context.repository);
        self.engine
            .build(&BuildRequest {
                context_dir: context.context_dir.clone(),
                recipe: context.recipe.clone(),
                references: references.clone(),
                labels: metadata.labels.clone(),
            })
            .await?;

        let mut pushes = Vec::with_capacity(references.len());
        let mut credentials_rejected = false;

        for (tag, reference) in metadata.tags.iter().zip(&references) {
            if credentials_rejected {
                pushes.push(TagPush {
                    tag: tag.clone(),
                    reference: reference.clone(),
                    outcome: TagOutcome::Failed {
                        kind: "skipped".to_string(),
                        error: "not attempted after the registry rejected the credentials"
                            .to_string(),
                        attempts: 0,
                    },
                });
                continue;
            }

            let retried = self
                .retry
                .run("image push", || self.engine.push(reference))
                .await;

            match retried.result {
                Ok(()) => {
                    info!("Pushed {} ({} attempt(s))", reference, retried.attempts);
                    pushes.push(TagPush {
                        tag: tag.clone(),
                        reference: reference.clone(),
                        outcome: TagOutcome::Pushed {
                            attempts: retried.attempts,
                        },
                    });
                }
                Err(e) => {
                    error!(
                        "Failed to push {} after {} attempt(s): {}",
                        reference, retried.attempts, e
                    );
                    credentials_rejected = matches!(e, PublishError::Credential(_));
                    pushes.push(failed(tag, reference, &e, retried.attempts));
                }
            }
        }

        Ok(ImagePushReport {
            repository: context.repository.clone(),
            pushes,
        })
    }
}
