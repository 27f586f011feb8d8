//! The two publish branches
//!
//! Both functions run inside their own task and always return a report in a
//! terminal state; errors are recorded, never propagated.

use shipwright_core::domain::run::{Branch, BranchDetail, BranchReport, TransitionError};
use shipwright_core::{PublishError, RepositoryIdentity, ResolvedTags, Tag};
use std::sync::Arc;
use tracing::{error, info};

use super::RunSettings;
use crate::service::{
    ArtifactContext, BuildContext, ImagePublisher, PackagePublisher, ReleaseNotePublisher,
};

fn check(transition: Result<(), TransitionError>) {
    if let Err(e) = transition {
        error!("{}", e);
    }
}

fn settle(report: &mut BranchReport, outcome: Result<(), String>) {
    match outcome {
        Ok(()) => {
            info!("[{}] branch succeeded", report.branch);
            check(report.succeed());
        }
        Err(diagnostic) => {
            error!("[{}] branch failed: {}", report.branch, diagnostic);
            check(report.fail(diagnostic));
        }
    }
}

/// Publishes the package, then the release note
///
/// The release note is only attempted once the package is published.
pub(super) async fn run_package(
    settings: Arc<RunSettings>,
    package: Arc<dyn PackagePublisher>,
    notes: Arc<dyn ReleaseNotePublisher>,
    tags: ResolvedTags,
) -> BranchReport {
    let mut report = BranchReport::new(Branch::Package);
    check(report.start());

    let artifact = ArtifactContext {
        manifest_path: settings.manifest_path.clone(),
        version: tags.current.clone(),
    };

    let mut receipt = None;
    let mut release = None;
    let mut release_attempted = false;

    let outcome = async {
        receipt = Some(package.publish(&artifact, &settings.package_token).await?);

        let (title, body) =
            settings
                .template
                .render(&tags.current, tags.previous.as_ref(), &settings.repository);
        release_attempted = true;
        release = Some(notes.create_release(&tags.current, &title, &body).await?);

        Ok::<(), PublishError>(())
    }
    .await;

    report.detail = BranchDetail::Package {
        receipt,
        release,
        release_attempted,
    };
    settle(&mut report, outcome.map_err(|e| e.to_string()));
    report
}

/// Derives image metadata, builds the image and pushes every tag
///
/// The branch fails when metadata cannot be derived, the build fails, or any
/// tag did not reach the registry.
pub(super) async fn run_image(
    settings: Arc<RunSettings>,
    image: Arc<dyn ImagePublisher>,
    tag: Tag,
) -> BranchReport {
    let mut report = BranchReport::new(Branch::Image);
    check(report.start());

    let derived = RepositoryIdentity::parse(&settings.repository).and_then(|identity| {
        let metadata = settings.deriver.derive(&settings.repository, &tag)?;
        Ok((identity, metadata))
    });

    let (identity, metadata) = match derived {
        Ok(derived) => derived,
        Err(e) => {
            settle(&mut report, Err(e.to_string()));
            return report;
        }
    };

    info!("[image] Publishing tags: {}", metadata.tags.join(", "));

    let context = BuildContext {
        context_dir: settings.context_dir.clone(),
        recipe: settings.recipe.clone(),
        repository: format!("{}/{}", settings.image_registry, identity.image_path()),
    };

    let pushed = image
        .build_and_push(&context, &metadata, &settings.credentials)
        .await;

    let (push, outcome) = match pushed {
        Ok(push) if push.all_pushed() => (Some(push), Ok(())),
        Ok(push) => {
            let diagnostic = format!("failed to push tag(s): {}", push.failed_tags().join(", "));
            (Some(push), Err(diagnostic))
        }
        Err(e) => (None, Err(e.to_string())),
    };

    report.detail = BranchDetail::Image {
        metadata: Some(metadata),
        push,
    };
    settle(&mut report, outcome);
    report
}
