//! Run and branch state
//!
//! A run has two branches (package, image). Each moves
//! `Pending -> Running -> {Succeeded, Failed}`; the run status is derived from
//! both terminal states once they are known.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::image::{ImageMetadata, ImagePushReport};
use super::release::{PackageReceipt, ReleaseRecord};
use super::tag::Tag;

/// The two independent publish pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Package publish followed by the release note
    Package,
    /// Image build followed by pushing every tag
    Image,
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Branch::Package => f.write_str("package"),
            Branch::Image => f.write_str("image"),
        }
    }
}

/// Branch execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl BranchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BranchState::Succeeded | BranchState::Failed)
    }

    pub fn can_transition_to(self, next: BranchState) -> bool {
        matches!(
            (self, next),
            (BranchState::Pending, BranchState::Running)
                | (BranchState::Running, BranchState::Succeeded)
                | (BranchState::Running, BranchState::Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {branch} branch transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub branch: Branch,
    pub from: BranchState,
    pub to: BranchState,
}

/// What a branch produced, depending on which branch it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BranchDetail {
    Package {
        receipt: Option<PackageReceipt>,
        release: Option<ReleaseRecord>,
        /// Whether the release note publisher was called at all
        release_attempted: bool,
    },
    Image {
        metadata: Option<ImageMetadata>,
        push: Option<ImagePushReport>,
    },
}

/// Outcome of one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReport {
    pub branch: Branch,
    pub state: BranchState,
    /// Why the branch failed, when it did
    pub diagnostic: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub detail: BranchDetail,
}

impl BranchReport {
    pub fn new(branch: Branch) -> Self {
        let detail = match branch {
            Branch::Package => BranchDetail::Package {
                receipt: None,
                release: None,
                release_attempted: false,
            },
            Branch::Image => BranchDetail::Image {
                metadata: None,
                push: None,
            },
        };

        Self {
            branch,
            state: BranchState::Pending,
            diagnostic: None,
            started_at: None,
            completed_at: None,
            detail,
        }
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(BranchState::Running)?;
        self.started_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn succeed(&mut self) -> Result<(), TransitionError> {
        self.transition(BranchState::Succeeded)?;
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, diagnostic: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(BranchState::Failed)?;
        self.diagnostic = Some(diagnostic.into());
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Marks the branch failed regardless of where it stopped
    ///
    /// Used when the task running the branch died and its own report was lost.
    pub fn abandoned(branch: Branch, diagnostic: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            state: BranchState::Failed,
            diagnostic: Some(diagnostic.into()),
            started_at: Some(now),
            completed_at: Some(now),
            ..Self::new(branch)
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == BranchState::Succeeded
    }

    fn transition(&mut self, next: BranchState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                branch: self.branch,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Terminal status of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    PartiallySucceeded,
    Failed,
}

impl RunStatus {
    pub fn from_branches(package: &BranchReport, image: &BranchReport) -> Self {
        match (package.succeeded(), image.succeeded()) {
            (true, true) => RunStatus::Succeeded,
            (false, false) => RunStatus::Failed,
            _ => RunStatus::PartiallySucceeded,
        }
    }

    /// Process exit code for the runner binary
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 1,
            RunStatus::PartiallySucceeded => 2,
        }
    }
}

/// Aggregated outcome of one release run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub tag: Tag,
    pub previous_tag: Option<Tag>,
    pub package: BranchReport,
    pub image: BranchReport,
    pub status: RunStatus,
}

impl RunReport {
    pub fn new(
        run_id: Uuid,
        tag: Tag,
        previous_tag: Option<Tag>,
        package: BranchReport,
        image: BranchReport,
    ) -> Self {
        let status = RunStatus::from_branches(&package, &image);
        Self {
            run_id,
            tag,
            previous_tag,
            package,
            image,
            status,
        }
    }

    pub fn branches(&self) -> [&BranchReport; 2] {
        [&self.package, &self.image]
    }
}
