//! Offer submission state machine
//!
//! `Idle → Submitting → {Success, Failed}`. `Failed` may be resubmitted,
//! `Success` is terminal. The controller never talks to the wallet itself:
//! the session dispatches the snapshot and feeds the completion back in via
//! [`OfferSubmissionController::complete`].

use serde::Serialize;
use tracing::{info, warn};

use crate::core::TransactionId;

/// Where the submission currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success { transaction_id: TransactionId },
    Failed { message: String },
}

/// Completion reported by the wallet task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Published(TransactionId),
    Rejected(String),
}

/// Result of asking to place the offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Snapshot handed to the wallet
    Dispatched,
    /// A submission is in flight; nothing was sent
    AlreadySubmitting,
    /// The offer is already published; nothing was sent
    AlreadyPlaced,
    /// Draft incomplete or a field is invalid
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferSubmissionController {
    state: SubmissionState,
}

impl Default for OfferSubmissionController {
    fn default() -> Self {
        Self::new()
    }
}

impl OfferSubmissionController {
    pub fn new() -> Self {
        Self { state: SubmissionState::Idle }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, SubmissionState::Submitting)
    }

    /// Guarded transition into `Submitting`. `ready` is the draft's
    /// completeness and validity as judged by the caller.
    pub fn begin(&mut self, ready: bool) -> Dispatch {
        match self.state {
            SubmissionState::Submitting => {
                warn!("Place offer ignored: submission already in flight");
                Dispatch::AlreadySubmitting
            }
            SubmissionState::Success { .. } => {
                warn!("Place offer ignored: offer already published");
                Dispatch::AlreadyPlaced
            }
            SubmissionState::Idle | SubmissionState::Failed { .. } if !ready => {
                Dispatch::NotReady
            }
            SubmissionState::Idle | SubmissionState::Failed { .. } => {
                self.state = SubmissionState::Submitting;
                Dispatch::Dispatched
            }
        }
    }

    /// Apply the wallet's answer. Ignored unless a submission is in flight.
    pub fn complete(&mut self, event: SubmissionEvent) {
        if !self.is_submitting() {
            warn!("Dropping submission event {:?} in state {:?}", event, self.state);
            return;
        }
        self.state = match event {
            SubmissionEvent::Published(transaction_id) => {
                info!("Offer published, transaction {}", transaction_id);
                SubmissionState::Success { transaction_id }
            }
            SubmissionEvent::Rejected(message) => {
                warn!("Offer submission failed: {}", message);
                SubmissionState::Failed { message }
            }
        };
    }

    // Affordances

    pub fn place_offer_visible(&self) -> bool {
        !matches!(self.state, SubmissionState::Success { .. })
    }

    /// Disabled while in flight; the session also disables it for an
    /// incomplete draft.
    pub fn place_offer_disabled(&self) -> bool {
        self.is_submitting()
    }

    pub fn close_visible(&self) -> bool {
        matches!(self.state, SubmissionState::Success { .. })
    }

    pub fn show_published_screen(&self) -> bool {
        self.close_visible()
    }

    pub fn request_failed(&self) -> bool {
        matches!(self.state, SubmissionState::Failed { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SubmissionState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match &self.state {
            SubmissionState::Success { transaction_id } => Some(transaction_id),
            _ => None,
        }
    }
}
