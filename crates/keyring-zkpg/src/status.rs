//! # Orchestrator Status
//!
//! Models the coarse progress of the orchestrator as an explicit state
//! machine.
//!
//! ## States
//!
//! ```text
//! IDLE ──► PREFETCHING_FILES ──► IDLE
//!   │              │
//!   ▼              ▼
//! GENERATING_PROOF ──► PROOFS_READY
//!   │
//!   ▼
//! ERROR ──► (IDLE | PREFETCHING_FILES | GENERATING_PROOF)
//! ```
//!
//! Every transition goes through [`StatusMachine::transition`], which
//! rejects anything outside the table with
//! [`StatusError::InvalidTransition`]. [`StatusMachine::reset`] is the only
//! way to reach `idle` unconditionally.
//!
//! Concurrent proof requests share the `generating_proof` state. The
//! machine counts them and settles to `proofs_ready` when the last one
//! completes, unless an error or a reset intervened.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StatusError;

/// Current orchestrator status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZkpgStatus {
    /// Ready; no work in progress.
    Idle,
    /// Loading proving artifacts.
    PrefetchingFiles,
    /// At least one proof is being generated.
    GeneratingProof,
    /// The last proof request completed.
    ProofsReady,
    /// The last operation failed.
    Error {
        /// Failure description.
        reason: String,
    },
}

/// Payload-free discriminant of [`ZkpgStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// See [`ZkpgStatus::Idle`].
    Idle,
    /// See [`ZkpgStatus::PrefetchingFiles`].
    PrefetchingFiles,
    /// See [`ZkpgStatus::GeneratingProof`].
    GeneratingProof,
    /// See [`ZkpgStatus::ProofsReady`].
    ProofsReady,
    /// See [`ZkpgStatus::Error`].
    Error,
}

impl StatusKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PrefetchingFiles => "prefetching_files",
            Self::GeneratingProof => "generating_proof",
            Self::ProofsReady => "proofs_ready",
            Self::Error => "error",
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(&self, to: StatusKind) -> bool {
        use StatusKind::*;
        matches!(
            (self, to),
            (Idle, PrefetchingFiles | GeneratingProof)
                | (PrefetchingFiles, Idle | GeneratingProof | Error)
                | (GeneratingProof, GeneratingProof | ProofsReady | Error)
                | (ProofsReady, Idle | PrefetchingFiles | GeneratingProof)
                | (Error, Idle | PrefetchingFiles | GeneratingProof)
        )
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ZkpgStatus {
    /// Discriminant.
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Idle => StatusKind::Idle,
            Self::PrefetchingFiles => StatusKind::PrefetchingFiles,
            Self::GeneratingProof => StatusKind::GeneratingProof,
            Self::ProofsReady => StatusKind::ProofsReady,
            Self::Error { .. } => StatusKind::Error,
        }
    }

    /// Whether the status reflects a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl std::fmt::Display for ZkpgStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error { reason } => write!(f, "error: {reason}"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// Validated status holder with change notification.
#[derive(Debug)]
pub struct StatusMachine {
    current: ZkpgStatus,
    active_proofs: usize,
    notify: watch::Sender<ZkpgStatus>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    /// A machine in `idle`.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(ZkpgStatus::Idle);
        Self {
            current: ZkpgStatus::Idle,
            active_proofs: 0,
            notify,
        }
    }

    /// Current status.
    pub fn current(&self) -> &ZkpgStatus {
        &self.current
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<ZkpgStatus> {
        self.notify.subscribe()
    }

    /// Move to `to` if the table allows it.
    pub fn transition(&mut self, to: ZkpgStatus) -> Result<(), StatusError> {
        let from = self.current.kind();
        if !from.can_transition_to(to.kind()) {
            return Err(StatusError::InvalidTransition { from, to: to.kind() });
        }
        self.set(to);
        Ok(())
    }

    /// Move to `to` only when the current status is `expected`.
    ///
    /// Returns whether the transition happened.
    pub fn transition_if(&mut self, expected: StatusKind, to: ZkpgStatus) -> bool {
        self.current.kind() == expected && self.transition(to).is_ok()
    }

    /// Enter `generating_proof`, joining any proof already running.
    pub fn begin_proof(&mut self) -> Result<(), StatusError> {
        self.transition(ZkpgStatus::GeneratingProof)?;
        self.active_proofs += 1;
        Ok(())
    }

    /// Record the outcome of a proof started with [`Self::begin_proof`].
    ///
    /// Success settles to `proofs_ready` once no other proof is running.
    /// Failure moves to `error` immediately. Either way nothing happens if
    /// the machine has left `generating_proof` in the meantime.
    pub fn complete_proof(&mut self, outcome: Result<(), String>) {
        self.active_proofs = self.active_proofs.saturating_sub(1);
        match outcome {
            Ok(()) if self.active_proofs == 0 => {
                self.transition_if(StatusKind::GeneratingProof, ZkpgStatus::ProofsReady);
            }
            Ok(()) => {}
            Err(reason) => {
                self.transition_if(StatusKind::GeneratingProof, ZkpgStatus::Error { reason });
            }
        }
    }

    /// Force `idle`, forgetting running proofs.
    pub fn reset(&mut self) {
        self.active_proofs = 0;
        self.set(ZkpgStatus::Idle);
    }

    fn set(&mut self, to: ZkpgStatus) {
        tracing::debug!(from = %self.current, to = %to, "status transition");
        self.current = to.clone();
        self.notify.send_replace(to);
    }
}
