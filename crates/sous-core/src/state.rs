//! Operation state machine
//!
//! Tracks the generate/modify/save operations a caller has in flight. Each
//! kind is independently `Idle` or `Pending`; a second operation of a kind
//! that is already pending is rejected, while different kinds may overlap.
//!
//! The most recent [`OperationRecord`] is kept so the caller can retry it
//! without re-supplying parameters. Every `start` bumps a per-kind
//! generation; completions carrying an older generation (an attempt chain
//! that settles after it was cancelled or reset) are ignored.

use crate::error::{Error, Result};
use crate::http::{AiError, CancelToken, ErrorKind, RequestOrchestrator};
use crate::recipe::{ModifyOutcome, OperationKind, OperationRecord, PersistedRecipe, RecipeDraft};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Presentable error stored in the status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// Provider taxonomy kind, when the failure came from the provider
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for OperationError {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.as_ai().map(|ai| ai.kind),
            message: error.user_message(),
            retryable: error.is_retryable(),
        }
    }
}

impl From<&AiError> for OperationError {
    fn from(error: &AiError) -> Self {
        Self {
            kind: Some(error.kind),
            message: error.message.clone(),
            retryable: error.retryable,
        }
    }
}

/// Result of the last successful operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "lowercase")]
pub enum OperationOutcome {
    Generated(RecipeDraft),
    Modified(ModifyOutcome),
    Saved(PersistedRecipe),
}

/// Snapshot of the externally observable state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub generating: bool,
    pub modifying: bool,
    pub saving: bool,
    pub last_error: Option<OperationError>,
    pub retryable: bool,
    pub can_cancel: bool,
    pub last_result: Option<OperationOutcome>,
}

impl OperationStatus {
    pub fn is_idle(&self) -> bool {
        !(self.generating || self.modifying || self.saving)
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Generate => self.generating,
            OperationKind::Modify => self.modifying,
            OperationKind::Save => self.saving,
        }
    }
}

/// Handle used to abort a pending operation
#[derive(Clone)]
pub enum Canceller {
    /// An AI request chain
    Orchestrator(Arc<RequestOrchestrator>),
    /// Work that is not an AI request, such as a store call
    Token(CancelToken),
}

impl Canceller {
    fn cancel(&self) {
        match self {
            Canceller::Orchestrator(orchestrator) => orchestrator.cancel(),
            Canceller::Token(token) => {
                token.cancel();
            }
        }
    }
}

/// Proof that an operation was started; passed back on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTicket {
    pub kind: OperationKind,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    pending: bool,
    generation: u64,
    canceller: Option<Canceller>,
}

#[derive(Default)]
struct Inner {
    slots: [Slot; 3],
    record: Option<OperationRecord>,
    last_error: Option<OperationError>,
    last_result: Option<OperationOutcome>,
}

impl Inner {
    fn slot(&mut self, kind: OperationKind) -> &mut Slot {
        &mut self.slots[index(kind)]
    }

    /// The slot for `ticket` if the ticket is still current
    fn current(&mut self, ticket: OperationTicket) -> Option<&mut Slot> {
        let slot = self.slot(ticket.kind);
        (slot.pending && slot.generation == ticket.generation).then_some(slot)
    }
}

fn index(kind: OperationKind) -> usize {
    match kind {
        OperationKind::Generate => 0,
        OperationKind::Modify => 1,
        OperationKind::Save => 2,
    }
}

/// Per-kind pending flags, last result, last error and the retry record
#[derive(Default)]
pub struct OperationStateMachine {
    inner: Mutex<Inner>,
}

impl OperationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an operation.
    ///
    /// Fails with [`Error::OperationPending`] if one of the same kind is
    /// already pending. Otherwise records `record` for retry, clears the
    /// previous error and enables cancellation.
    pub fn start(&self, record: OperationRecord, canceller: Canceller) -> Result<OperationTicket> {
        let kind = record.kind;
        let mut inner = self.lock();

        let slot = inner.slot(kind);
        if slot.pending {
            tracing::debug!(%kind, "rejecting operation, one is already pending");
            return Err(Error::OperationPending { kind });
        }
        slot.pending = true;
        slot.generation += 1;
        slot.canceller = Some(canceller);
        let generation = slot.generation;

        inner.record = Some(record);
        inner.last_error = None;

        tracing::debug!(%kind, generation, "operation started");
        Ok(OperationTicket { kind, generation })
    }

    /// Complete with a result. Returns `false` if the ticket is stale.
    pub fn succeed(&self, ticket: OperationTicket, outcome: OperationOutcome) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.current(ticket) else {
            tracing::debug!(kind = %ticket.kind, "ignoring stale completion");
            return false;
        };
        slot.pending = false;
        slot.canceller = None;

        inner.last_result = Some(outcome);
        tracing::debug!(kind = %ticket.kind, "operation succeeded");
        true
    }

    /// Complete with an error. Returns `false` if the ticket is stale.
    pub fn fail(&self, ticket: OperationTicket, error: OperationError) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.current(ticket) else {
            tracing::debug!(kind = %ticket.kind, "ignoring stale failure");
            return false;
        };
        slot.pending = false;
        slot.canceller = None;

        tracing::debug!(
            kind = %ticket.kind,
            error_kind = ?error.kind,
            retryable = error.retryable,
            "operation failed"
        );
        inner.last_error = Some(error);
        true
    }

    /// Cancel every pending operation.
    ///
    /// A no-op returning `false` when nothing is pending. Cancelled
    /// operations end with a non-retryable `Cancelled` error.
    pub fn cancel(&self) -> bool {
        let cancellers: Vec<Canceller> = {
            let mut inner = self.lock();
            let mut cancellers = Vec::new();
            for slot in inner.slots.iter_mut().filter(|slot| slot.pending) {
                slot.pending = false;
                slot.generation += 1;
                cancellers.extend(slot.canceller.take());
            }
            if !cancellers.is_empty() {
                inner.last_error = Some(OperationError::from(&AiError::cancelled()));
            }
            cancellers
        };

        if cancellers.is_empty() {
            return false;
        }

        tracing::info!(count = cancellers.len(), "cancelling pending operations");
        for canceller in &cancellers {
            canceller.cancel();
        }
        true
    }

    /// The record `retry_last` should re-run
    pub fn retry_target(&self) -> Result<OperationRecord> {
        let inner = self.lock();
        let record = inner.record.clone().ok_or_else(|| Error::NothingToRetry {
            reason: "no operation has been started".to_string(),
        })?;

        if record.kind == OperationKind::Modify && record.target_id.is_none() {
            return Err(Error::NothingToRetry {
                reason: "the last modify has no target recipe".to_string(),
            });
        }
        Ok(record)
    }

    /// Cancel anything pending and clear every field back to idle
    pub fn reset(&self) {
        self.cancel();

        let mut inner = self.lock();
        inner.record = None;
        inner.last_error = None;
        inner.last_result = None;
        tracing::debug!("operation state reset");
    }

    pub fn status(&self) -> OperationStatus {
        let inner = self.lock();
        let pending = |kind| inner.slots[index(kind)].pending;

        let generating = pending(OperationKind::Generate);
        let modifying = pending(OperationKind::Modify);
        let saving = pending(OperationKind::Save);

        OperationStatus {
            generating,
            modifying,
            saving,
            retryable: inner.last_error.as_ref().is_some_and(|e| e.retryable),
            last_error: inner.last_error.clone(),
            can_cancel: generating || modifying || saving,
            last_result: inner.last_result.clone(),
        }
    }

    pub fn last_record(&self) -> Option<OperationRecord> {
        self.lock().record.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{GenerateParams, ModifyParams, SaveParams};

    fn token() -> (Canceller, CancelToken) {
        let token = CancelToken::new();
        (Canceller::Token(token.clone()), token)
    }

    #[test]
    fn test_start_and_succeed() {
        let machine = OperationStateMachine::new();
        let (canceller, _) = token();

        let ticket = machine
            .start(OperationRecord::generate(GenerateParams::default()), canceller)
            .unwrap();
        let status = machine.status();
        assert!(status.generating);
        assert!(status.can_cancel);

        let draft = RecipeDraft::new("X", "Y");
        assert!(machine.succeed(ticket, OperationOutcome::Generated(draft.clone())));

        let status = machine.status();
        assert!(status.is_idle());
        assert!(!status.can_cancel);
        assert_eq!(status.last_error, None);
        assert_eq!(status.last_result, Some(OperationOutcome::Generated(draft)));
    }

    #[test]
    fn test_mutual_exclusion_is_per_kind() {
        let machine = OperationStateMachine::new();
        machine
            .start(OperationRecord::generate(GenerateParams::default()), token().0)
            .unwrap();

        let second = machine.start(OperationRecord::generate(GenerateParams::default()), token().0);
        assert!(matches!(
            second,
            Err(Error::OperationPending {
                kind: OperationKind::Generate
            })
        ));

        let save = OperationRecord::save(SaveParams {
            draft: RecipeDraft::new("X", "Y"),
            is_new: true,
            replace_target: None,
        });
        assert!(machine.start(save, token().0).is_ok());

        let status = machine.status();
        assert!(status.generating && status.saving && !status.modifying);
    }

    #[test]
    fn test_fail_records_error() {
        let machine = OperationStateMachine::new();
        let ticket = machine
            .start(OperationRecord::generate(GenerateParams::default()), token().0)
            .unwrap();

        let error = AiError::new(ErrorKind::ServerError);
        machine.fail(ticket, OperationError::from(&error));

        let status = machine.status();
        assert!(status.is_idle());
        assert!(status.retryable);
        assert_eq!(status.last_error.unwrap().kind, Some(ErrorKind::ServerError));
    }

    #[test]
    fn test_start_clears_previous_error() {
        let machine = OperationStateMachine::new();
        let ticket = machine
            .start(OperationRecord::generate(GenerateParams::default()), token().0)
            .unwrap();
        machine.fail(ticket, OperationError::from(&AiError::new(ErrorKind::Unknown)));

        machine
            .start(OperationRecord::generate(GenerateParams::default()), token().0)
            .unwrap();
        assert_eq!(machine.status().last_error, None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let machine = OperationStateMachine::new();
        assert!(!machine.cancel());
        assert_eq!(machine.status(), OperationStatus::default());

        let (canceller, token) = token();
        let ticket = machine
            .start(OperationRecord::generate(GenerateParams::default()), canceller)
            .unwrap();

        assert!(machine.cancel());
        assert!(!machine.cancel());
        assert!(token.is_cancelled());

        let status = machine.status();
        assert!(status.is_idle());
        assert!(!status.retryable);
        assert_eq!(status.last_error.unwrap().kind, Some(ErrorKind::Cancelled));

        // The cancelled chain settling late does not overwrite the state
        assert!(!machine.succeed(ticket, OperationOutcome::Generated(RecipeDraft::new("X", "Y"))));
        assert_eq!(machine.status().last_result, None);
    }

    #[test]
    fn test_retry_target() {
        let machine = OperationStateMachine::new();
        assert!(matches!(
            machine.retry_target(),
            Err(Error::NothingToRetry { .. })
        ));

        let record = OperationRecord::generate(GenerateParams::with_additional("vegan"));
        let ticket = machine.start(record.clone(), token().0).unwrap();
        machine.fail(ticket, OperationError::from(&AiError::new(ErrorKind::ServerError)));
        assert_eq!(machine.retry_target().unwrap(), record);
    }

    #[test]
    fn test_modify_without_target_cannot_retry() {
        let machine = OperationStateMachine::new();
        let mut record = OperationRecord::modify(1, ModifyParams::new("less salt"));
        record.target_id = None;
        machine.start(record, token().0).unwrap();
        assert!(matches!(
            machine.retry_target(),
            Err(Error::NothingToRetry { .. })
        ));
    }

    #[test]
    fn test_reset() {
        let machine = OperationStateMachine::new();
        let (canceller, token) = token();
        machine
            .start(OperationRecord::modify(4, ModifyParams::new("spicier")), canceller)
            .unwrap();

        machine.reset();
        assert!(token.is_cancelled());
        assert_eq!(machine.status(), OperationStatus::default());
        assert_eq!(machine.last_record(), None);
    }
}
