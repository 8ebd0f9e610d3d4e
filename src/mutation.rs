//! Mutation Coordinator: runs one confirmed mutation at a time and
//! reconciles the Collection Store with the outcome.
//!
//! Deletes are reconciled optimistically by dropping the record from the
//! snapshot. Transitions are applied only after the service accepted them,
//! in place when the response carries the updated record and through a
//! re-fetch of that one domain otherwise. A failed mutation never touches
//! the snapshot.

use derive_more::Display;
use futures::future::BoxFuture;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::confirm::ConfirmedAction;
use crate::error::{GatewayError, MutationError};
use crate::gateway::{Gateways, LeaveGateway, PayrollGateway, ResourceGateway};
use crate::model::{
    Department, Employee, JobRole, LeaveDecision, LeaveRequest, Payroll, ResourceKind,
};
use crate::session::Session;
use crate::store::{Collected, Collection, CollectionStore, Dataset, Fetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operation {
    Delete,
    Approve,
    Reject,
    Process,
}

impl Operation {
    pub fn applies_to(self, kind: ResourceKind) -> bool {
        match self {
            Operation::Delete => matches!(
                kind,
                ResourceKind::Employee | ResourceKind::Department | ResourceKind::JobRole
            ),
            Operation::Approve | Operation::Reject => kind == ResourceKind::LeaveRequest,
            Operation::Process => kind == ResourceKind::Payroll,
        }
    }

    /// Transitions go through the service before the snapshot changes.
    pub fn is_transition(self) -> bool {
        !matches!(self, Operation::Delete)
    }

    pub fn decision(self) -> Option<LeaveDecision> {
        match self {
            Operation::Approve => Some(LeaveDecision::Approve),
            Operation::Reject => Some(LeaveDecision::Reject),
            _ => None,
        }
    }
}

/// The record a mutation is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{} #{}", kind, id)]
pub struct Target {
    pub kind: ResourceKind,
    pub id: u64,
}

impl Target {
    pub fn new(kind: ResourceKind, id: u64) -> Self {
        Self { kind, id }
    }
}

/// A user-requested mutation, from the confirmation prompt until its
/// gateway round trip is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub id: Uuid,
    pub operation: Operation,
    pub target: Target,
}

impl PendingAction {
    pub fn new(operation: Operation, target: Target) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            target,
        }
    }

    /// Question shown to the user before dispatch.
    pub fn prompt(&self) -> String {
        format!("{} {}?", self.operation, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    AwaitingConfirmation,
    Executing,
}

/// The record a transition endpoint echoed back.
#[derive(Debug, Clone, PartialEq)]
pub enum Echo {
    Leave(LeaveRequest),
    Payroll(Payroll),
}

/// What the gateway side of a mutation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    Deleted,
    Updated(Echo),
    /// The transition was acknowledged without a record; this is the
    /// domain's collection as re-read afterwards.
    Refetched(Collection),
    /// The transition succeeded but the follow-up read did not.
    RefetchFailed(GatewayError),
}

/// How the snapshot was brought in line with a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Removed,
    ReplacedInPlace,
    Refetched,
    /// The record was no longer in the snapshot; nothing to update.
    NotInView,
    /// The mutation succeeded but the snapshot could not be refreshed.
    Stale(GatewayError),
    /// The coordinator no longer tracks this action.
    Discarded,
}

/// A dispatched mutation. Await [`InFlightMutation::run`] and hand the
/// result to [`MutationCoordinator::finish`].
pub struct InFlightMutation {
    action: PendingAction,
    execution: BoxFuture<'static, Result<GatewayOutcome, GatewayError>>,
}

impl InFlightMutation {
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub async fn run(self) -> MutationResult {
        MutationResult {
            result: self.execution.await,
            action: self.action,
        }
    }
}

pub struct MutationResult {
    pub action: PendingAction,
    pub result: Result<GatewayOutcome, GatewayError>,
}

#[derive(Debug, Default)]
pub struct MutationCoordinator {
    in_flight: Option<PendingAction>,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn executing(&self) -> Option<&PendingAction> {
        self.in_flight.as_ref()
    }

    /// Dispatches a confirmed action. `refetch` re-reads the target's
    /// collection the way the owning screen loaded it.
    pub fn begin(
        &mut self,
        confirmed: ConfirmedAction,
        gateways: &Gateways,
        session: &Session,
        refetch: Fetcher,
    ) -> Result<InFlightMutation, MutationError> {
        let action = confirmed.into_action();

        if let Some(running) = &self.in_flight {
            warn!(
                action_id = %action.id,
                running = %running.id,
                "Rejecting mutation while another is executing"
            );
            return Err(MutationError::Busy);
        }

        let Target { kind, id } = action.target;
        if !action.operation.applies_to(kind) {
            return Err(MutationError::Unsupported {
                operation: action.operation,
                kind,
            });
        }

        // Leave decisions are recorded against the approver's employee record.
        let approver = match action.operation.decision() {
            Some(_) => Some(session.require_employee()?),
            None => None,
        };

        info!(
            action_id = %action.id,
            operation = %action.operation,
            target = %action.target,
            "Dispatching mutation"
        );

        let gateways = gateways.clone();
        let session = session.clone();
        let operation = action.operation;

        let execution: BoxFuture<'static, Result<GatewayOutcome, GatewayError>> =
            Box::pin(async move {
                match (operation, kind) {
                    (Operation::Delete, ResourceKind::Employee) => {
                        gateways.employees.delete(&session, id).await?;
                        Ok(GatewayOutcome::Deleted)
                    }
                    (Operation::Delete, ResourceKind::Department) => {
                        gateways.departments.delete(&session, id).await?;
                        Ok(GatewayOutcome::Deleted)
                    }
                    (Operation::Delete, ResourceKind::JobRole) => {
                        gateways.job_roles.delete(&session, id).await?;
                        Ok(GatewayOutcome::Deleted)
                    }
                    (Operation::Approve | Operation::Reject, ResourceKind::LeaveRequest) => {
                        let (Some(decision), Some(approver)) = (operation.decision(), approver)
                        else {
                            return Err(GatewayError::Transport(format!(
                                "{operation} carries no decision"
                            )));
                        };
                        let echo = gateways
                            .leaves
                            .update_leave_status(&session, id, decision, approver)
                            .await?;
                        Ok(after_transition(echo.map(Echo::Leave), refetch).await)
                    }
                    (Operation::Process, ResourceKind::Payroll) => {
                        let echo = gateways.payrolls.process_payroll(&session, id).await?;
                        Ok(after_transition(echo.map(Echo::Payroll), refetch).await)
                    }
                    (operation, kind) => Err(GatewayError::Transport(format!(
                        "{operation} is not available for {kind}"
                    ))),
                }
            });

        self.in_flight = Some(action.clone());
        Ok(InFlightMutation { action, execution })
    }

    /// Applies a finished mutation to `store` and releases the coordinator.
    pub fn finish(
        &mut self,
        finished: MutationResult,
        store: &mut CollectionStore,
    ) -> Result<Reconciliation, MutationError> {
        let MutationResult { action, result } = finished;

        if self.in_flight.as_ref().map(|a| a.id) != Some(action.id) {
            debug!(action_id = %action.id, "Discarding result of untracked mutation");
            return Ok(Reconciliation::Discarded);
        }
        self.in_flight = None;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    action_id = %action.id,
                    target = %action.target,
                    error = %err,
                    "Mutation failed; snapshot unchanged"
                );
                return Err(MutationError::Gateway(err));
            }
        };

        let Some(dataset) = store.snapshot_mut() else {
            debug!(action_id = %action.id, "No snapshot to reconcile");
            return Ok(Reconciliation::Discarded);
        };

        let reconciliation = reconcile(dataset, action.target, outcome)?;
        if matches!(
            reconciliation,
            Reconciliation::Removed | Reconciliation::ReplacedInPlace | Reconciliation::Refetched
        ) {
            store.supersede_in_flight();
        }
        info!(
            action_id = %action.id,
            target = %action.target,
            reconciliation = ?reconciliation,
            "Mutation applied"
        );
        Ok(reconciliation)
    }

    /// Dispatches, awaits and reconciles in one call.
    pub async fn mutate(
        &mut self,
        confirmed: ConfirmedAction,
        gateways: &Gateways,
        session: &Session,
        refetch: Fetcher,
        store: &mut CollectionStore,
    ) -> Result<Reconciliation, MutationError> {
        let in_flight = self.begin(confirmed, gateways, session, refetch)?;
        let finished = in_flight.run().await;
        self.finish(finished, store)
    }
}

async fn after_transition(echo: Option<Echo>, refetch: Fetcher) -> GatewayOutcome {
    match echo {
        Some(echo) => GatewayOutcome::Updated(echo),
        None => match refetch().await {
            Ok(collection) => GatewayOutcome::Refetched(collection),
            Err(err) => GatewayOutcome::RefetchFailed(err),
        },
    }
}

fn reconcile(
    dataset: &mut Dataset,
    target: Target,
    outcome: GatewayOutcome,
) -> Result<Reconciliation, MutationError> {
    match outcome {
        GatewayOutcome::Deleted => {
            let removed = match target.kind {
                ResourceKind::Employee => dataset.remove::<Employee>(target.id),
                ResourceKind::Department => dataset.remove::<Department>(target.id),
                ResourceKind::JobRole => dataset.remove::<JobRole>(target.id),
                ResourceKind::LeaveRequest => dataset.remove::<LeaveRequest>(target.id),
                ResourceKind::Payroll => dataset.remove::<Payroll>(target.id),
            };
            Ok(if removed {
                Reconciliation::Removed
            } else {
                Reconciliation::NotInView
            })
        }
        GatewayOutcome::Updated(Echo::Leave(leave)) => replace_in_place(dataset, leave),
        GatewayOutcome::Updated(Echo::Payroll(payroll)) => replace_in_place(dataset, payroll),
        GatewayOutcome::Refetched(collection) => {
            dataset
                .replace(collection)
                .map_err(MutationError::InvalidRecord)?;
            Ok(Reconciliation::Refetched)
        }
        GatewayOutcome::RefetchFailed(err) => {
            warn!(target = %target, error = %err, "Re-fetch after transition failed");
            Ok(Reconciliation::Stale(err))
        }
    }
}

fn replace_in_place<R: Collected>(
    dataset: &mut Dataset,
    record: R,
) -> Result<Reconciliation, MutationError> {
    let replaced = dataset
        .upsert(record)
        .map_err(MutationError::InvalidRecord)?;
    Ok(if replaced {
        Reconciliation::ReplacedInPlace
    } else {
        Reconciliation::NotInView
    })
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
