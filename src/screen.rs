//! Per-screen controller: one Collection Store, the screen's view
//! parameters, its Confirmation Gate and its Mutation Coordinator.
//!
//! A screen knows which collections it composes and how to fetch each of
//! them for the acting session. Everything it shows is derived on demand
//! from the last Ready snapshot.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::confirm::ConfirmationGate;
use crate::derive::{
    self, AdminSummary, DerivedView, EmployeeProfile, EmployeeSummary, Filterable, PayrollTotals,
    ViewParams,
};
use crate::error::{GatewayError, MutationError, Surface};
use crate::gateway::{Gateways, LeaveGateway, PayrollGateway, ResourceGateway};
use crate::model::{Department, Employee, JobRole, LeaveRequest, Payroll, ResourceKind};
use crate::mutation::{
    ActionPhase, InFlightMutation, MutationCoordinator, MutationResult, Operation, PendingAction,
    Reconciliation, Target,
};
use crate::session::Session;
use crate::store::{
    Applied, Collected, Collection, CollectionStore, Dataset, Fetcher, LoadOutcome, LoadStatus,
    PendingLoad, fetcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    DepartmentList,
    JobRoleList,
    EmployeeList,
    EmployeeProfile(u64),
    LeaveApproval,
    LeaveHistory,
    PayrollList,
    PayrollDetails(u64),
    AdminDashboard,
    EmployeeDashboard,
}

impl ScreenKind {
    /// Collections loaded together on mount, in fetch order.
    pub fn collections(self) -> &'static [ResourceKind] {
        const EMPLOYEE_LIST: &[ResourceKind] = &[
            ResourceKind::Employee,
            ResourceKind::Department,
            ResourceKind::JobRole,
        ];
        const PROFILE: &[ResourceKind] = &[
            ResourceKind::Employee,
            ResourceKind::Department,
            ResourceKind::JobRole,
            ResourceKind::LeaveRequest,
            ResourceKind::Payroll,
        ];
        const PERSONAL: &[ResourceKind] = &[
            ResourceKind::Employee,
            ResourceKind::LeaveRequest,
            ResourceKind::Payroll,
        ];

        match self {
            ScreenKind::DepartmentList => &[ResourceKind::Department],
            ScreenKind::JobRoleList => &[ResourceKind::JobRole],
            ScreenKind::EmployeeList => EMPLOYEE_LIST,
            ScreenKind::LeaveApproval | ScreenKind::LeaveHistory => &[ResourceKind::LeaveRequest],
            ScreenKind::PayrollList => &[ResourceKind::Payroll],
            ScreenKind::PayrollDetails(_) => &[ResourceKind::Payroll, ResourceKind::Employee],
            ScreenKind::EmployeeProfile(_) => PROFILE,
            ScreenKind::AdminDashboard | ScreenKind::EmployeeDashboard => PERSONAL,
        }
    }
}

/// A surfaced failure, shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub surface: Surface,
}

impl Notice {
    fn new(message: impl Into<String>, surface: Surface) -> Self {
        Self {
            message: message.into(),
            surface,
        }
    }
}

pub struct Screen {
    kind: ScreenKind,
    session: Session,
    gateways: Gateways,
    recent_days: i64,
    store: CollectionStore,
    params: ViewParams,
    gate: ConfirmationGate,
    coordinator: MutationCoordinator,
    notice: Option<Notice>,
}

impl Screen {
    /// Mounts an empty screen; nothing is fetched until [`Screen::load`].
    pub fn mount(kind: ScreenKind, session: Session, gateways: Gateways, recent_days: i64) -> Self {
        debug!(?kind, user = %session.username, "Screen mounted");
        Self {
            kind,
            session,
            gateways,
            recent_days,
            store: CollectionStore::new(),
            params: ViewParams::default(),
            gate: ConfirmationGate::new(),
            coordinator: MutationCoordinator::new(),
            notice: None,
        }
    }

    pub fn kind(&self) -> ScreenKind {
        self.kind
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> &LoadStatus {
        self.store.status()
    }

    pub fn snapshot(&self) -> Option<&Dataset> {
        self.store.snapshot()
    }

    pub fn begin_load(&mut self) -> Result<PendingLoad, GatewayError> {
        let fetchers = self
            .kind
            .collections()
            .iter()
            .map(|kind| self.fetcher_for(*kind))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| self.notice = Some(Notice::new(e.to_string(), e.surface())))?;
        Ok(self.store.begin_load(fetchers))
    }

    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Applied {
        let applied = self.store.finish_load(outcome);
        match &applied {
            Applied::Failed(err) => {
                self.notice = Some(Notice::new(err.to_string(), err.surface()));
            }
            Applied::Replaced => {
                if self.notice.as_ref().is_some_and(|n| n.surface == Surface::Retry) {
                    self.notice = None;
                }
            }
            Applied::Discarded => {}
        }
        applied
    }

    pub async fn load(&mut self) -> Applied {
        match self.begin_load() {
            Ok(pending) => {
                let outcome = pending.run().await;
                self.finish_load(outcome)
            }
            Err(err) => Applied::Failed(err),
        }
    }

    /// Re-runs the whole batch; partial retries are not offered.
    pub async fn retry(&mut self) -> Applied {
        info!(kind = ?self.kind, "Retrying load");
        self.load().await
    }

    /// Aborts the in-flight load; its result will never be applied.
    pub fn unmount(mut self) {
        self.store.cancel();
        debug!(kind = ?self.kind, "Screen unmounted");
    }

    fn fetcher_for(&self, kind: ResourceKind) -> Result<Fetcher, GatewayError> {
        let session = self.session.clone();
        let manager = session.role.is_manager();

        let built = match (kind, self.kind) {
            (ResourceKind::Employee, ScreenKind::EmployeeProfile(id)) => {
                fetch_one(self.gateways.employees.clone(), session, id)
            }
            (ResourceKind::Employee, ScreenKind::EmployeeDashboard) => {
                let id = session.require_employee()?;
                fetch_one(self.gateways.employees.clone(), session, id)
            }
            (ResourceKind::Employee, ScreenKind::PayrollDetails(payroll_id)) => {
                let payrolls = self.gateways.payrolls.clone();
                let employees = self.gateways.employees.clone();
                fetcher(move || async move {
                    let payroll = payrolls.get_by_id(&session, payroll_id).await?;
                    let employee = employees.get_by_id(&session, payroll.employee_id).await?;
                    Ok(Collection::Employees(vec![employee]))
                })
            }
            (ResourceKind::Employee, _) => fetch_all(self.gateways.employees.clone(), session),
            (ResourceKind::Department, _) => fetch_all(self.gateways.departments.clone(), session),
            (ResourceKind::JobRole, _) => fetch_all(self.gateways.job_roles.clone(), session),

            (ResourceKind::LeaveRequest, ScreenKind::LeaveApproval | ScreenKind::AdminDashboard) => {
                let leaves = self.gateways.leaves.clone();
                fetcher(move || async move {
                    leaves
                        .list_pending(&session)
                        .await
                        .map(Collection::LeaveRequests)
                })
            }
            (ResourceKind::LeaveRequest, screen) => {
                let employee_id = match screen {
                    ScreenKind::EmployeeProfile(id) => id,
                    _ => session.require_employee()?,
                };
                let leaves = self.gateways.leaves.clone();
                fetcher(move || async move {
                    leaves
                        .list_by_employee(&session, employee_id)
                        .await
                        .map(Collection::LeaveRequests)
                })
            }

            (ResourceKind::Payroll, ScreenKind::PayrollDetails(id)) => {
                let payrolls = self.gateways.payrolls.clone();
                fetcher(move || async move {
                    payrolls
                        .get_by_id(&session, id)
                        .await
                        .map(|p| Collection::Payrolls(vec![p]))
                })
            }
            (ResourceKind::Payroll, ScreenKind::AdminDashboard) => {
                all_payrolls(self.gateways.payrolls.clone(), session)
            }
            (ResourceKind::Payroll, ScreenKind::PayrollList) if manager => {
                all_payrolls(self.gateways.payrolls.clone(), session)
            }
            (ResourceKind::Payroll, screen) => {
                let employee_id = match screen {
                    ScreenKind::EmployeeProfile(id) => id,
                    _ => session.require_employee()?,
                };
                let payrolls = self.gateways.payrolls.clone();
                fetcher(move || async move {
                    payrolls
                        .list_by_employee(&session, employee_id)
                        .await
                        .map(Collection::Payrolls)
                })
            }
        };
        Ok(built)
    }

    pub fn params(&self) -> &ViewParams {
        &self.params
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.params.search = term.into();
    }

    pub fn set_month(&mut self, month: impl Into<String>) {
        self.params.month = month.into();
    }

    pub fn set_year(&mut self, year: impl Into<String>) {
        self.params.year = year.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.params.status = status.into();
    }

    pub fn clear_filters(&mut self) {
        self.params = ViewParams::default();
    }

    /// Filtered records of one type from the current snapshot.
    pub fn view<R: Collected + Filterable>(&self) -> DerivedView<R> {
        let mut params = self.params.clone();
        // The approval queue only ever lists requests still awaiting a decision.
        if self.kind == ScreenKind::LeaveApproval && R::KIND == ResourceKind::LeaveRequest {
            params.status = "pending".to_string();
        }
        match self.store.snapshot() {
            Some(dataset) => derive::derive_list(dataset.records::<R>(), &params),
            None => DerivedView {
                records: Vec::new(),
                total: 0,
            },
        }
    }

    pub fn payroll_totals(&self) -> PayrollTotals {
        derive::payroll_totals(&self.view::<Payroll>().records)
    }

    pub fn admin_summary(&self, now: DateTime<Utc>) -> Option<AdminSummary> {
        self.store
            .snapshot()
            .map(|d| derive::admin_summary(d, now, self.recent_days))
    }

    pub fn employee_summary(&self, now: DateTime<Utc>) -> Option<EmployeeSummary> {
        let employee_id = self.session.employee_id?;
        self.store
            .snapshot()
            .map(|d| derive::employee_summary(d, employee_id, now, self.recent_days))
    }

    pub fn employee_profile(&self) -> Option<EmployeeProfile> {
        let ScreenKind::EmployeeProfile(id) = self.kind else {
            return None;
        };
        derive::employee_profile(self.store.snapshot()?, id)
    }

    pub fn payslip(&self) -> Option<(Payroll, Option<Employee>)> {
        let ScreenKind::PayrollDetails(id) = self.kind else {
            return None;
        };
        derive::payslip(self.store.snapshot()?, id)
    }

    /// Opens the confirmation prompt for `operation` on `target`.
    pub fn request(
        &mut self,
        operation: Operation,
        target: Target,
    ) -> Result<PendingAction, MutationError> {
        let checked = self.check_request(operation, target);
        match checked {
            Ok(()) => Ok(self.gate.request(operation, target)),
            Err(err) => {
                warn!(%operation, %target, error = %err, "Action request refused");
                self.notice = Some(Notice::new(err.to_string(), err.surface()));
                Err(err)
            }
        }
    }

    fn check_request(&self, operation: Operation, target: Target) -> Result<(), MutationError> {
        if self.coordinator.is_busy() {
            return Err(MutationError::Busy);
        }
        if !operation.applies_to(target.kind) {
            return Err(MutationError::Unsupported {
                operation,
                kind: target.kind,
            });
        }
        if operation.decision().is_some() {
            self.session.require_employee()?;
        }

        let unknown = MutationError::UnknownTarget {
            kind: target.kind,
            id: target.id,
        };
        let dataset = self.store.snapshot().ok_or(unknown.clone())?;
        let settled = match target.kind {
            ResourceKind::Employee => dataset.find::<Employee>(target.id).map(|_| false),
            ResourceKind::Department => dataset.find::<Department>(target.id).map(|_| false),
            ResourceKind::JobRole => dataset.find::<JobRole>(target.id).map(|_| false),
            ResourceKind::LeaveRequest => dataset
                .find::<LeaveRequest>(target.id)
                .map(|l| !l.is_pending()),
            ResourceKind::Payroll => dataset.find::<Payroll>(target.id).map(|p| !p.is_pending()),
        }
        .ok_or(unknown)?;

        if settled {
            return Err(MutationError::Gateway(GatewayError::Conflict(format!(
                "{target} is no longer pending"
            ))));
        }
        Ok(())
    }

    pub fn cancel_action(&mut self) -> Option<PendingAction> {
        self.gate.cancel()
    }

    /// The action awaiting confirmation or currently executing.
    pub fn pending_action(&self) -> Option<(PendingAction, ActionPhase)> {
        if let Some(action) = self.coordinator.executing() {
            return Some((action.clone(), ActionPhase::Executing));
        }
        self.gate
            .awaiting()
            .map(|action| (action.clone(), ActionPhase::AwaitingConfirmation))
    }

    /// Confirms the awaited action and dispatches it.
    pub fn confirm(&mut self) -> Result<InFlightMutation, MutationError> {
        let dispatched = self.dispatch();
        if let Err(err) = &dispatched {
            self.notice = Some(Notice::new(err.to_string(), err.surface()));
        }
        dispatched
    }

    fn dispatch(&mut self) -> Result<InFlightMutation, MutationError> {
        let confirmed = self.gate.confirm()?;
        let refetch = self.fetcher_for(confirmed.action().target.kind)?;
        self.coordinator
            .begin(confirmed, &self.gateways, &self.session, refetch)
    }

    /// Applies a finished mutation to the snapshot.
    pub fn complete(&mut self, finished: MutationResult) -> Result<Reconciliation, MutationError> {
        let target = finished.action.target;
        let operation = finished.action.operation;
        let result = self.coordinator.finish(finished, &mut self.store);

        match &result {
            Ok(Reconciliation::Stale(err)) => {
                self.notice = Some(Notice::new(
                    format!("{operation} {target} succeeded but the list could not be refreshed: {err}"),
                    Surface::Retry,
                ));
            }
            Ok(_) => {}
            Err(err) => {
                self.notice = Some(Notice::new(err.to_string(), err.surface()));
            }
        }
        result
    }

    pub async fn confirm_and_run(&mut self) -> Result<Reconciliation, MutationError> {
        let in_flight = self.confirm()?;
        let finished = in_flight.run().await;
        self.complete(finished)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

fn fetch_all<R: Collected>(
    gateway: std::sync::Arc<dyn ResourceGateway<R>>,
    session: Session,
) -> Fetcher {
    fetcher(move || async move { gateway.list(&session).await.map(R::wrap) })
}

fn all_payrolls(
    payrolls: std::sync::Arc<dyn PayrollGateway>,
    session: Session,
) -> Fetcher {
    fetcher(move || async move { payrolls.list(&session).await.map(Collection::Payrolls) })
}

fn fetch_one<R: Collected>(
    gateway: std::sync::Arc<dyn ResourceGateway<R>>,
    session: Session,
    id: u64,
) -> Fetcher {
    fetcher(move || async move {
        gateway
            .get_by_id(&session, id)
            .await
            .map(|record| R::wrap(vec![record]))
    })
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
