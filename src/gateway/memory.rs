//! In-process gateway backed by plain vectors.
//!
//! Mirrors the remote service's observable behaviour closely enough to
//! drive whole screens: transitions refuse records that already left the
//! pending state, deletes of unknown ids fail, and every call is counted.
//! Faults can be queued per operation to exercise failure paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{LeaveGateway, PayrollGateway, ResourceGateway};
use crate::error::{FieldError, GatewayError};
use crate::model::{
    Department, DepartmentPayload, Employee, EmployeePayload, JobRole, JobRolePayload,
    LeaveDecision, LeaveRequest, LeaveRequestPayload, LeaveStatus, Payroll, PayrollPayload,
    PayrollStatus, Record, ResourceKind,
};
use crate::session::Session;

/// Gateway operations that can be counted and failed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
    Transition,
}

#[derive(Default)]
pub struct Tables {
    pub employees: Vec<Employee>,
    pub departments: Vec<Department>,
    pub job_roles: Vec<JobRole>,
    pub leaves: Vec<LeaveRequest>,
    pub payrolls: Vec<Payroll>,
}

#[derive(Default)]
struct State {
    tables: Tables,
    next_id: u64,
    calls: HashMap<(ResourceKind, Op), usize>,
    faults: HashMap<(ResourceKind, Op), Vec<GatewayError>>,
    acknowledge_only: bool,
}

impl State {
    /// Counts the call and pops a queued fault for it, if any.
    fn enter(&mut self, kind: ResourceKind, op: Op) -> Result<(), GatewayError> {
        *self.calls.entry((kind, op)).or_default() += 1;
        debug!(%kind, ?op, "In-memory gateway call");
        match self.faults.get_mut(&(kind, op)) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Records the in-memory gateway knows how to store and build.
pub trait Stored: Record {
    fn table(tables: &mut Tables) -> &mut Vec<Self>;

    fn build(id: u64, payload: &Self::Payload, now: DateTime<Utc>) -> Self;

    /// Server-side shape checks, reported as field errors.
    fn check(_payload: &Self::Payload) -> Vec<FieldError> {
        Vec::new()
    }
}

impl Stored for Employee {
    fn table(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.employees
    }

    fn build(id: u64, p: &EmployeePayload, _now: DateTime<Utc>) -> Self {
        Employee {
            id,
            user_id: p.user_id,
            employee_code: p.employee_code.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            address: p.address.clone(),
            date_of_birth: p.date_of_birth,
            department_id: p.department_id,
            job_role_id: p.job_role_id,
            hire_date: p.hire_date,
            leave_balance: p.leave_balance,
            status: Some("active".to_string()),
        }
    }

    fn check(p: &EmployeePayload) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if p.first_name.trim().is_empty() {
            errors.push(FieldError::new("first_name", "must not be blank"));
        }
        if p.last_name.trim().is_empty() {
            errors.push(FieldError::new("last_name", "must not be blank"));
        }
        errors
    }
}

impl Stored for Department {
    fn table(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.departments
    }

    fn build(id: u64, p: &DepartmentPayload, _now: DateTime<Utc>) -> Self {
        Department {
            id,
            name: p.name.clone(),
            description: p.description.clone(),
        }
    }

    fn check(p: &DepartmentPayload) -> Vec<FieldError> {
        if p.name.trim().is_empty() {
            vec![FieldError::new("name", "must not be blank")]
        } else {
            Vec::new()
        }
    }
}

impl Stored for JobRole {
    fn table(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.job_roles
    }

    fn build(id: u64, p: &JobRolePayload, _now: DateTime<Utc>) -> Self {
        JobRole {
            id,
            title: p.title.clone(),
            base_salary: p.base_salary,
            description: p.description.clone(),
        }
    }

    fn check(p: &JobRolePayload) -> Vec<FieldError> {
        if p.base_salary <= 0.0 {
            vec![FieldError::new("base_salary", "must be greater than 0")]
        } else {
            Vec::new()
        }
    }
}

impl Stored for LeaveRequest {
    fn table(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.leaves
    }

    fn build(id: u64, p: &LeaveRequestPayload, now: DateTime<Utc>) -> Self {
        LeaveRequest {
            id,
            employee_id: p.employee_id,
            start_date: p.start_date,
            end_date: p.end_date,
            leave_type: p.leave_type,
            reason: p.reason.clone(),
            status: LeaveStatus::Pending,
            applied_date: Some(now.date_naive()),
            approved_by: None,
        }
    }

    fn check(p: &LeaveRequestPayload) -> Vec<FieldError> {
        if p.start_date > p.end_date {
            vec![FieldError::new("start_date", "cannot be after end_date")]
        } else {
            Vec::new()
        }
    }
}

impl Stored for Payroll {
    fn table(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.payrolls
    }

    fn build(id: u64, p: &PayrollPayload, now: DateTime<Utc>) -> Self {
        Payroll {
            id,
            employee_id: p.employee_id,
            month: p.month,
            year: p.year,
            base_salary: p.base_salary,
            allowances: p.allowances,
            deductions: p.deductions,
            net_salary: p.net_salary,
            status: PayrollStatus::Pending,
            generated_date: now,
            processed_date: None,
        }
    }

    fn check(p: &PayrollPayload) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !(1..=12).contains(&p.month) {
            errors.push(FieldError::new("month", "must be between 1 and 12"));
        }
        if p.base_salary <= 0.0 {
            errors.push(FieldError::new("base_salary", "must be greater than 0"));
        }
        errors
    }
}

#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds records; ids are kept as given and later ids continue after them.
    pub fn seed<R: Stored>(&self, records: impl IntoIterator<Item = R>) {
        let mut state = self.lock();
        for record in records {
            state.next_id = state.next_id.max(record.id());
            R::table(&mut state.tables).push(record);
        }
    }

    /// Makes the next call of `op` on `kind` fail with `err`.
    pub fn fail_next(&self, kind: ResourceKind, op: Op, err: GatewayError) {
        self.lock().faults.entry((kind, op)).or_default().push(err);
    }

    /// Transitions succeed but answer without the updated record.
    pub fn acknowledge_transitions_only(&self, enabled: bool) {
        self.lock().acknowledge_only = enabled;
    }

    pub fn calls(&self, kind: ResourceKind, op: Op) -> usize {
        self.lock().calls.get(&(kind, op)).copied().unwrap_or(0)
    }

    /// Copy of the stored records of one type.
    pub fn records<R: Stored>(&self) -> Vec<R> {
        R::table(&mut self.lock().tables).clone()
    }

    /// Overwrites a stored record in place, bypassing every rule.
    pub fn replace<R: Stored>(&self, record: R) {
        let mut state = self.lock();
        if let Some(slot) = R::table(&mut state.tables)
            .iter_mut()
            .find(|r| r.id() == record.id())
        {
            *slot = record;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(kind: ResourceKind, id: u64) -> GatewayError {
        GatewayError::NotFound(format!("{kind} #{id} not found"))
    }
}

#[async_trait]
impl<R: Stored> ResourceGateway<R> for InMemoryGateway {
    async fn list(&self, _session: &Session) -> Result<Vec<R>, GatewayError> {
        let mut state = self.lock();
        state.enter(R::KIND, Op::List)?;
        Ok(R::table(&mut state.tables).clone())
    }

    async fn get_by_id(&self, _session: &Session, id: u64) -> Result<R, GatewayError> {
        let mut state = self.lock();
        state.enter(R::KIND, Op::Get)?;
        R::table(&mut state.tables)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| Self::not_found(R::KIND, id))
    }

    async fn create(&self, _session: &Session, payload: &R::Payload) -> Result<R, GatewayError> {
        let mut state = self.lock();
        state.enter(R::KIND, Op::Create)?;
        let errors = R::check(payload);
        if !errors.is_empty() {
            return Err(GatewayError::Validation(errors));
        }
        let id = state.allocate_id();
        let record = R::build(id, payload, Utc::now());
        R::table(&mut state.tables).push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        _session: &Session,
        id: u64,
        payload: &R::Payload,
    ) -> Result<R, GatewayError> {
        let mut state = self.lock();
        state.enter(R::KIND, Op::Update)?;
        let errors = R::check(payload);
        if !errors.is_empty() {
            return Err(GatewayError::Validation(errors));
        }
        let slot = R::table(&mut state.tables)
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(R::KIND, id))?;
        *slot = R::build(id, payload, Utc::now());
        Ok(slot.clone())
    }

    async fn delete(&self, _session: &Session, id: u64) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.enter(R::KIND, Op::Delete)?;
        let table = R::table(&mut state.tables);
        let before = table.len();
        table.retain(|r| r.id() != id);
        if table.len() == before {
            return Err(Self::not_found(R::KIND, id));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaveGateway for InMemoryGateway {
    async fn list_pending(&self, _session: &Session) -> Result<Vec<LeaveRequest>, GatewayError> {
        let mut state = self.lock();
        state.enter(ResourceKind::LeaveRequest, Op::List)?;
        Ok(state
            .tables
            .leaves
            .iter()
            .filter(|l| l.is_pending())
            .cloned()
            .collect())
    }

    async fn list_by_employee(
        &self,
        _session: &Session,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, GatewayError> {
        let mut state = self.lock();
        state.enter(ResourceKind::LeaveRequest, Op::List)?;
        Ok(state
            .tables
            .leaves
            .iter()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn update_leave_status(
        &self,
        _session: &Session,
        id: u64,
        decision: LeaveDecision,
        approver_id: u64,
    ) -> Result<Option<LeaveRequest>, GatewayError> {
        let mut state = self.lock();
        state.enter(ResourceKind::LeaveRequest, Op::Transition)?;
        let acknowledge_only = state.acknowledge_only;
        let leave = state
            .tables
            .leaves
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| Self::not_found(ResourceKind::LeaveRequest, id))?;

        if !leave.is_pending() {
            return Err(GatewayError::Conflict(format!(
                "Leave request {id} is already {}",
                leave.status
            )));
        }

        leave.status = decision.resulting_status();
        leave.approved_by = Some(approver_id);
        Ok((!acknowledge_only).then(|| leave.clone()))
    }
}

#[async_trait]
impl PayrollGateway for InMemoryGateway {
    async fn list_by_employee(
        &self,
        _session: &Session,
        employee_id: u64,
    ) -> Result<Vec<Payroll>, GatewayError> {
        let mut state = self.lock();
        state.enter(ResourceKind::Payroll, Op::List)?;
        Ok(state
            .tables
            .payrolls
            .iter()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn process_payroll(
        &self,
        _session: &Session,
        id: u64,
    ) -> Result<Option<Payroll>, GatewayError> {
        let mut state = self.lock();
        state.enter(ResourceKind::Payroll, Op::Transition)?;
        let acknowledge_only = state.acknowledge_only;
        let payroll = state
            .tables
            .payrolls
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found(ResourceKind::Payroll, id))?;

        if !payroll.is_pending() {
            return Err(GatewayError::Conflict(format!(
                "Payroll {id} is already processed"
            )));
        }

        payroll.status = PayrollStatus::Processed;
        payroll.processed_date = Some(Utc::now());
        Ok((!acknowledge_only).then(|| payroll.clone()))
    }
}
