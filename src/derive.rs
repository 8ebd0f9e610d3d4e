//! Derivation Engine: pure projections of a snapshot under the screen's
//! current view parameters. Nothing here touches the network or mutates
//! its input; every screen re-runs these on each snapshot or filter change.

use chrono::{DateTime, TimeDelta, Utc};

use crate::model::{
    Department, Employee, JobRole, LeaveRequest, LeaveStatus, Payroll, PayrollStatus,
};
use crate::store::Dataset;

/// Filter values as entered on the screen. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewParams {
    pub search: String,
    pub month: String,
    pub year: String,
    pub status: String,
}

impl ViewParams {
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = month.into();
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = year.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a record exposes itself to the list filters.
pub trait Filterable {
    /// Fields searched by the free-text term.
    fn search_fields(&self) -> Vec<&str> {
        Vec::new()
    }

    /// `(month, year)` the record belongs to.
    fn period(&self) -> Option<(u32, i32)> {
        None
    }

    fn status_label(&self) -> Option<&str> {
        None
    }
}

impl Filterable for Department {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }
}

impl Filterable for JobRole {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }
}

impl Filterable for Employee {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.first_name.as_str(), self.last_name.as_str()];
        fields.extend(self.email.as_deref());
        fields.extend(self.employee_code.as_deref());
        fields
    }

    fn status_label(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

impl Filterable for LeaveRequest {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.leave_type.as_ref()];
        fields.extend(self.reason.as_deref());
        fields
    }

    fn status_label(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

impl Filterable for Payroll {
    fn period(&self) -> Option<(u32, i32)> {
        Some((self.month, self.year))
    }

    fn status_label(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

/// A parsed numeric selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberFilter {
    Any,
    Exactly(i64),
    /// Entered but not a number; equality can never hold.
    Unmatchable,
}

impl NumberFilter {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return NumberFilter::Any;
        }
        match raw.parse::<i64>() {
            Ok(n) => NumberFilter::Exactly(n),
            Err(_) => NumberFilter::Unmatchable,
        }
    }

    fn accepts(self, value: Option<i64>) -> bool {
        match self {
            NumberFilter::Any => true,
            NumberFilter::Exactly(n) => value == Some(n),
            NumberFilter::Unmatchable => false,
        }
    }
}

/// Filtered records plus the size of the unfiltered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<R> {
    pub records: Vec<R>,
    pub total: usize,
}

impl<R> DerivedView<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when filters hid some records.
    pub fn is_narrowed(&self) -> bool {
        self.records.len() < self.total
    }
}

pub fn matches<R: Filterable>(record: &R, params: &ViewParams) -> bool {
    let term = params.search.trim().to_lowercase();
    if !term.is_empty()
        && !record
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    {
        return false;
    }

    let period = record.period();
    if !NumberFilter::parse(&params.month).accepts(period.map(|(m, _)| i64::from(m))) {
        return false;
    }
    if !NumberFilter::parse(&params.year).accepts(period.map(|(_, y)| i64::from(y))) {
        return false;
    }

    let status = params.status.trim();
    if !status.is_empty()
        && !record
            .status_label()
            .is_some_and(|label| label.eq_ignore_ascii_case(status))
    {
        return false;
    }

    true
}

pub fn derive_list<R: Filterable + Clone>(records: &[R], params: &ViewParams) -> DerivedView<R> {
    DerivedView {
        records: records
            .iter()
            .filter(|r| matches(*r, params))
            .cloned()
            .collect(),
        total: records.len(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayrollTotals {
    pub count: usize,
    pub base_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_salary: f64,
}

pub fn payroll_totals(payrolls: &[Payroll]) -> PayrollTotals {
    payrolls
        .iter()
        .fold(PayrollTotals::default(), |mut totals, p| {
            totals.count += 1;
            totals.base_salary += p.base_salary;
            totals.allowances += p.allowances;
            totals.deductions += p.deductions;
            totals.net_salary += p.net_salary;
            totals
        })
}

/// Payrolls generated strictly after `now - days`. A window reaching past
/// the representable range counts every payroll.
pub fn recent_payroll_count(payrolls: &[Payroll], now: DateTime<Utc>, days: i64) -> usize {
    let cutoff = TimeDelta::try_days(days).and_then(|window| now.checked_sub_signed(window));
    payrolls
        .iter()
        .filter(|p| cutoff.is_none_or(|cutoff| p.generated_date > cutoff))
        .count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminSummary {
    pub total_employees: usize,
    pub pending_leaves: usize,
    pub recent_payrolls: usize,
    pub pending_payrolls: usize,
    /// Employees with leave days remaining.
    pub active_employees: usize,
}

pub fn admin_summary(dataset: &Dataset, now: DateTime<Utc>, recent_days: i64) -> AdminSummary {
    AdminSummary {
        total_employees: dataset.employees.len(),
        pending_leaves: dataset
            .leave_requests
            .iter()
            .filter(|l| l.status == LeaveStatus::Pending)
            .count(),
        recent_payrolls: recent_payroll_count(&dataset.payrolls, now, recent_days),
        pending_payrolls: dataset
            .payrolls
            .iter()
            .filter(|p| p.status == PayrollStatus::Pending)
            .count(),
        active_employees: dataset
            .employees
            .iter()
            .filter(|e| e.leave_balance > 0)
            .count(),
    }
}

const DASHBOARD_RECENT_ITEMS: usize = 3;
const PROFILE_RECENT_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeSummary {
    pub employee: Option<Employee>,
    pub leave_balance: u32,
    pub pending_leaves: usize,
    pub recent_payrolls: usize,
    pub leaves_taken: usize,
    pub recent_leaves: Vec<LeaveRequest>,
    pub recent_payslips: Vec<Payroll>,
}

pub fn employee_summary(
    dataset: &Dataset,
    employee_id: u64,
    now: DateTime<Utc>,
    recent_days: i64,
) -> EmployeeSummary {
    let employee = dataset
        .employees
        .iter()
        .find(|e| e.id == employee_id)
        .cloned();
    let leaves: Vec<&LeaveRequest> = dataset
        .leave_requests
        .iter()
        .filter(|l| l.employee_id == employee_id)
        .collect();
    let payrolls: Vec<Payroll> = dataset
        .payrolls
        .iter()
        .filter(|p| p.employee_id == employee_id)
        .cloned()
        .collect();

    EmployeeSummary {
        leave_balance: employee.as_ref().map_or(0, |e| e.leave_balance),
        employee,
        pending_leaves: leaves.iter().filter(|l| l.is_pending()).count(),
        recent_payrolls: recent_payroll_count(&payrolls, now, recent_days),
        leaves_taken: leaves
            .iter()
            .filter(|l| l.status == LeaveStatus::Approved)
            .count(),
        recent_leaves: latest_leaves(leaves.into_iter().cloned().collect(), DASHBOARD_RECENT_ITEMS),
        recent_payslips: latest_payrolls(payrolls, DASHBOARD_RECENT_ITEMS),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeProfile {
    pub employee: Employee,
    pub department: Option<Department>,
    pub job_role: Option<JobRole>,
    pub recent_leaves: Vec<LeaveRequest>,
    pub recent_payrolls: Vec<Payroll>,
}

pub fn employee_profile(dataset: &Dataset, employee_id: u64) -> Option<EmployeeProfile> {
    let employee = dataset.employees.iter().find(|e| e.id == employee_id)?.clone();
    let leaves = dataset
        .leave_requests
        .iter()
        .filter(|l| l.employee_id == employee_id)
        .cloned()
        .collect();
    let payrolls = dataset
        .payrolls
        .iter()
        .filter(|p| p.employee_id == employee_id)
        .cloned()
        .collect();

    Some(EmployeeProfile {
        department: employee
            .department_id
            .and_then(|id| dataset.departments.iter().find(|d| d.id == id).cloned()),
        job_role: employee
            .job_role_id
            .and_then(|id| dataset.job_roles.iter().find(|j| j.id == id).cloned()),
        employee,
        recent_leaves: latest_leaves(leaves, PROFILE_RECENT_ITEMS),
        recent_payrolls: latest_payrolls(payrolls, PROFILE_RECENT_ITEMS),
    })
}

/// Payslip view: the payroll with the employee it was generated for.
pub fn payslip(dataset: &Dataset, payroll_id: u64) -> Option<(Payroll, Option<Employee>)> {
    let payroll = dataset.payrolls.iter().find(|p| p.id == payroll_id)?.clone();
    let employee = dataset
        .employees
        .iter()
        .find(|e| e.id == payroll.employee_id)
        .cloned();
    Some((payroll, employee))
}

pub fn department_name(dataset: &Dataset, id: Option<u64>) -> Option<&str> {
    let id = id?;
    dataset
        .departments
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name.as_str())
}

pub fn job_title(dataset: &Dataset, id: Option<u64>) -> Option<&str> {
    let id = id?;
    dataset
        .job_roles
        .iter()
        .find(|j| j.id == id)
        .map(|j| j.title.as_str())
}

fn latest_leaves(mut leaves: Vec<LeaveRequest>, limit: usize) -> Vec<LeaveRequest> {
    leaves.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
    leaves.truncate(limit);
    leaves
}

fn latest_payrolls(mut payrolls: Vec<Payroll>, limit: usize) -> Vec<Payroll> {
    payrolls.sort_by(|a, b| {
        (b.year, b.month, b.id).cmp(&(a.year, a.month, a.id))
    });
    payrolls.truncate(limit);
    payrolls
}

#[cfg(test)]
#[path = "tests/derive_tests.rs"]
mod tests;
