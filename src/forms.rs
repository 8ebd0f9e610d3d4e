//! Create/edit forms. Each form holds raw user input, validates it locally
//! into a typed payload and only then calls the gateway. Field errors from
//! either side come back as one list so the form can stay on screen.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{FieldError, FormError};
use crate::gateway::ResourceGateway;
use crate::model::{
    Department, DepartmentPayload, Employee, EmployeePayload, JobRole, JobRolePayload,
    LeaveRequest, LeaveRequestPayload, LeaveType, Payroll, PayrollPayload, Record,
    payroll::net_salary,
};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(u64),
}

pub trait Form {
    type Record: Record;

    fn validate(&self, mode: FormMode) -> Result<<Self::Record as Record>::Payload, Vec<FieldError>>;

    /// Check applied to the record the service saved.
    fn accept(record: Self::Record) -> Result<Self::Record, FormError> {
        Ok(record)
    }
}

/// Validates `form` and saves it through `gateway`.
pub async fn submit<F, G>(
    form: &F,
    mode: FormMode,
    gateway: &G,
    session: &Session,
) -> Result<F::Record, FormError>
where
    F: Form,
    G: ResourceGateway<F::Record> + ?Sized,
{
    let payload = form.validate(mode).map_err(FormError::Invalid)?;
    let kind = <F::Record as Record>::KIND;

    let saved = match mode {
        FormMode::Create => gateway.create(session, &payload).await,
        FormMode::Edit(id) => gateway.update(session, id, &payload).await,
    }
    .map_err(|e| {
        warn!(%kind, ?mode, error = %e, "Form submission rejected");
        FormError::from(e)
    })?;

    info!(%kind, id = saved.id(), ?mode, "Form saved");
    F::accept(saved)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Blank is `None`; anything else must parse.
fn amount(field: &str, raw: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}

fn finish<P>(payload: P, errors: Vec<FieldError>) -> Result<P, Vec<FieldError>> {
    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(errors)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepartmentForm {
    pub name: String,
    pub description: String,
}

impl Form for DepartmentForm {
    type Record = Department;

    fn validate(&self, _mode: FormMode) -> Result<DepartmentPayload, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = non_blank(&self.name).unwrap_or_default();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Department name is required"));
        }
        finish(
            DepartmentPayload {
                name,
                description: non_blank(&self.description),
            },
            errors,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobRoleForm {
    pub title: String,
    pub base_salary: String,
    pub description: String,
}

impl Form for JobRoleForm {
    type Record = JobRole;

    fn validate(&self, _mode: FormMode) -> Result<JobRolePayload, Vec<FieldError>> {
        let mut errors = Vec::new();
        let title = non_blank(&self.title).unwrap_or_default();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Job title is required"));
        }
        let base_salary = amount("base_salary", &self.base_salary, &mut errors).unwrap_or(0.0);
        if base_salary <= 0.0 && !errors.iter().any(|e| e.field == "base_salary") {
            errors.push(FieldError::new("base_salary", "Base salary must be greater than 0"));
        }
        finish(
            JobRolePayload {
                title,
                base_salary,
                description: non_blank(&self.description),
            },
            errors,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayrollForm {
    pub employee_id: Option<u64>,
    pub month: u32,
    pub year: i32,
    pub base_salary: String,
    pub allowances: String,
    pub deductions: String,
}

impl PayrollForm {
    pub fn new(month: u32, year: i32) -> Self {
        Self {
            employee_id: None,
            month,
            year,
            base_salary: String::new(),
            allowances: String::new(),
            deductions: String::new(),
        }
    }

    /// Selects the employee and pre-fills the base salary from their role.
    pub fn select_employee(&mut self, employee: &Employee, role: Option<&JobRole>) {
        self.employee_id = Some(employee.id);
        self.base_salary = role.map(|r| r.base_salary.to_string()).unwrap_or_default();
    }

    /// Live preview; unparsable amounts count as zero.
    pub fn net_salary_preview(&self) -> f64 {
        let parse = |raw: &str| raw.trim().parse::<f64>().unwrap_or(0.0);
        net_salary(
            parse(&self.base_salary),
            parse(&self.allowances),
            parse(&self.deductions),
        )
    }
}

impl Form for PayrollForm {
    type Record = Payroll;

    fn validate(&self, _mode: FormMode) -> Result<PayrollPayload, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.employee_id.is_none() {
            errors.push(FieldError::new("employee_id", "Please select an employee"));
        }
        if !(1..=12).contains(&self.month) {
            errors.push(FieldError::new("month", "Month must be between 1 and 12"));
        }

        let base_salary = amount("base_salary", &self.base_salary, &mut errors);
        if base_salary.is_none_or(|b| b <= 0.0) && !errors.iter().any(|e| e.field == "base_salary")
        {
            errors.push(FieldError::new("base_salary", "Base salary must be greater than 0"));
        }
        let allowances = amount("allowances", &self.allowances, &mut errors).unwrap_or(0.0);
        let deductions = amount("deductions", &self.deductions, &mut errors).unwrap_or(0.0);
        if allowances < 0.0 {
            errors.push(FieldError::new("allowances", "Allowances cannot be negative"));
        }
        if deductions < 0.0 {
            errors.push(FieldError::new("deductions", "Deductions cannot be negative"));
        }

        finish(
            PayrollPayload::new(
                self.employee_id.unwrap_or_default(),
                self.month,
                self.year,
                base_salary.unwrap_or_default(),
                allowances,
                deductions,
            ),
            errors,
        )
    }

    fn accept(record: Payroll) -> Result<Payroll, FormError> {
        if record.net_salary_holds() {
            Ok(record)
        } else {
            Err(FormError::InvalidRecord(format!(
                "payroll #{} was saved with net salary {} instead of {}",
                record.id,
                record.net_salary,
                record.expected_net_salary()
            )))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeForm {
    pub user_id: Option<u64>,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub department_id: Option<u64>,
    pub job_role_id: Option<u64>,
    pub hire_date: Option<NaiveDate>,
    pub leave_balance: u32,
}

impl EmployeeForm {
    /// Pre-fills the form from an existing record for editing.
    pub fn from_record(employee: &Employee) -> Self {
        Self {
            user_id: employee.user_id,
            employee_code: employee.employee_code.clone().unwrap_or_default(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone().unwrap_or_default(),
            phone: employee.phone.clone().unwrap_or_default(),
            address: employee.address.clone().unwrap_or_default(),
            date_of_birth: employee.date_of_birth,
            department_id: employee.department_id,
            job_role_id: employee.job_role_id,
            hire_date: Some(employee.hire_date),
            leave_balance: employee.leave_balance,
        }
    }
}

const PHONE_DIGITS: usize = 10;

impl Form for EmployeeForm {
    type Record = Employee;

    fn validate(&self, mode: FormMode) -> Result<EmployeePayload, Vec<FieldError>> {
        let mut errors = Vec::new();

        let first_name = non_blank(&self.first_name).unwrap_or_default();
        if first_name.is_empty() {
            errors.push(FieldError::new("first_name", "First name is required"));
        }
        let last_name = non_blank(&self.last_name).unwrap_or_default();
        if last_name.is_empty() {
            errors.push(FieldError::new("last_name", "Last name is required"));
        }
        if self.hire_date.is_none() {
            errors.push(FieldError::new("hire_date", "Hire date is required"));
        }

        let phone = non_blank(&self.phone);
        if let Some(phone) = &phone {
            let digits: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
            if digits.len() != PHONE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
                errors.push(FieldError::new("phone", "Please enter a valid phone number"));
            }
        }

        if mode == FormMode::Create && self.user_id.is_none() {
            errors.push(FieldError::new("user_id", "User ID is required"));
        }

        finish(
            EmployeePayload {
                user_id: self.user_id,
                employee_code: non_blank(&self.employee_code),
                first_name,
                last_name,
                email: non_blank(&self.email),
                phone,
                address: non_blank(&self.address),
                date_of_birth: self.date_of_birth,
                department_id: self.department_id,
                job_role_id: self.job_role_id,
                hire_date: self.hire_date.unwrap_or_default(),
                leave_balance: self.leave_balance,
            },
            errors,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveForm {
    pub employee_id: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub leave_type: LeaveType,
    pub reason: String,
}

impl LeaveForm {
    pub fn new(employee_id: u64) -> Self {
        Self {
            employee_id,
            start_date: None,
            end_date: None,
            leave_type: LeaveType::Annual,
            reason: String::new(),
        }
    }
}

impl Form for LeaveForm {
    type Record = LeaveRequest;

    fn validate(&self, _mode: FormMode) -> Result<LeaveRequestPayload, Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.start_date.is_none() {
            errors.push(FieldError::new("start_date", "Start date is required"));
        }
        if self.end_date.is_none() {
            errors.push(FieldError::new("end_date", "End date is required"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                errors.push(FieldError::new("start_date", "start_date cannot be after end_date"));
            }
        }

        finish(
            LeaveRequestPayload {
                employee_id: self.employee_id,
                start_date: self.start_date.unwrap_or_default(),
                end_date: self.end_date.unwrap_or_default(),
                leave_type: self.leave_type,
                reason: non_blank(&self.reason),
            },
            errors,
        )
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
