use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::{Record, ResourceKind};

/// Tolerance used when checking `net = base + allowances - deductions`.
pub const NET_SALARY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PayrollStatus {
    Pending,
    Processed,
}

pub fn net_salary(base_salary: f64, allowances: f64, deductions: f64) -> f64 {
    base_salary + allowances - deductions
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payroll {
    pub id: u64,
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub base_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub status: PayrollStatus,
    pub generated_date: DateTime<Utc>,
    #[serde(default)]
    pub processed_date: Option<DateTime<Utc>>,
}

impl Payroll {
    pub fn expected_net_salary(&self) -> f64 {
        net_salary(self.base_salary, self.allowances, self.deductions)
    }

    pub fn net_salary_holds(&self) -> bool {
        (self.net_salary - self.expected_net_salary()).abs() <= NET_SALARY_TOLERANCE
    }

    pub fn is_pending(&self) -> bool {
        self.status == PayrollStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollPayload {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub base_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_salary: f64,
}

impl PayrollPayload {
    /// Builds a payload with `net_salary` computed from its parts.
    pub fn new(
        employee_id: u64,
        month: u32,
        year: i32,
        base_salary: f64,
        allowances: f64,
        deductions: f64,
    ) -> Self {
        Self {
            employee_id,
            month,
            year,
            base_salary,
            allowances,
            deductions,
            net_salary: net_salary(base_salary, allowances, deductions),
        }
    }
}

impl Record for Payroll {
    type Payload = PayrollPayload;
    const KIND: ResourceKind = ResourceKind::Payroll;

    fn id(&self) -> u64 {
        self.id
    }
}
