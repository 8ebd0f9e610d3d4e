use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Record, ResourceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,

    /// Login account linked to this employee, if any.
    #[serde(default)]
    pub user_id: Option<u64>,

    #[serde(default)]
    pub employee_code: Option<String>,

    pub first_name: String,

    pub last_name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default)]
    pub department_id: Option<u64>,

    #[serde(default)]
    pub job_role_id: Option<u64>,

    pub hire_date: NaiveDate,

    /// Remaining leave days.
    #[serde(default)]
    pub leave_balance: u32,

    #[serde(default)]
    pub status: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePayload {
    pub user_id: Option<u64>,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub department_id: Option<u64>,
    pub job_role_id: Option<u64>,
    pub hire_date: NaiveDate,
    pub leave_balance: u32,
}

impl Record for Employee {
    type Payload = EmployeePayload;
    const KIND: ResourceKind = ResourceKind::Employee;

    fn id(&self) -> u64 {
        self.id
    }
}
