use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::model::{
    Department, Employee, JobRole, LeaveRequest, LeaveStatus, LeaveType, Payroll, PayrollStatus,
    Role, payroll::net_salary,
};
use crate::session::Session;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub fn admin() -> Session {
    Session::new(1, "admin", Role::Admin, Some(1), "admin-token")
}

pub fn staff(employee_id: u64) -> Session {
    Session::new(100 + employee_id, "staff", Role::Employee, Some(employee_id), "staff-token")
}

pub fn department(id: u64, name: &str, description: Option<&str>) -> Department {
    Department {
        id,
        name: name.to_string(),
        description: description.map(str::to_string),
    }
}

pub fn job_role(id: u64, title: &str, base_salary: f64) -> JobRole {
    JobRole {
        id,
        title: title.to_string(),
        base_salary,
        description: None,
    }
}

pub fn employee(id: u64, first_name: &str, last_name: &str, department_id: Option<u64>) -> Employee {
    Employee {
        id,
        user_id: None,
        employee_code: Some(format!("EMP{id:03}")),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: Some(format!("{}@corp.example", first_name.to_lowercase())),
        phone: None,
        address: None,
        date_of_birth: None,
        department_id,
        job_role_id: None,
        hire_date: date(2021, 3, 1),
        leave_balance: 12,
        status: Some("active".to_string()),
    }
}

pub fn leave(id: u64, employee_id: u64, status: LeaveStatus) -> LeaveRequest {
    LeaveRequest {
        id,
        employee_id,
        start_date: date(2024, 5, id as u32 % 28 + 1),
        end_date: date(2024, 5, id as u32 % 28 + 1),
        leave_type: LeaveType::Annual,
        reason: Some("family visit".to_string()),
        status,
        applied_date: Some(date(2024, 4, 20)),
        approved_by: None,
    }
}

pub fn payroll(
    id: u64,
    employee_id: u64,
    month: u32,
    year: i32,
    (base, allowances, deductions): (f64, f64, f64),
    status: PayrollStatus,
) -> Payroll {
    Payroll {
        id,
        employee_id,
        month,
        year,
        base_salary: base,
        allowances,
        deductions,
        net_salary: net_salary(base, allowances, deductions),
        status,
        generated_date: at(year, month, 25),
        processed_date: None,
    }
}
