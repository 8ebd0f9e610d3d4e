use super::*;

use std::sync::Arc;

use crate::error::{GatewayError, Surface};
use crate::fixtures::*;
use crate::gateway::memory::Op;
use crate::gateway::{Gateways, InMemoryGateway};
use crate::model::ResourceKind;

fn fields(errors: &[FieldError]) -> Vec<&str> {
    errors.iter().map(|e| e.field.as_str()).collect()
}

fn payroll_form(base: &str, allowances: &str, deductions: &str) -> PayrollForm {
    let mut form = PayrollForm::new(4, 2024);
    form.employee_id = Some(1);
    form.base_salary = base.to_string();
    form.allowances = allowances.to_string();
    form.deductions = deductions.to_string();
    form
}

#[test]
fn payroll_payload_carries_computed_net_salary() {
    let payload = payroll_form("1000", "200", "50")
        .validate(FormMode::Create)
        .expect("valid");
    assert_eq!(payload.net_salary, 1150.0);
    assert_eq!(payload.employee_id, 1);
}

#[test]
fn payroll_rejects_missing_employee_and_bad_amounts() {
    let mut form = payroll_form("0", "-5", "abc");
    form.employee_id = None;
    form.month = 13;

    let errors = form.validate(FormMode::Create).expect_err("invalid");
    assert_eq!(
        fields(&errors),
        vec!["employee_id", "month", "base_salary", "deductions", "allowances"]
    );
}

#[test]
fn blank_allowances_and_deductions_count_as_zero() {
    let payload = payroll_form("1000", "", " ")
        .validate(FormMode::Create)
        .expect("valid");
    assert_eq!(payload.allowances, 0.0);
    assert_eq!(payload.deductions, 0.0);
    assert_eq!(payload.net_salary, 1000.0);
}

#[test]
fn net_salary_preview_ignores_unparsable_input() {
    let form = payroll_form("1000", "oops", "100");
    assert_eq!(form.net_salary_preview(), 900.0);
}

#[test]
fn selecting_employee_prefills_role_salary() {
    let mut form = PayrollForm::new(4, 2024);
    form.select_employee(&employee(7, "Ada", "Lovelace", None), Some(&job_role(3, "Engineer", 4200.0)));
    assert_eq!(form.employee_id, Some(7));
    assert_eq!(form.base_salary, "4200");
}

#[test]
fn job_role_requires_title_and_positive_salary() {
    let form = JobRoleForm {
        title: "  ".into(),
        base_salary: "".into(),
        description: "".into(),
    };
    let errors = form.validate(FormMode::Create).expect_err("invalid");
    assert_eq!(fields(&errors), vec!["title", "base_salary"]);
}

#[test]
fn department_trims_and_drops_blank_description() {
    let form = DepartmentForm {
        name: "  Finance ".into(),
        description: "   ".into(),
    };
    let payload = form.validate(FormMode::Create).expect("valid");
    assert_eq!(payload.name, "Finance");
    assert_eq!(payload.description, None);
}

#[test]
fn employee_needs_user_id_only_on_create() {
    let form = EmployeeForm {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        hire_date: Some(date(2022, 1, 10)),
        ..EmployeeForm::default()
    };

    let errors = form.validate(FormMode::Create).expect_err("user id");
    assert_eq!(fields(&errors), vec!["user_id"]);
    assert!(form.validate(FormMode::Edit(4)).is_ok());
}

#[test]
fn employee_phone_must_have_ten_digits() {
    let mut form = EmployeeForm::from_record(&employee(1, "Ada", "Lovelace", None));
    form.phone = "555-123".into();
    let errors = form.validate(FormMode::Edit(1)).expect_err("phone");
    assert_eq!(fields(&errors), vec!["phone"]);

    form.phone = "555-123-4567".into();
    assert!(form.validate(FormMode::Edit(1)).is_ok());
}

#[test]
fn leave_dates_must_be_ordered() {
    let mut form = LeaveForm::new(1);
    form.start_date = Some(date(2024, 6, 10));
    form.end_date = Some(date(2024, 6, 3));

    let errors = form.validate(FormMode::Create).expect_err("order");
    assert_eq!(fields(&errors), vec!["start_date"]);
}

#[tokio::test]
async fn submit_creates_payroll_with_identity_intact() {
    let backend = Arc::new(InMemoryGateway::new());
    let gateways = Gateways::from_backend(backend.clone());

    let saved = submit(
        &payroll_form("1000", "200", "50"),
        FormMode::Create,
        &*gateways.payrolls,
        &admin(),
    )
    .await
    .expect("saved");

    assert_eq!(saved.net_salary, 1150.0);
    assert!(saved.net_salary_holds());
    assert_eq!(backend.records::<Payroll>().len(), 1);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_gateway() {
    let backend = Arc::new(InMemoryGateway::new());
    let gateways = Gateways::from_backend(backend.clone());

    let err = submit(
        &DepartmentForm::default(),
        FormMode::Create,
        &*gateways.departments,
        &admin(),
    )
    .await
    .expect_err("invalid");

    assert_eq!(err.surface(), Surface::Fields);
    assert_eq!(fields(err.field_errors()), vec!["name"]);
    assert_eq!(backend.calls(ResourceKind::Department, Op::Create), 0);
}

#[tokio::test]
async fn remote_field_errors_merge_into_the_form() {
    let backend = Arc::new(InMemoryGateway::new());
    backend.fail_next(
        ResourceKind::JobRole,
        Op::Create,
        GatewayError::Validation(vec![FieldError::new("title", "already exists")]),
    );
    let gateways = Gateways::from_backend(backend.clone());
    let form = JobRoleForm {
        title: "Engineer".into(),
        base_salary: "5000".into(),
        description: "".into(),
    };

    let err = submit(&form, FormMode::Create, &*gateways.job_roles, &admin())
        .await
        .expect_err("duplicate");

    assert_eq!(err, FormError::Invalid(vec![FieldError::new("title", "already exists")]));
}

#[tokio::test]
async fn edit_updates_existing_record() {
    let backend = Arc::new(InMemoryGateway::new());
    backend.seed(vec![department(1, "Engineering", None)]);
    let gateways = Gateways::from_backend(backend.clone());
    let form = DepartmentForm {
        name: "Platform Engineering".into(),
        description: "".into(),
    };

    let saved = submit(&form, FormMode::Edit(1), &*gateways.departments, &admin())
        .await
        .expect("saved");

    assert_eq!(saved, department(1, "Platform Engineering", None));
    assert_eq!(backend.records::<Department>(), vec![saved]);
}

#[tokio::test]
async fn editing_missing_record_surfaces_inline() {
    let backend = Arc::new(InMemoryGateway::new());
    let gateways = Gateways::from_backend(backend);
    let form = DepartmentForm {
        name: "Legal".into(),
        description: "".into(),
    };

    let err = submit(&form, FormMode::Edit(9), &*gateways.departments, &admin())
        .await
        .expect_err("missing");

    assert!(matches!(err, FormError::Gateway(GatewayError::NotFound(_))));
    assert_eq!(err.surface(), Surface::Inline);
}
