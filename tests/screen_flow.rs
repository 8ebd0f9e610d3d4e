use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use hrm_console::forms::{self, FormMode, PayrollForm};
use hrm_console::gateway::memory::Op;
use hrm_console::gateway::{Gateways, InMemoryGateway};
use hrm_console::model::{
    Department, Employee, LeaveRequest, LeaveStatus, LeaveType, Payroll, PayrollStatus,
    ResourceKind, Role,
};
use hrm_console::mutation::{Operation, Reconciliation, Target};
use hrm_console::store::{Applied, LoadStatus};
use hrm_console::{GatewayError, MutationError, Screen, ScreenKind, Session, Surface};

fn hr() -> Session {
    Session::new(2, "hr", Role::Hr, Some(1), "hr-token")
}

fn department(id: u64, name: &str) -> Department {
    Department {
        id,
        name: name.to_string(),
        description: None,
    }
}

fn employee(id: u64, first: &str, department_id: u64) -> Employee {
    Employee {
        id,
        user_id: Some(100 + id),
        employee_code: Some(format!("EMP{id:03}")),
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        email: None,
        phone: None,
        address: None,
        date_of_birth: None,
        department_id: Some(department_id),
        job_role_id: None,
        hire_date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
        leave_balance: 10,
        status: Some("active".to_string()),
    }
}

fn leave(id: u64, employee_id: u64) -> LeaveRequest {
    let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    LeaveRequest {
        id,
        employee_id,
        start_date: day,
        end_date: day,
        leave_type: LeaveType::Annual,
        reason: None,
        status: LeaveStatus::Pending,
        applied_date: None,
        approved_by: None,
    }
}

fn pending_payroll(id: u64, employee_id: u64) -> Payroll {
    Payroll {
        id,
        employee_id,
        month: 6,
        year: 2024,
        base_salary: 3000.0,
        allowances: 0.0,
        deductions: 0.0,
        net_salary: 3000.0,
        status: PayrollStatus::Pending,
        generated_date: Utc.with_ymd_and_hms(2024, 6, 28, 9, 0, 0).unwrap(),
        processed_date: None,
    }
}

fn seeded() -> Arc<InMemoryGateway> {
    let backend = Arc::new(InMemoryGateway::new());
    backend.seed(vec![
        department(1, "Engineering"),
        department(2, "Reverse Engineering"),
        department(3, "Sales"),
    ]);
    backend.seed(vec![employee(1, "Ada", 1), employee(2, "Linus", 3)]);
    backend.seed(vec![leave(10, 1), leave(11, 2)]);
    backend.seed(vec![pending_payroll(20, 1)]);
    backend
}

async fn open(kind: ScreenKind, backend: &Arc<InMemoryGateway>) -> Screen {
    let mut screen = Screen::mount(kind, hr(), Gateways::from_backend(backend.clone()), 30);
    assert_eq!(screen.load().await, Applied::Replaced);
    screen
}

#[tokio::test]
async fn search_narrows_departments_case_insensitively() {
    let backend = seeded();
    let mut screen = open(ScreenKind::DepartmentList, &backend).await;

    screen.set_search("  ENG ");
    let view = screen.view::<Department>();

    assert_eq!(view.records.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(view.total, 3);
}

#[tokio::test]
async fn created_payroll_carries_net_salary() {
    let backend = seeded();
    let gateways = Gateways::from_backend(backend.clone());
    let mut form = PayrollForm::new(7, 2024);
    form.employee_id = Some(2);
    form.base_salary = "1000".into();
    form.allowances = "200".into();
    form.deductions = "50".into();

    let saved = forms::submit(&form, FormMode::Create, &*gateways.payrolls, &hr())
        .await
        .expect("payroll saved");

    assert_eq!(saved.net_salary, 1150.0);
    assert_eq!(saved.status, PayrollStatus::Pending);
}

#[tokio::test]
async fn confirmed_delete_removes_record_without_refetching() {
    let backend = seeded();
    let mut screen = open(ScreenKind::DepartmentList, &backend).await;
    let target = Target::new(ResourceKind::Department, 1);

    screen.request(Operation::Delete, target).expect("prompt opened");
    assert_eq!(backend.calls(ResourceKind::Department, Op::Delete), 0);

    let reconciled = screen.confirm_and_run().await.expect("deleted");

    assert_eq!(reconciled, Reconciliation::Removed);
    assert_eq!(backend.calls(ResourceKind::Department, Op::Delete), 1);
    assert_eq!(backend.calls(ResourceKind::Department, Op::List), 1);
    let remaining = screen.view::<Department>();
    assert_eq!(remaining.records.iter().map(|d| d.id).collect::<Vec<_>>(), vec![2, 3]);
    assert!(screen.pending_action().is_none());
}

#[tokio::test]
async fn cancelled_prompt_never_reaches_the_service() {
    let backend = seeded();
    let mut screen = open(ScreenKind::DepartmentList, &backend).await;

    screen
        .request(Operation::Delete, Target::new(ResourceKind::Department, 3))
        .expect("prompt opened");
    assert!(screen.cancel_action().is_some());

    assert_eq!(screen.confirm_and_run().await, Err(MutationError::NothingToConfirm));
    assert_eq!(backend.calls(ResourceKind::Department, Op::Delete), 0);
    assert_eq!(screen.view::<Department>().len(), 3);
}

#[tokio::test]
async fn conflicting_process_leaves_snapshot_untouched() {
    let backend = seeded();
    let mut screen = open(ScreenKind::PayrollList, &backend).await;
    let before = screen.snapshot().cloned();
    backend.fail_next(
        ResourceKind::Payroll,
        Op::Transition,
        GatewayError::Conflict("payroll #20 was already processed".into()),
    );

    screen
        .request(Operation::Process, Target::new(ResourceKind::Payroll, 20))
        .expect("prompt opened");
    let err = screen.confirm_and_run().await.expect_err("conflict");

    assert!(matches!(err, MutationError::Gateway(GatewayError::Conflict(_))));
    assert_eq!(screen.snapshot().cloned(), before);
    assert!(screen.pending_action().is_none());
    assert_eq!(screen.notice().map(|n| n.surface), Some(Surface::Inline));
}

#[tokio::test]
async fn one_failed_collection_fails_the_whole_load() {
    let backend = seeded();
    let mut screen = open(ScreenKind::EmployeeList, &backend).await;
    let before = screen.snapshot().cloned();
    backend.seed(vec![department(4, "Legal")]);
    backend.fail_next(
        ResourceKind::JobRole,
        Op::List,
        GatewayError::Transport("timed out".into()),
    );

    let applied = screen.retry().await;

    assert!(matches!(applied, Applied::Failed(GatewayError::Transport(_))));
    assert!(matches!(screen.status(), LoadStatus::Failed(_)));
    assert_eq!(screen.snapshot().cloned(), before);
    assert_eq!(screen.notice().map(|n| n.surface), Some(Surface::Retry));
}

#[tokio::test]
async fn second_action_is_refused_while_one_executes() {
    let backend = seeded();
    let mut screen = open(ScreenKind::LeaveApproval, &backend).await;

    screen
        .request(Operation::Approve, Target::new(ResourceKind::LeaveRequest, 10))
        .expect("prompt opened");
    let in_flight = screen.confirm().expect("dispatched");

    assert_eq!(
        screen.request(Operation::Reject, Target::new(ResourceKind::LeaveRequest, 11)),
        Err(MutationError::Busy)
    );

    let finished = in_flight.run().await;
    assert_eq!(screen.complete(finished), Ok(Reconciliation::ReplacedInPlace));

    let queue = screen.view::<LeaveRequest>();
    assert_eq!(queue.records.iter().map(|l| l.id).collect::<Vec<_>>(), vec![11]);
    let decided = backend.records::<LeaveRequest>();
    assert_eq!(decided.iter().find(|l| l.id == 10).and_then(|l| l.approved_by), Some(1));
    assert!(
        screen
            .request(Operation::Reject, Target::new(ResourceKind::LeaveRequest, 11))
            .is_ok()
    );
}

#[tokio::test]
async fn profile_shows_department_of_the_employee() {
    let backend = seeded();
    let screen = open(ScreenKind::EmployeeProfile(2), &backend).await;

    let profile = screen.employee_profile().expect("profile");

    assert_eq!(profile.department.map(|d| d.name), Some("Sales".to_string()));
}
