use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::rolling;

use hrm_console::derive::{department_name, job_title};
use hrm_console::forms::{self, DepartmentForm, FormMode, JobRoleForm, PayrollForm};
use hrm_console::gateway::{Gateways, HttpGateway};
use hrm_console::model::{Department, Employee, JobRole, LeaveRequest, Payroll, ResourceKind};
use hrm_console::mutation::{Operation, Reconciliation, Target};
use hrm_console::store::Applied;
use hrm_console::{Config, FormError, Screen, ScreenKind, Session, Surface};

#[derive(Parser, Debug)]
#[command(name = "hrm-console", about = "Admin console for the HR and payroll service")]
struct Cli {
    /// Answer yes to every confirmation prompt.
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Dashboard,
    Me,
    Departments {
        #[arg(long, default_value = "")]
        search: String,
    },
    JobRoles {
        #[arg(long, default_value = "")]
        search: String,
    },
    Employees {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        status: String,
    },
    Employee {
        id: u64,
    },
    Leaves {
        /// Show the approval queue instead of your own history.
        #[arg(long)]
        pending: bool,
        #[arg(long, default_value = "")]
        status: String,
    },
    Payrolls {
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "")]
        status: String,
    },
    Payroll {
        id: u64,
    },
    Delete {
        /// employee, department or job-role
        kind: ResourceKind,
        id: u64,
    },
    ApproveLeave {
        id: u64,
    },
    RejectLeave {
        id: u64,
    },
    ProcessPayroll {
        id: u64,
    },
    CreateDepartment {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    CreateJobRole {
        title: String,
        base_salary: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    CreatePayroll {
        employee_id: u64,
        base_salary: String,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "0")]
        allowances: String,
        #[arg(long, default_value = "0")]
        deductions: String,
    },
}

struct Console {
    session: Session,
    gateways: Gateways,
    recent_days: i64,
    assume_yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "console.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let token = config
        .access_token
        .clone()
        .context("ACCESS_TOKEN must be set")?;
    let session = Session::from_access_token(&token)?;
    info!(user = %session.username, role = ?session.role, "Console starting");

    let console = Console {
        session,
        gateways: Gateways::from_backend(Arc::new(HttpGateway::new(&config)?)),
        recent_days: config.recent_payroll_days,
        assume_yes: cli.yes,
    };

    let result = console.run(cli.command).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}

impl Console {
    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Dashboard => self.dashboard().await,
            Command::Me => {
                let id = self.session.require_employee()?;
                self.employee(id).await
            }
            Command::Departments { search } => {
                let mut screen = self.open(ScreenKind::DepartmentList).await?;
                screen.set_search(search);
                print_departments(&screen.view::<Department>().records);
                Ok(())
            }
            Command::JobRoles { search } => {
                let mut screen = self.open(ScreenKind::JobRoleList).await?;
                screen.set_search(search);
                print_job_roles(&screen.view::<JobRole>().records);
                Ok(())
            }
            Command::Employees { search, status } => {
                let mut screen = self.open(ScreenKind::EmployeeList).await?;
                screen.set_search(search);
                screen.set_status(status);
                let view = screen.view::<Employee>();
                for e in &view.records {
                    let dataset = screen.snapshot();
                    println!(
                        "{:>5}  {:<28} {:<18} {:<18} {}",
                        e.id,
                        e.full_name(),
                        dataset
                            .and_then(|d| department_name(d, e.department_id))
                            .unwrap_or("-"),
                        dataset.and_then(|d| job_title(d, e.job_role_id)).unwrap_or("-"),
                        e.status.as_deref().unwrap_or("-"),
                    );
                }
                println!("{} of {} employees", view.len(), view.total);
                Ok(())
            }
            Command::Employee { id } => self.employee(id).await,
            Command::Leaves { pending, status } => {
                let kind = if pending {
                    ScreenKind::LeaveApproval
                } else {
                    ScreenKind::LeaveHistory
                };
                let mut screen = self.open(kind).await?;
                screen.set_status(status);
                print_leaves(&screen.view::<LeaveRequest>().records);
                Ok(())
            }
            Command::Payrolls {
                month,
                year,
                status,
            } => {
                let mut screen = self.open(ScreenKind::PayrollList).await?;
                screen.set_month(month.map(|m| m.to_string()).unwrap_or_default());
                screen.set_year(year.map(|y| y.to_string()).unwrap_or_default());
                screen.set_status(status);
                print_payrolls(&screen.view::<Payroll>().records);
                let totals = screen.payroll_totals();
                println!(
                    "{} payrolls  base {:.2}  allowances {:.2}  deductions {:.2}  net {:.2}",
                    totals.count,
                    totals.base_salary,
                    totals.allowances,
                    totals.deductions,
                    totals.net_salary
                );
                Ok(())
            }
            Command::Payroll { id } => {
                let screen = self.open(ScreenKind::PayrollDetails(id)).await?;
                let (payroll, employee) = screen
                    .payslip()
                    .ok_or_else(|| anyhow!("payroll #{id} not found"))?;
                println!(
                    "Payslip #{} for {} ({:02}/{})",
                    payroll.id,
                    employee.map(|e| e.full_name()).unwrap_or_else(|| "unknown employee".into()),
                    payroll.month,
                    payroll.year
                );
                println!("  base salary  {:>12.2}", payroll.base_salary);
                println!("  allowances   {:>12.2}", payroll.allowances);
                println!("  deductions   {:>12.2}", payroll.deductions);
                println!("  net salary   {:>12.2}", payroll.net_salary);
                println!("  status       {:>12}", payroll.status);
                Ok(())
            }
            Command::Delete { kind, id } => {
                let screen = match kind {
                    ResourceKind::Employee => ScreenKind::EmployeeList,
                    ResourceKind::Department => ScreenKind::DepartmentList,
                    ResourceKind::JobRole => ScreenKind::JobRoleList,
                    other => bail!("{other} records cannot be deleted"),
                };
                self.gated(screen, Operation::Delete, Target::new(kind, id))
                    .await
            }
            Command::ApproveLeave { id } => {
                let target = Target::new(ResourceKind::LeaveRequest, id);
                self.gated(ScreenKind::LeaveApproval, Operation::Approve, target)
                    .await
            }
            Command::RejectLeave { id } => {
                let target = Target::new(ResourceKind::LeaveRequest, id);
                self.gated(ScreenKind::LeaveApproval, Operation::Reject, target)
                    .await
            }
            Command::ProcessPayroll { id } => {
                let target = Target::new(ResourceKind::Payroll, id);
                self.gated(ScreenKind::PayrollList, Operation::Process, target)
                    .await
            }
            Command::CreateDepartment { name, description } => {
                let form = DepartmentForm { name, description };
                let saved = forms::submit(
                    &form,
                    FormMode::Create,
                    &*self.gateways.departments,
                    &self.session,
                )
                .await
                .map_err(form_failure)?;
                println!("Created department #{} {}", saved.id, saved.name);
                Ok(())
            }
            Command::CreateJobRole {
                title,
                base_salary,
                description,
            } => {
                let form = JobRoleForm {
                    title,
                    base_salary,
                    description,
                };
                let saved = forms::submit(
                    &form,
                    FormMode::Create,
                    &*self.gateways.job_roles,
                    &self.session,
                )
                .await
                .map_err(form_failure)?;
                println!("Created job role #{} {}", saved.id, saved.title);
                Ok(())
            }
            Command::CreatePayroll {
                employee_id,
                base_salary,
                month,
                year,
                allowances,
                deductions,
            } => {
                let today = Utc::now();
                let mut form = PayrollForm::new(
                    month.unwrap_or_else(|| today.month()),
                    year.unwrap_or_else(|| today.year()),
                );
                form.employee_id = Some(employee_id);
                form.base_salary = base_salary;
                form.allowances = allowances;
                form.deductions = deductions;
                println!("Net salary: {:.2}", form.net_salary_preview());

                let saved = forms::submit(
                    &form,
                    FormMode::Create,
                    &*self.gateways.payrolls,
                    &self.session,
                )
                .await
                .map_err(form_failure)?;
                println!(
                    "Generated payroll #{} ({:02}/{}) net {:.2}",
                    saved.id, saved.month, saved.year, saved.net_salary
                );
                Ok(())
            }
        }
    }

    /// Mounts a screen and waits for its first load.
    async fn open(&self, kind: ScreenKind) -> Result<Screen> {
        let mut screen = Screen::mount(
            kind,
            self.session.clone(),
            self.gateways.clone(),
            self.recent_days,
        );
        if let Applied::Failed(err) = screen.load().await {
            return Err(match err.surface() {
                Surface::Reauthenticate => {
                    anyhow!("{err}; sign in again and update ACCESS_TOKEN")
                }
                Surface::Retry => anyhow!("{err}; the service may be down, try again"),
                _ => anyhow!(err),
            });
        }
        Ok(screen)
    }

    async fn dashboard(&self) -> Result<()> {
        let now = Utc::now();
        if self.session.role.is_manager() {
            let screen = self.open(ScreenKind::AdminDashboard).await?;
            let summary = screen
                .admin_summary(now)
                .context("dashboard has no data")?;
            println!("Employees          {}", summary.total_employees);
            println!("  with leave left  {}", summary.active_employees);
            println!("Pending leaves     {}", summary.pending_leaves);
            println!("Pending payrolls   {}", summary.pending_payrolls);
            println!("Payrolls ({}d)     {}", self.recent_days, summary.recent_payrolls);
        } else {
            let screen = self.open(ScreenKind::EmployeeDashboard).await?;
            let summary = screen
                .employee_summary(now)
                .context("dashboard has no data")?;
            if let Some(me) = &summary.employee {
                println!("Welcome, {}", me.full_name());
            }
            println!("Leave balance      {} days", summary.leave_balance);
            println!("Pending requests   {}", summary.pending_leaves);
            println!("Leaves taken       {}", summary.leaves_taken);
            println!("Payrolls ({}d)     {}", self.recent_days, summary.recent_payrolls);
            println!("\nRecent leaves");
            print_leaves(&summary.recent_leaves);
            println!("\nRecent payslips");
            print_payrolls(&summary.recent_payslips);
        }
        Ok(())
    }

    async fn employee(&self, id: u64) -> Result<()> {
        let screen = self.open(ScreenKind::EmployeeProfile(id)).await?;
        let profile = screen
            .employee_profile()
            .ok_or_else(|| anyhow!("employee #{id} not found"))?;
        let e = &profile.employee;
        println!("{} ({})", e.full_name(), e.employee_code.as_deref().unwrap_or("no code"));
        println!("  email        {}", e.email.as_deref().unwrap_or("-"));
        println!("  phone        {}", e.phone.as_deref().unwrap_or("-"));
        println!("  hired        {}", e.hire_date);
        println!("  leave left   {} days", e.leave_balance);
        println!("\nRecent leaves");
        print_leaves(&profile.recent_leaves);
        println!("\nRecent payrolls");
        print_payrolls(&profile.recent_payrolls);
        Ok(())
    }

    /// Runs a destructive command through the confirmation prompt.
    async fn gated(&self, kind: ScreenKind, operation: Operation, target: Target) -> Result<()> {
        let mut screen = self.open(kind).await?;
        let action = screen.request(operation, target)?;

        if !self.assume_yes && !ask(&action.prompt())? {
            screen.cancel_action();
            println!("Cancelled.");
            return Ok(());
        }

        match screen.confirm_and_run().await? {
            Reconciliation::Stale(err) => {
                println!("Done, but the list could not be refreshed: {err}");
            }
            _ => println!("Done: {operation} {target}."),
        }
        Ok(())
    }
}

fn ask(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn form_failure(err: FormError) -> anyhow::Error {
    if err.field_errors().is_empty() {
        return anyhow!(err);
    }
    for field in err.field_errors() {
        eprintln!("  {}: {}", field.field, field.message);
    }
    anyhow!("the form has invalid fields")
}

fn print_departments(departments: &[Department]) {
    for d in departments {
        println!("{:>5}  {:<24} {}", d.id, d.name, d.description.as_deref().unwrap_or(""));
    }
}

fn print_job_roles(roles: &[JobRole]) {
    for r in roles {
        println!("{:>5}  {:<24} {:>12.2}", r.id, r.title, r.base_salary);
    }
}

fn print_leaves(leaves: &[LeaveRequest]) {
    for l in leaves {
        println!(
            "{:>5}  emp {:<5} {} .. {} ({} d)  {:<7} {}",
            l.id,
            l.employee_id,
            l.start_date,
            l.end_date,
            l.days(),
            l.leave_type,
            l.status
        );
    }
}

fn print_payrolls(payrolls: &[Payroll]) {
    for p in payrolls {
        println!(
            "{:>5}  emp {:<5} {:02}/{}  net {:>12.2}  {}",
            p.id, p.employee_id, p.month, p.year, p.net_salary, p.status
        );
    }
}
