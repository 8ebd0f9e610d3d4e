pub mod department;
pub mod employee;
pub mod job_role;
pub mod leave_request;
pub mod payroll;
pub mod role;

pub use department::{Department, DepartmentPayload};
pub use employee::{Employee, EmployeePayload};
pub use job_role::{JobRole, JobRolePayload};
pub use leave_request::{LeaveDecision, LeaveRequest, LeaveRequestPayload, LeaveStatus, LeaveType};
pub use payroll::{Payroll, PayrollPayload, PayrollStatus};
pub use role::Role;

use serde::{Serialize, de::DeserializeOwned};
use strum_macros::{AsRefStr, Display, EnumString};

/// The five remote collections the console works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    Employee,
    Department,
    JobRole,
    LeaveRequest,
    Payroll,
}

/// A domain record with a stable identifier, unique within its collection.
pub trait Record: Clone + Send + Sync + DeserializeOwned + 'static {
    /// Body sent on create and update.
    type Payload: Serialize + Send + Sync;

    const KIND: ResourceKind;

    fn id(&self) -> u64;
}
