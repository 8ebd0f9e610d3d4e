//! Remote resource gateways: one per domain type.
//!
//! The console never talks to the service directly; screens hold a
//! [`Gateways`] bundle and every call carries the acting [`Session`].

pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{
    Department, Employee, JobRole, LeaveDecision, LeaveRequest, Payroll, Record,
};
use crate::session::Session;

pub use http::HttpGateway;
pub use memory::InMemoryGateway;

#[async_trait]
pub trait ResourceGateway<R: Record>: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<R>, GatewayError>;

    async fn get_by_id(&self, session: &Session, id: u64) -> Result<R, GatewayError>;

    async fn create(&self, session: &Session, payload: &R::Payload) -> Result<R, GatewayError>;

    async fn update(
        &self,
        session: &Session,
        id: u64,
        payload: &R::Payload,
    ) -> Result<R, GatewayError>;

    async fn delete(&self, session: &Session, id: u64) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait LeaveGateway: ResourceGateway<LeaveRequest> {
    async fn list_pending(&self, session: &Session) -> Result<Vec<LeaveRequest>, GatewayError>;

    async fn list_by_employee(
        &self,
        session: &Session,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, GatewayError>;

    /// Returns the updated request when the service echoes it back.
    /// `approver_id` is the deciding user's employee id.
    async fn update_leave_status(
        &self,
        session: &Session,
        id: u64,
        decision: LeaveDecision,
        approver_id: u64,
    ) -> Result<Option<LeaveRequest>, GatewayError>;
}

#[async_trait]
pub trait PayrollGateway: ResourceGateway<Payroll> {
    async fn list_by_employee(
        &self,
        session: &Session,
        employee_id: u64,
    ) -> Result<Vec<Payroll>, GatewayError>;

    /// Returns the processed payroll when the service echoes it back.
    async fn process_payroll(
        &self,
        session: &Session,
        id: u64,
    ) -> Result<Option<Payroll>, GatewayError>;
}

/// Every gateway a screen may need.
#[derive(Clone)]
pub struct Gateways {
    pub employees: Arc<dyn ResourceGateway<Employee>>,
    pub departments: Arc<dyn ResourceGateway<Department>>,
    pub job_roles: Arc<dyn ResourceGateway<JobRole>>,
    pub leaves: Arc<dyn LeaveGateway>,
    pub payrolls: Arc<dyn PayrollGateway>,
}

impl Gateways {
    /// Routes every domain through one backend.
    pub fn from_backend<G>(backend: Arc<G>) -> Self
    where
        G: ResourceGateway<Employee>
            + ResourceGateway<Department>
            + ResourceGateway<JobRole>
            + LeaveGateway
            + PayrollGateway
            + 'static,
    {
        Self {
            employees: backend.clone(),
            departments: backend.clone(),
            job_roles: backend.clone(),
            leaves: backend.clone(),
            payrolls: backend,
        }
    }
}
