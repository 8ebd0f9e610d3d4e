use serde::{Deserialize, Serialize};

use super::{Record, ResourceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRole {
    pub id: u64,
    pub title: String,
    /// Standard monthly salary for the role; pre-fills payroll generation.
    pub base_salary: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRolePayload {
    pub title: String,
    pub base_salary: f64,
    pub description: Option<String>,
}

impl Record for JobRole {
    type Payload = JobRolePayload;
    const KIND: ResourceKind = ResourceKind::JobRole;

    fn id(&self) -> u64 {
        self.id
    }
}
