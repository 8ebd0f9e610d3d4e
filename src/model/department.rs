use serde::{Deserialize, Serialize};

use super::{Record, ResourceKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentPayload {
    pub name: String,
    pub description: Option<String>,
}

impl Record for Department {
    type Payload = DepartmentPayload;
    const KIND: ResourceKind = ResourceKind::Department;

    fn id(&self) -> u64 {
        self.id
    }
}
