use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use super::{LeaveGateway, PayrollGateway, ResourceGateway};
use crate::config::Config;
use crate::error::{FieldError, GatewayError};
use crate::model::{
    Department, Employee, JobRole, LeaveDecision, LeaveRequest, Payroll, Record,
};
use crate::session::Session;

/// Route segment of each collection under the API prefix.
pub trait HttpResource: Record {
    const PATH: &'static str;
}

impl HttpResource for Employee {
    const PATH: &'static str = "/employee";
}

impl HttpResource for Department {
    const PATH: &'static str = "/department";
}

impl HttpResource for JobRole {
    const PATH: &'static str = "/job-role";
}

impl HttpResource for LeaveRequest {
    const PATH: &'static str = "/leave";
}

impl HttpResource for Payroll {
    const PATH: &'static str = "/payroll";
}

/// List endpoints answer either with a bare array or with the paginated
/// envelope `{data, page, per_page, total}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<R> {
    Page {
        data: Vec<R>,
        #[serde(default)]
        total: Option<i64>,
    },
    Plain(Vec<R>),
}

/// Error bodies come as `{"message": ..}`, `{"error": ..}` or with field errors.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Pages needed to cover `total` records; one when the total is unknown.
fn last_page(total: Option<i64>, page_size: u32) -> u32 {
    match total {
        Some(total) if total > 0 => {
            let pages = (total as u64).div_ceil(u64::from(page_size.max(1)));
            u32::try_from(pages).unwrap_or(u32::MAX)
        }
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Read,
    Write,
    Transition,
    Delete,
}

pub struct HttpGateway {
    client: Client,
    root: String,
    page_size: u32,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            root: config.api_root(),
            page_size: config.page_size,
        })
    }

    fn request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.root, path))
            .bearer_auth(session.token())
    }

    #[instrument(level = "debug", skip(self, builder))]
    async fn send(
        &self,
        builder: RequestBuilder,
        path: &str,
        call: Call,
    ) -> Result<Vec<u8>, GatewayError> {
        let response = builder.send().await.map_err(|e| {
            error!(error = %e, path, "Request failed");
            GatewayError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if status.is_success() {
            debug!(status = status.as_u16(), "Request succeeded");
            return Ok(body.to_vec());
        }

        warn!(status = status.as_u16(), path, "Service rejected request");
        Err(classify(status, &body, call, path))
    }

    async fn get_list<R: HttpResource>(
        &self,
        session: &Session,
        filters: &[(&str, String)],
    ) -> Result<Vec<R>, GatewayError> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query: Vec<(&str, String)> = filters.to_vec();
            query.push(("page", page.to_string()));
            query.push(("per_page", self.page_size.to_string()));

            let builder = self.request(session, Method::GET, R::PATH).query(&query);
            let body = self.send(builder, R::PATH, Call::Read).await?;

            match decode::<ListBody<R>>(&body)? {
                ListBody::Plain(all) => return Ok(all),
                ListBody::Page { data, total } => {
                    let received = data.len();
                    records.extend(data);
                    let done = match total {
                        Some(total) => records.len() as i64 >= total,
                        None => true,
                    };
                    // A service that ignores `page` would otherwise repeat forever.
                    if done || received == 0 || page >= last_page(total, self.page_size) {
                        return Ok(records);
                    }
                    page += 1;
                }
            }
        }
    }

    async fn transition<R: HttpResource>(
        &self,
        session: &Session,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<Option<R>, GatewayError> {
        let mut builder = self.request(session, Method::PUT, &path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let bytes = self.send(builder, &path, Call::Transition).await?;

        // Some endpoints only acknowledge with a message.
        Ok(serde_json::from_slice::<R>(&bytes).ok())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::Transport(format!("malformed response: {e}")))
}

fn classify(status: StatusCode, body: &[u8], call: Call, path: &str) -> GatewayError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .unwrap_or_else(|| format!("{path} answered {status}"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::CONFLICT => GatewayError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => match call {
            // "not found or already processed"
            Call::Transition => GatewayError::Conflict(message),
            Call::Write if !parsed.errors.is_empty() => GatewayError::Validation(parsed.errors),
            Call::Write => GatewayError::Validation(vec![FieldError::new("form", message)]),
            Call::Read | Call::Delete => GatewayError::Transport(message),
        },
        _ => GatewayError::Transport(message),
    }
}

#[async_trait]
impl<R: HttpResource> ResourceGateway<R> for HttpGateway
where
    R::Payload: serde::Serialize,
{
    async fn list(&self, session: &Session) -> Result<Vec<R>, GatewayError> {
        self.get_list(session, &[]).await
    }

    async fn get_by_id(&self, session: &Session, id: u64) -> Result<R, GatewayError> {
        let path = format!("{}/{id}", R::PATH);
        let body = self
            .send(self.request(session, Method::GET, &path), &path, Call::Read)
            .await?;
        decode(&body)
    }

    async fn create(&self, session: &Session, payload: &R::Payload) -> Result<R, GatewayError> {
        let builder = self.request(session, Method::POST, R::PATH).json(payload);
        let body = self.send(builder, R::PATH, Call::Write).await?;
        serde_json::from_slice(&body).map_err(|_| {
            GatewayError::Transport("service did not return the saved record".to_string())
        })
    }

    async fn update(
        &self,
        session: &Session,
        id: u64,
        payload: &R::Payload,
    ) -> Result<R, GatewayError> {
        let path = format!("{}/{id}", R::PATH);
        let builder = self.request(session, Method::PUT, &path).json(payload);
        let body = self.send(builder, &path, Call::Write).await?;
        serde_json::from_slice(&body).map_err(|_| {
            GatewayError::Transport("service did not return the saved record".to_string())
        })
    }

    async fn delete(&self, session: &Session, id: u64) -> Result<(), GatewayError> {
        let path = format!("{}/{id}", R::PATH);
        self.send(self.request(session, Method::DELETE, &path), &path, Call::Delete)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl LeaveGateway for HttpGateway {
    async fn list_pending(&self, session: &Session) -> Result<Vec<LeaveRequest>, GatewayError> {
        self.get_list(session, &[("status", "pending".to_string())])
            .await
    }

    async fn list_by_employee(
        &self,
        session: &Session,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, GatewayError> {
        self.get_list(session, &[("employee_id", employee_id.to_string())])
            .await
    }

    async fn update_leave_status(
        &self,
        session: &Session,
        id: u64,
        decision: LeaveDecision,
        approver_id: u64,
    ) -> Result<Option<LeaveRequest>, GatewayError> {
        let path = format!("{}/{id}/{}", LeaveRequest::PATH, decision.as_ref());
        self.transition(session, path, Some(json!({ "approver_id": approver_id })))
            .await
    }
}

#[async_trait]
impl PayrollGateway for HttpGateway {
    async fn list_by_employee(
        &self,
        session: &Session,
        employee_id: u64,
    ) -> Result<Vec<Payroll>, GatewayError> {
        self.get_list(session, &[("employee_id", employee_id.to_string())])
            .await
    }

    async fn process_payroll(
        &self,
        session: &Session,
        id: u64,
    ) -> Result<Option<Payroll>, GatewayError> {
        let path = format!("{}/{id}/process", Payroll::PATH);
        self.transition(session, path, None).await
    }
}

#[cfg(test)]
#[path = "../tests/http_tests.rs"]
mod tests;
