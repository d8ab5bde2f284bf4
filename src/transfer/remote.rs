//! HTTP-backed collaborator clients
//!
//! Thin reqwest clients for the account-validation and OTP services. Any
//! transport or decode failure maps to `CollaboratorError::Unavailable`; the
//! coordinator surfaces that as `ExternalServiceUnavailable` and leaves the
//! transfer where it was.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::collaborators::{
    AccountCheck, AccountValidator, CollaboratorError, SecondFactorCheck, SecondFactorIssue,
    SecondFactorService,
};
use super::types::TransferId;

fn unavailable(e: impl ToString) -> CollaboratorError {
    CollaboratorError::Unavailable(e.to_string())
}

/// Client for `GET {base}/v1/accounts/{account}/validate`
pub struct HttpAccountValidator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccountValidator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    exists: bool,
    active: bool,
}

#[async_trait]
impl AccountValidator for HttpAccountValidator {
    async fn validate(&self, account_no: &str) -> Result<AccountCheck, CollaboratorError> {
        let url = format!("{}/v1/accounts/{}/validate", self.base_url, account_no);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let body: ValidateResponse = response.json().await.map_err(unavailable)?;
        Ok(AccountCheck {
            exists: body.exists,
            active: body.active,
        })
    }
}

/// Client for the OTP service (`/v1/otp/issue`, `/validate`, `/invalidate`)
pub struct HttpSecondFactor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSecondFactor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    masked_contact: String,
    ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ValidateCodeResponse {
    status: String,
}

#[async_trait]
impl SecondFactorService for HttpSecondFactor {
    async fn issue(
        &self,
        transfer_id: &TransferId,
        contact: &str,
    ) -> Result<SecondFactorIssue, CollaboratorError> {
        let url = format!("{}/v1/otp/issue", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "transfer_id": transfer_id.to_string(),
                "contact": contact,
            }))
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let body: IssueResponse = response.json().await.map_err(unavailable)?;
        Ok(SecondFactorIssue {
            masked_contact: body.masked_contact,
            ttl_secs: body.ttl_secs,
        })
    }

    async fn validate(
        &self,
        transfer_id: &TransferId,
        code: &str,
    ) -> Result<SecondFactorCheck, CollaboratorError> {
        let url = format!("{}/v1/otp/validate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "transfer_id": transfer_id.to_string(),
                "code": code,
            }))
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let body: ValidateCodeResponse = response.json().await.map_err(unavailable)?;
        match body.status.as_str() {
            "VALID" => Ok(SecondFactorCheck::Valid),
            "EXPIRED" => Ok(SecondFactorCheck::Expired),
            _ => Ok(SecondFactorCheck::Invalid),
        }
    }

    async fn invalidate(&self, transfer_id: &TransferId) -> Result<(), CollaboratorError> {
        let url = format!("{}/v1/otp/invalidate", self.base_url);
        self.client
            .post(&url)
            .json(&json!({ "transfer_id": transfer_id.to_string() }))
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;
        Ok(())
    }
}
