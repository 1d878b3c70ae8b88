//! `reqwest` implementations of the service ports.
//!
//! Every call is bounded by the client-wide timeout. Transport failures,
//! timeouts and undecodable bodies become `UpstreamUnavailable`; error
//! bodies from a peer are rebuilt into the matching `AppError` variant.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::{HistoryClient, LedgerClient, ProfileProvider, UserDirectory};
use crate::{
    error::{AppError, ErrorBody},
    models::{
        account::{AccountResponse, TransferConfirmation, TransferRequest},
        dashboard::UserProfile,
        transaction::TransactionResponse,
    },
};

/// Build the shared HTTP client.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Base URL plus the client used to reach one peer service.
#[derive(Clone)]
pub struct ServiceEndpoint {
    http: Client,
    base: Url,
    name: &'static str,
}

impl ServiceEndpoint {
    pub fn new(http: Client, base_url: &str, name: &'static str) -> Result<Self, url::ParseError> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { http, base, name })
    }

    fn url(&self, path: &str) -> Result<Url, AppError> {
        self.base
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid {} URL {path}: {e}", self.name)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(service = self.name, error = %e, "Upstream call failed");
            AppError::UpstreamUnavailable(format!("{} service unavailable: {e}", self.name))
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::UpstreamUnavailable(format!(
                    "{} service returned an unreadable body: {e}",
                    self.name
                ))
            });
        }

        let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
            status: status.as_u16(),
            error: String::new(),
            message: format!("{} service responded {}", self.name, status),
        });

        Err(AppError::from_remote(status, body))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = self.url(path)?;
        self.send(self.http.get(url)).await
    }
}

/// User-identity service (`/users/{id}/profile`).
#[derive(Clone)]
pub struct HttpUserService {
    endpoint: ServiceEndpoint,
}

impl HttpUserService {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl ProfileProvider for HttpUserService {
    async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        match self
            .endpoint
            .get::<UserProfile>(&format!("users/{user_id}/profile"))
            .await
        {
            Err(AppError::NotFound(_)) => Err(AppError::user_not_found(user_id)),
            other => other,
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserService {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        match self
            .endpoint
            .get::<serde_json::Value>(&format!("users/{user_id}/profile"))
            .await
        {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// AccountLedger over HTTP (`/accounts/**`).
#[derive(Clone)]
pub struct HttpAccountService {
    endpoint: ServiceEndpoint,
}

impl HttpAccountService {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl LedgerClient for HttpAccountService {
    async fn account(&self, account_id: Uuid) -> Result<AccountResponse, AppError> {
        self.endpoint.get(&format!("accounts/{account_id}")).await
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<AccountResponse>, AppError> {
        self.endpoint
            .get(&format!("accounts/users/{user_id}/accounts"))
            .await
    }

    async fn apply_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferConfirmation, AppError> {
        let url = self.endpoint.url("accounts/transfer")?;
        self.endpoint
            .send(self.endpoint.http.put(url).json(request))
            .await
    }
}

/// TransferCoordinator over HTTP (`/transactions/**`).
#[derive(Clone)]
pub struct HttpTransactionService {
    endpoint: ServiceEndpoint,
}

impl HttpTransactionService {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl HistoryClient for HttpTransactionService {
    async fn history(&self, account_id: Uuid) -> Result<Vec<TransactionResponse>, AppError> {
        self.endpoint
            .get(&format!("transactions/accounts/{account_id}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base: &str) -> ServiceEndpoint {
        ServiceEndpoint::new(Client::new(), base, "accounts").unwrap()
    }

    #[test]
    fn test_join_keeps_base_path() {
        let id = Uuid::nil();
        let url = endpoint("http://ledger:8082/api")
            .url(&format!("accounts/{id}"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://ledger:8082/api/accounts/00000000-0000-0000-0000-000000000000"
        );

        let url = endpoint("http://ledger:8082").url("accounts/transfer").unwrap();
        assert_eq!(url.as_str(), "http://ledger:8082/accounts/transfer");
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        assert!(ServiceEndpoint::new(Client::new(), "not a url", "accounts").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_upstream_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments
        let http = build_client(Duration::from_millis(200)).unwrap();
        let service = HttpTransactionService::new(
            ServiceEndpoint::new(http, "http://127.0.0.1:9", "transactions").unwrap(),
        );

        let result = service.history(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }
}
