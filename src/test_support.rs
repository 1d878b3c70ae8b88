//! Collaborator doubles shared by the unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    clients::{HistoryClient, ProfileProvider, UserDirectory},
    error::AppError,
    models::{dashboard::UserProfile, transaction::TransactionResponse},
    services::log_publisher::LogPublisher,
};

/// User directory with a fixed set of known users.
#[derive(Default, Clone)]
pub struct StaticUsers {
    known: HashSet<Uuid>,
    unavailable: bool,
}

impl StaticUsers {
    pub fn with(users: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            known: users.into_iter().collect(),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            known: HashSet::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        if self.unavailable {
            return Err(AppError::UpstreamUnavailable(
                "user service unavailable".to_string(),
            ));
        }
        Ok(self.known.contains(&user_id))
    }
}

#[async_trait]
impl ProfileProvider for StaticUsers {
    async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        if self.unavailable {
            return Err(AppError::UpstreamUnavailable(
                "user service unavailable".to_string(),
            ));
        }
        if !self.known.contains(&user_id) {
            return Err(AppError::user_not_found(user_id));
        }
        Ok(UserProfile {
            user_id,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
        })
    }
}

/// How a scripted history branch behaves.
#[derive(Clone)]
pub enum Branch {
    Ok(Vec<TransactionResponse>),
    NotFound,
    Unavailable,
    Hang,
}

/// History client whose answer per account is scripted; unscripted
/// accounts answer `NotFound`.
#[derive(Default, Clone)]
pub struct ScriptedHistory {
    branches: HashMap<Uuid, Branch>,
}

impl ScriptedHistory {
    pub fn on(mut self, account_id: Uuid, branch: Branch) -> Self {
        self.branches.insert(account_id, branch);
        self
    }
}

#[async_trait]
impl HistoryClient for ScriptedHistory {
    async fn history(&self, account_id: Uuid) -> Result<Vec<TransactionResponse>, AppError> {
        match self.branches.get(&account_id).cloned().unwrap_or(Branch::NotFound) {
            Branch::Ok(transactions) => Ok(transactions),
            Branch::NotFound => Err(AppError::NotFound(format!(
                "No transactions found for account: {account_id}"
            ))),
            Branch::Unavailable => Err(AppError::UpstreamUnavailable(
                "transactions service unavailable".to_string(),
            )),
            Branch::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Publisher that keeps every message for inspection.
#[derive(Default, Clone)]
pub struct RecordingPublisher {
    pub messages: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<(String, Value)> {
        self.messages.lock().unwrap().clone()
    }
}

impl LogPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: Value) {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
    }
}
