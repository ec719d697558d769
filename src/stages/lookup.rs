// Existence and lookup stages
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::UserStore;
use crate::error::ApiError;
use crate::pipeline::{DocumentKey, Phase, PipelineRequest, RequestContext, Stage, Step};

fn not_found(missing: &[Uuid]) -> ApiError {
    match missing {
        [one] => ApiError::not_found(format!("User {} not found", one)),
        _ => ApiError::not_found("One or more users not found"),
    }
}

fn missing_ids(wanted: &[Uuid], found: &HashSet<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    wanted
        .iter()
        .copied()
        .filter(|id| !found.contains(id) && seen.insert(*id))
        .collect()
}

/// Loads every identifier's user and publishes them under `key`.
/// Fails with NotFound if any identifier has no user.
pub struct FetchUsers {
    store: Arc<dyn UserStore>,
    key: DocumentKey,
}

impl FetchUsers {
    pub fn new(store: Arc<dyn UserStore>, key: DocumentKey) -> Self {
        Self { store, key }
    }
}

#[async_trait]
impl Stage for FetchUsers {
    fn name(&self) -> &'static str {
        "fetch_users"
    }

    fn phase(&self) -> Phase {
        Phase::Loaded
    }

    async fn run(&self, _request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        let users = self.store.find_by_ids(&ctx.user_ids).await?;

        let found: HashSet<Uuid> = users.iter().map(|user| user.id).collect();
        let missing = missing_ids(&ctx.user_ids, &found);
        if !missing.is_empty() {
            return Err(not_found(&missing));
        }

        tracing::debug!("Fetched {} users into '{}'", users.len(), self.key.name());
        ctx.mark_checked(ctx.user_ids.clone());
        ctx.attach_documents(self.key, users);
        Ok(Step::Next(ctx))
    }
}

/// Confirms every identifier names a user without loading the documents
pub struct CheckUsers {
    store: Arc<dyn UserStore>,
}

impl CheckUsers {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for CheckUsers {
    fn name(&self) -> &'static str {
        "check_users"
    }

    fn phase(&self) -> Phase {
        Phase::Loaded
    }

    async fn run(&self, _request: &PipelineRequest, mut ctx: RequestContext) -> Result<Step, ApiError> {
        let found = self.store.existing_ids(&ctx.user_ids).await?;

        let missing = missing_ids(&ctx.user_ids, &found);
        if !missing.is_empty() {
            return Err(not_found(&missing));
        }

        ctx.mark_checked(ctx.user_ids.clone());
        Ok(Step::Next(ctx))
    }
}
