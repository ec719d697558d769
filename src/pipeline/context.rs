use std::collections::HashMap;
use std::time::Instant;

use uuid::Uuid;

use crate::auth::Caller;
use crate::database::models::User;
use crate::pipeline::stage::Phase;
use crate::validation::UserInput;

/// Name under which documents are published in the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentKey(&'static str);

impl DocumentKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Typed per-request state, filled in stage by stage and dropped with the request
#[derive(Debug)]
pub struct RequestContext {
    pub phase: Phase,
    pub started_at: Instant,

    /// Set by the authentication stage
    pub caller: Option<Caller>,

    /// Candidate identifiers as extracted from the request
    pub candidate_ids: Vec<String>,
    /// Candidates that parsed as identifiers, in request order
    pub user_ids: Vec<Uuid>,
    /// Identifiers confirmed to exist in the store
    checked_ids: Option<Vec<Uuid>>,

    documents: HashMap<DocumentKey, Vec<User>>,
    singles: HashMap<DocumentKey, User>,

    /// Validated create-user payload
    pub input: Option<UserInput>,
    /// User written by the create route
    pub created: Option<User>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            phase: Phase::Start,
            started_at: Instant::now(),
            caller: None,
            candidate_ids: Vec::new(),
            user_ids: Vec::new(),
            checked_ids: None,
            documents: HashMap::new(),
            singles: HashMap::new(),
            input: None,
            created: None,
        }
    }

    /// Record that every id in `ids` resolves to a stored user
    pub fn mark_checked(&mut self, ids: Vec<Uuid>) {
        self.checked_ids = Some(ids);
    }

    /// Ids confirmed to exist, or None if no existence check has run
    pub fn checked_ids(&self) -> Option<&[Uuid]> {
        self.checked_ids.as_deref()
    }

    pub fn attach_documents(&mut self, key: DocumentKey, users: Vec<User>) {
        self.documents.insert(key, users);
    }

    pub fn documents(&self, key: DocumentKey) -> Option<&[User]> {
        self.documents.get(&key).map(Vec::as_slice)
    }

    pub fn set_single(&mut self, key: DocumentKey, user: User) {
        self.singles.insert(key, user);
    }

    pub fn single(&self, key: DocumentKey) -> Option<&User> {
        self.singles.get(&key)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
