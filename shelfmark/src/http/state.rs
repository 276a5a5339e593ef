use std::sync::Arc;

use crate::credentials::PasswordHasher;
use crate::session::SessionIssuer;
use crate::store::UserStore;

/// Collaborators shared by every handler. Built once in `main` and cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub passwords: PasswordHasher,
    pub sessions: Arc<SessionIssuer>,
}
