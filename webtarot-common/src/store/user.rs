//! Persisted user identity
//!
//! Every client has an identity: a random anonymous UUID until the user signs
//! up or logs in, then the backend user plus its access token.

use super::KeyValueStore;
use crate::model::User;
use crate::{uuid_utils, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const USER_KEY: &str = "user";
/// Older clients stored only the anonymous id under this key
const LEGACY_USER_ID_KEY: &str = "userId";

/// Stored shape: `{"user": <User>, "accessToken": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Credentials presented to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous(Uuid),
    Token(String),
}

impl Identity {
    /// HTTP header carrying this identity
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Identity::Anonymous(id) => ("x-user-uuid", id.to_string()),
            Identity::Token(token) => ("authorization", format!("Bearer {}", token)),
        }
    }

    /// Value offered as the WebSocket subprotocol
    pub fn subprotocol(&self) -> String {
        match self {
            Identity::Anonymous(id) => id.to_string(),
            Identity::Token(token) => token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn KeyValueStore>,
}

impl UserStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current stored user, creating an anonymous one on first use
    pub fn stored_user(&self) -> Result<StoredUser> {
        if let Some(existing) = self.read()? {
            return Ok(existing);
        }
        if let Some(migrated) = self.migrate_legacy_id()? {
            return Ok(migrated);
        }

        let stored = StoredUser {
            user: User::Anonymous { id: uuid_utils::generate() },
            access_token: None,
        };
        self.write(&stored)?;
        info!(user_id = %stored.user.id(), "Created anonymous identity");
        Ok(stored)
    }

    pub fn set_authenticated(&self, user: User, access_token: String) -> Result<()> {
        self.write(&StoredUser {
            user,
            access_token: Some(access_token),
        })
    }

    pub fn set_anonymous(&self, id: Uuid) -> Result<()> {
        self.write(&StoredUser {
            user: User::Anonymous { id },
            access_token: None,
        })
    }

    /// Forget the stored identity
    pub fn clear(&self) -> Result<()> {
        self.store.remove(USER_KEY)?;
        self.store.remove(LEGACY_USER_ID_KEY)
    }

    /// Clear and switch to a fresh anonymous identity
    pub fn log_out(&self) -> Result<StoredUser> {
        self.clear()?;
        self.stored_user()
    }

    pub fn user_id(&self) -> Result<Uuid> {
        Ok(self.stored_user()?.user.id())
    }

    /// Access token when present, anonymous id otherwise
    pub fn identity(&self) -> Result<Identity> {
        let stored = self.stored_user()?;
        Ok(match stored.access_token {
            Some(token) if !token.is_empty() => Identity::Token(token),
            _ => Identity::Anonymous(stored.user.id()),
        })
    }

    fn read(&self) -> Result<Option<StoredUser>> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!("Ignoring malformed stored user: {}", e);
                Ok(None)
            }
        }
    }

    fn write(&self, stored: &StoredUser) -> Result<()> {
        let json = serde_json::to_string(stored)?;
        self.store.set(USER_KEY, &json)
    }

    fn migrate_legacy_id(&self) -> Result<Option<StoredUser>> {
        let Some(raw) = self.store.get(LEGACY_USER_ID_KEY)? else {
            return Ok(None);
        };
        let Ok(id) = uuid_utils::parse(raw.trim()) else {
            warn!("Ignoring malformed legacy user id");
            return Ok(None);
        };
        let stored = StoredUser {
            user: User::Anonymous { id },
            access_token: None,
        };
        self.write(&stored)?;
        info!(user_id = %id, "Migrated legacy anonymous identity");
        Ok(Some(stored))
    }
}
