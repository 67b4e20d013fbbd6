//! User and authentication models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend user, either an anonymous id or a signed-up account
///
/// Wire shapes: `{"anonymous":{"id":...}}` and `{"authenticated":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum User {
    Anonymous {
        id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    Authenticated {
        id: Uuid,
        created_at: NaiveDateTime,
        updated_at: NaiveDateTime,
        email: String,
        name: String,
        self_description: String,
        access_token: AccessToken,
    },
}

impl User {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Anonymous { id } => *id,
            Self::Authenticated { id, .. } => *id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Anonymous { .. } => None,
            Self::Authenticated { name, .. } => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub last_user_ip: String,
    pub last_user_agent: String,
}

/// `POST /api/v1/user`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub self_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub access_token: String,
    pub user: User,
}

/// `POST /api/v1/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
}

/// `PATCH /api/v1/user`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub self_description: String,
    pub email: String,
}
