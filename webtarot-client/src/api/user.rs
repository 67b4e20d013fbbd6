//! User account routes

use super::{read_json, ApiClient};
use crate::Result;
use reqwest::Method;
use tracing::instrument;
use webtarot_common::model::{
    CreateUserRequest, CreateUserResponse, LogInRequest, UpdateUserRequest, User,
};

impl ApiClient {
    /// `POST /api/v1/user`: turn the current anonymous user into an account
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: &CreateUserRequest) -> Result<CreateUserResponse> {
        let url = self.endpoint(&["user"])?;
        let response = self.request(Method::POST, url).json(request).send().await?;
        read_json(response).await
    }

    /// `POST /api/v1/login`
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn log_in(&self, request: &LogInRequest) -> Result<CreateUserResponse> {
        let url = self.endpoint(&["login"])?;
        let response = self.request(Method::POST, url).json(request).send().await?;
        read_json(response).await
    }

    /// `GET /api/v1/user`
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User> {
        let url = self.endpoint(&["user"])?;
        let response = self.request(Method::GET, url).send().await?;
        read_json(response).await
    }

    /// `PATCH /api/v1/user`
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, request: &UpdateUserRequest) -> Result<User> {
        let url = self.endpoint(&["user"])?;
        let response = self.request(Method::PATCH, url).json(request).send().await?;
        read_json(response).await
    }
}
