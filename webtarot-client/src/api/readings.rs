//! Reading, interpretation, history and stats routes

use super::{error_for_status, http_error, is_json, read_json, ApiClient};
use crate::{ClientError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use tracing::{debug, instrument};
use webtarot_common::model::{
    CreateInterpretationRequest, CreateInterpretationResponse, CreateReadingRequest,
    CreateReadingResponse, Interpretation, Stats,
};
use webtarot_common::InterpretationResult;

impl ApiClient {
    /// `POST /api/v1/reading`: shuffle, draw and queue an interpretation
    #[instrument(skip(self, request), fields(cards = request.cards))]
    pub async fn create_reading(
        &self,
        request: &CreateReadingRequest,
    ) -> Result<CreateReadingResponse> {
        let url = self.endpoint(&["reading"])?;
        let response = self.request(Method::POST, url).json(request).send().await?;
        let created: CreateReadingResponse = read_json(response).await?;
        debug!(interpretation_id = %created.interpretation_id, "Reading created");
        Ok(created)
    }

    /// `POST /api/v1/interpretation`: interpret cards the user picked
    #[instrument(skip(self, request), fields(cards = request.cards.len()))]
    pub async fn create_interpretation(
        &self,
        request: &CreateInterpretationRequest,
    ) -> Result<CreateInterpretationResponse> {
        let url = self.endpoint(&["interpretation"])?;
        let response = self.request(Method::POST, url).json(request).send().await?;
        read_json(response).await
    }

    /// `GET /api/v1/interpretation/{id}`: one status/content retrieval
    ///
    /// The backend answers an unknown id with a non-2xx status whose body is a
    /// regular result with error `"Not found"`; that result is returned as is.
    #[instrument(skip(self))]
    pub async fn get_interpretation(&self, id: &str) -> Result<InterpretationResult> {
        if id.is_empty() {
            return Err(ClientError::InvalidInput(
                "interpretation id must not be empty".to_string(),
            ));
        }

        let url = self.endpoint(&["interpretation", id])?;
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if status.is_success() {
            return read_json(response).await;
        }

        let json = is_json(&response);
        let body = response.text().await.unwrap_or_default();
        if let Ok(result) = serde_json::from_str::<InterpretationResult>(&body) {
            if result.is_not_found() {
                debug!(status = status.as_u16(), "Interpretation not found");
                return Ok(result);
            }
        }
        Err(http_error(status, json, &body))
    }

    /// `DELETE /api/v1/interpretation/{id}`
    #[instrument(skip(self))]
    pub async fn delete_interpretation(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(ClientError::InvalidInput(
                "interpretation id must not be empty".to_string(),
            ));
        }
        let url = self.endpoint(&["interpretation", id])?;
        let response = self.request(Method::DELETE, url).send().await?;
        error_for_status(response).await?;
        Ok(())
    }

    /// `GET /api/v1/interpretation/history`, newest first
    ///
    /// `before` pages backwards from a reading's creation time.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        before: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<Interpretation>> {
        let mut url = self.endpoint(&["interpretation", "history"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(before) = before {
                query.append_pair("before", &before.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self.request(Method::GET, url).send().await?;
        read_json(response).await
    }

    /// `GET /api/v1/stats`
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<Stats> {
        let url = self.endpoint(&["stats"])?;
        let response = self.request(Method::GET, url).send().await?;
        read_json(response).await
    }
}
