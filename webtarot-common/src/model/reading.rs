//! Readings and interpretation results

use super::Card;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `error` value the backend uses for an unknown reading id
pub const NOT_FOUND_ERROR: &str = "Not found";

/// A question plus the ordered cards drawn for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub question: String,
    pub shuffled_times: usize,
    pub cards: Vec<Card>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_self_description: String,
    #[serde(default)]
    pub context: String,
}

/// `POST /api/v1/reading`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    pub question: String,
    /// Number of cards to draw
    pub cards: u8,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingResponse {
    pub shuffled_times: usize,
    pub cards: Vec<Card>,
    pub interpretation_id: String,
}

/// `POST /api/v1/interpretation`: interpret cards chosen by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterpretationRequest {
    pub question: String,
    pub cards: Vec<Card>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterpretationResponse {
    pub interpretation_id: Uuid,
}

/// Status and content of one interpretation (`GET /api/v1/interpretation/{id}`)
///
/// `interpretation` is only final once `done` is true. A pending result may carry
/// placeholder text (the backend echoes the question), which must not be shown as
/// the answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationResult {
    pub done: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub interpretation: String,
    #[serde(default)]
    pub reading: Option<Reading>,
    #[serde(default)]
    pub interpretation_done_at: Option<NaiveDateTime>,
}

impl InterpretationResult {
    /// Result the backend returns for an unknown id
    pub fn not_found() -> Self {
        Self {
            error: NOT_FOUND_ERROR.to_string(),
            ..Default::default()
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.error == NOT_FOUND_ERROR
    }

    /// Generation finished with an error message
    pub fn is_failed(&self) -> bool {
        self.done && !self.error.is_empty()
    }

    /// Final interpretation text, `None` while pending or failed
    pub fn text(&self) -> Option<&str> {
        if self.done && self.error.is_empty() {
            Some(&self.interpretation)
        } else {
            None
        }
    }
}

/// History entry (`GET /api/v1/interpretation/history`)
///
/// Serialized externally tagged with tuple variants:
/// `{"Pending": reading}`, `{"Done": [reading, text, doneAt]}`, `{"Failed": [reading, error]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Interpretation {
    Pending(Reading),
    Done(Reading, String, NaiveDateTime),
    Failed(Reading, String),
}

impl Interpretation {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(..))
    }

    pub fn reading(&self) -> &Reading {
        match self {
            Self::Pending(reading) => reading,
            Self::Done(reading, _, _) => reading,
            Self::Failed(reading, _) => reading,
        }
    }

    /// Interpretation text or failure message; empty while pending
    pub fn text(&self) -> &str {
        match self {
            Self::Pending(_) => "",
            Self::Done(_, text, _) => text,
            Self::Failed(_, error) => error,
        }
    }
}

impl From<Interpretation> for InterpretationResult {
    fn from(value: Interpretation) -> Self {
        match value {
            Interpretation::Pending(reading) => Self {
                done: false,
                reading: Some(reading),
                ..Default::default()
            },
            Interpretation::Done(reading, text, done_at) => Self {
                done: true,
                error: String::new(),
                interpretation: text,
                reading: Some(reading),
                interpretation_done_at: Some(done_at),
            },
            Interpretation::Failed(reading, error) => Self {
                done: true,
                error,
                reading: Some(reading),
                ..Default::default()
            },
        }
    }
}
