//! Wire models for the webtarot backend API
//!
//! All structs serialize with `camelCase` field names and all enums are
//! externally tagged, matching what the backend emits.

// Sub-modules (supporting types)
mod cards;
mod reading;
mod stats;
mod user;

pub use cards::{Arcana, Card, MajorArcana, Rank, Suit};
pub use reading::{
    CreateInterpretationRequest, CreateInterpretationResponse, CreateReadingRequest,
    CreateReadingResponse, Interpretation, InterpretationResult, Reading, NOT_FOUND_ERROR,
};
pub use stats::{ArcanaStats, Stats};
pub use user::{AccessToken, CreateUserRequest, CreateUserResponse, LogInRequest, UpdateUserRequest, User};
