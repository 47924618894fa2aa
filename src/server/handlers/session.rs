//! Session overview handler.

use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::export::flyer_filename;
use crate::session::{Action, Session, SessionState};

use super::super::state::AppState;

/// One record as shown in the flyer list.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub index: usize,
    pub filename: String,
    pub fields: BTreeMap<String, String>,
}

/// Everything the frontend needs to decide what to show.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    pub actions: &'static [Action],
    pub images: Vec<String>,
    pub records: Vec<RecordSummary>,
}

impl SessionResponse {
    pub fn from_session(session: &Session) -> Self {
        Self {
            state: session.state(),
            actions: session.available_actions(),
            images: session.assets().names(),
            records: session
                .records()
                .iter()
                .enumerate()
                .map(|(index, record)| RecordSummary {
                    index,
                    filename: flyer_filename(record, index + 1),
                    fields: record.fields().clone(),
                })
                .collect(),
        }
    }
}

/// GET /api/session - current state, valid actions, records and images.
pub async fn show(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session = state.session.read().await;
    Json(SessionResponse::from_session(&session))
}
