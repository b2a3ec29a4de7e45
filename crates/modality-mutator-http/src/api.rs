//! Routes and handlers.
//!
//! | Method | Path                     | Success | Errors                  |
//! |--------|--------------------------|---------|-------------------------|
//! | GET    | /mutator                 | 200     | 400 401                 |
//! | GET    | /mutator/{id}            | 200     | 400 401 404             |
//! | POST   | /mutator/{id}/mutation   | 201     | 400 401 404 409 422 500 |
//! | DELETE | /mutator/{id}/mutation   | 200     | 400 401 404 500         |
//! | GET    | /api-doc.json            | 200     |                         |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use modality_client::MutatorHost;
use modality_types::{AttrVal, MutationId, MutatorDescriptor, MutatorId};
use serde::{Deserialize, Serialize};

use crate::doc;
use crate::error::ApiError;

pub const MUTATOR_API_KEY_HEADER: &str = "mutator_apikey";

#[derive(Clone)]
pub struct AppState {
    pub host: Arc<MutatorHost>,
    pub api_key: Option<Arc<str>>,
}

/// One mutator as listed: its id and flat descriptor attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatorInfo {
    pub mutator_correlation_id: MutatorId,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl MutatorInfo {
    fn new(id: MutatorId, descriptor: &MutatorDescriptor) -> Self {
        let attributes = descriptor
            .to_attributes()
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();
        Self {
            mutator_correlation_id: id,
            attributes,
        }
    }
}

/// Body of `POST /mutator/{id}/mutation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRequest {
    pub mutation: MutationId,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/mutator", get(list_mutators))
        .route("/mutator/{id}", get(get_mutator))
        .route("/mutator/{id}/mutation", post(create_mutation).delete(reset_mutator))
        .route("/api-doc.json", get(api_doc))
        .with_state(state)
}

/// Passes when no key is configured or the header matches.
pub struct ValidApiKey;

impl FromRequestParts<AppState> for ValidApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_key.as_deref() else {
            return Ok(ValidApiKey);
        };
        let supplied = parts
            .headers
            .get(MUTATOR_API_KEY_HEADER)
            .ok_or(ApiError::MissingApiKey)?;
        if supplied.as_bytes() == expected.as_bytes() {
            Ok(ValidApiKey)
        } else {
            Err(ApiError::InvalidApiKey)
        }
    }
}

fn parse_id(raw: &str) -> Result<MutatorId, ApiError> {
    MutatorId::parse(raw).map_err(|_| ApiError::MutatorNotFound(raw.to_string()))
}

async fn list_mutators(State(state): State<AppState>, _key: ValidApiKey) -> Json<Vec<MutatorInfo>> {
    let list = state
        .host
        .list()
        .iter()
        .map(|(id, d)| MutatorInfo::new(*id, d))
        .collect();
    Json(list)
}

async fn get_mutator(
    State(state): State<AppState>,
    _key: ValidApiKey,
    Path(raw): Path<String>,
) -> Result<Json<MutatorInfo>, ApiError> {
    let id = parse_id(&raw)?;
    let descriptor = state.host.descriptor(id).ok_or(ApiError::MutatorNotFound(raw))?;
    Ok(Json(MutatorInfo::new(id, &descriptor)))
}

async fn create_mutation(
    State(state): State<AppState>,
    _key: ValidApiKey,
    Path(raw): Path<String>,
    Json(req): Json<MutationRequest>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw)?;
    let params = req
        .params
        .iter()
        .map(|(name, v)| {
            AttrVal::from_json(v)
                .map(|val| (name.clone(), val))
                .ok_or_else(|| {
                    ApiError::InvalidParams(format!(
                        "parameter '{name}' has no attribute value form"
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    state.host.inject(id, req.mutation, params).await?;
    tracing::info!(mutator = %id, mutation = %req.mutation, "mutation injected");
    Ok(StatusCode::CREATED)
}

async fn reset_mutator(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    _key: ValidApiKey,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw)?;
    let previous = state.host.reset(id).await?;
    tracing::info!(mutator = %id, previous = ?previous, "mutator reset");
    Ok(StatusCode::OK)
}

async fn api_doc() -> Json<serde_json::Value> {
    Json(doc::openapi())
}
