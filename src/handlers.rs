// src/handlers.rs
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::Json;
use chrono::NaiveDate;
use http::StatusCode;
use serde::Serialize;

use crate::aggregate::{self, HeatMap};
use crate::error::{PollError, PollResult};
use crate::grid::{self, LabeledCell};
use crate::models::{CreatedPoll, NewPoll, PollQuery, PollRecord, SubmitRequest, SubmitResponse, ZoneQuery};
use crate::poll;
use crate::services::{self, RetryPolicy};
use crate::slot;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }
}

/// JSON body whose decode failures come back as validation errors.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = PollError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PollError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub async fn health() -> &'static str {
    "OK"
}

/// POST /api/poll
pub async fn create_poll(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewPoll>,
) -> PollResult<(StatusCode, Json<CreatedPoll>)> {
    let record = poll::create(state.store.as_ref(), new).await?;
    Ok((StatusCode::CREATED, Json(CreatedPoll { poll_id: record.id })))
}

/// PUT /api/poll
pub async fn submit_availability(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubmitRequest>,
) -> PollResult<Json<SubmitResponse>> {
    // The viewer's zone only shaped how the client drew the grid.
    if let Some(zone) = req.display_time_zone.as_deref() {
        tracing::debug!(poll_id = %req.poll_id, display_zone = zone, "submission display zone");
    }
    services::submit(
        state.store.as_ref(),
        state.retry,
        &req.poll_id,
        &req.participant_id,
        &req.slot_keys,
    )
    .await?;
    Ok(Json(SubmitResponse { success: true }))
}

/// GET /api/poll?id=
pub async fn get_poll_by_query(
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> PollResult<Json<PollRecord>> {
    Ok(Json(poll::get(state.store.as_ref(), &query.id).await?))
}

/// GET /api/poll/{id}
pub async fn get_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> PollResult<Json<PollRecord>> {
    Ok(Json(poll::get(state.store.as_ref(), &id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub poll_id: String,
    pub base_time_zone: String,
    pub display_time_zone: String,
    pub buckets_per_day: u32,
    pub days: Vec<NaiveDate>,
    pub cells: Vec<LabeledCell>,
}

/// GET /api/poll/{id}/grid?tz=
pub async fn get_grid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ZoneQuery>,
) -> PollResult<Json<GridView>> {
    let record = poll::get(state.store.as_ref(), &id).await?;
    let base = record.base_zone()?;
    let display = match query.tz.as_deref() {
        Some(tz) => slot::parse_zone(Some(tz))?,
        None => base,
    };
    let cells = grid::label_grid(&record.grid()?, display, base)?;

    Ok(Json(GridView {
        poll_id: record.id,
        base_time_zone: record.base_time_zone,
        display_time_zone: display.name().to_string(),
        buckets_per_day: grid::buckets_per_day(&record.daily_window),
        days: record.date_range.days().collect(),
        cells,
    }))
}

/// GET /api/poll/{id}/results?tz=
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ZoneQuery>,
) -> PollResult<Json<HeatMap>> {
    let record = poll::get(state.store.as_ref(), &id).await?;
    let display = match query.tz.as_deref() {
        Some(tz) => slot::parse_zone(Some(tz))?,
        None => record.base_zone()?,
    };
    Ok(Json(aggregate::heat_map(&record, display)?))
}
