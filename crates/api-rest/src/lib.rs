//! # API REST
//!
//! REST API implementation for ED triage.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status code mapping)
//!
//! Uses `api-shared` for wire types and authentication. Every route except `/health` requires
//! the `x-api-key` header; mutating routes additionally need the `x-user-*` identity headers.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use axum::{
    routing::{get, post},
    Router,
};
use ed_core::{DoctorAvailability, TriageService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::dto;
use api_shared::health::HealthRes;

/// Application state for the REST API server
///
/// Contains shared state that needs to be accessible to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TriageService>,
    /// Expected value of the `x-api-key` header, resolved at startup.
    pub api_key: Arc<str>,
    /// Scheduling calendar consulted by `/roster/{specialty}/available`.
    pub availability: Arc<dyn DoctorAvailability + Send + Sync>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::register_patient,
        handlers::search_patients,
        handlers::register_arrival,
        handlers::get_record,
        handlers::find_by_folio,
        handlers::begin_intake,
        handlers::complete_triage,
        handlers::call_patient,
        handlers::complete_attention,
        handlers::next_patient,
        handlers::call_next,
        handlers::call_next_ambulatory,
        handlers::history,
        handlers::stats,
        handlers::dashboard,
        handlers::roster,
        handlers::doctors_for,
        handlers::assign_doctor,
        handlers::available_doctor,
    ),
    components(schemas(
        HealthRes,
        dto::ErrorRes,
        dto::RegisterPatientReq,
        dto::PatientRes,
        dto::SearchModeParam,
        dto::SearchPatientsRes,
        dto::RegisterArrivalReq,
        dto::CompleteTriageReq,
        dto::TriageRecordRes,
        dto::NextPatientRes,
        dto::HistoryEventRes,
        dto::HistoryRes,
        dto::LevelStatsRes,
        dto::LevelEstimateRes,
        dto::DashboardRes,
        dto::AssignDoctorReq,
        dto::DoctorRes,
        dto::SpecialtyDoctorsRes,
        dto::RosterRes,
        dto::AvailableDoctorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::search_patients).post(handlers::register_patient),
        )
        .route("/triage/arrivals", post(handlers::register_arrival))
        .route("/triage/next", get(handlers::next_patient))
        .route("/triage/next/call", post(handlers::call_next))
        .route(
            "/triage/ambulatory/next",
            post(handlers::call_next_ambulatory),
        )
        .route("/triage/stats", get(handlers::stats))
        .route("/triage/dashboard", get(handlers::dashboard))
        .route("/triage/folio/:folio", get(handlers::find_by_folio))
        .route("/triage/:id", get(handlers::get_record))
        .route("/triage/:id/intake", post(handlers::begin_intake))
        .route("/triage/:id/complete", post(handlers::complete_triage))
        .route("/triage/:id/call", post(handlers::call_patient))
        .route("/triage/:id/finish", post(handlers::complete_attention))
        .route("/triage/:id/history", get(handlers::history))
        .route("/roster", get(handlers::roster))
        .route("/roster/:specialty", get(handlers::doctors_for))
        .route("/roster/:specialty/doctors", post(handlers::assign_doctor))
        .route("/roster/:specialty/available", get(handlers::available_doctor))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
