use crate::{ApiError, ApiResult, AppState};
use api_shared::auth::{
    actor_from_headers, validate_api_key, API_KEY_HEADER, USER_ID_HEADER, USER_NAME_HEADER,
    USER_ROLE_HEADER,
};
use api_shared::dto::{
    AssignDoctorReq, AvailableDoctorQuery, AvailableDoctorRes, CompleteTriageReq, DashboardRes,
    DoctorRes, ErrorRes, HistoryEventRes, HistoryRes, LevelStatsRes, NextPatientRes, PatientRes,
    RegisterArrivalReq, RegisterPatientReq, RosterRes, SearchPatientsQuery, SearchPatientsRes,
    SpecialtyDoctorsRes, TriageRecordRes,
};
use api_shared::health::HealthRes;
use api_shared::HealthService;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use ed_core::{
    Actor, Doctor, DoctorId, NonEmptyText, PatientId, Specialty, TriageId, UrgencyLevel,
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn require_api_key(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    validate_api_key(header(headers, API_KEY_HEADER), &state.api_key)?;
    Ok(())
}

/// API key check plus the acting user from the `x-user-*` headers.
fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Actor> {
    require_api_key(state, headers)?;
    Ok(actor_from_headers(
        header(headers, USER_ID_HEADER),
        header(headers, USER_NAME_HEADER),
        header(headers, USER_ROLE_HEADER),
    )?)
}

fn parse_triage_id(raw: &str) -> ApiResult<TriageId> {
    TriageId::parse(raw.trim()).map_err(|err| ApiError::bad_request(err.to_string()))
}

fn parse_specialty(raw: &str) -> ApiResult<Specialty> {
    Specialty::new(raw).map_err(|err| ApiError::bad_request(err.to_string()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the service. Used for monitoring and load balancer
/// health checks; needs no API key.
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = RegisterPatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Blank name", body = ErrorRes),
        (status = 401, description = "Missing credentials", body = ErrorRes),
        (status = 403, description = "Role may not register patients", body = ErrorRes)
    )
)]
/// Register a new patient and add them to the name index.
///
/// # Errors
/// Returns `400 Bad Request` if the name is blank, `401` without valid credentials and `403` if
/// the acting role may not register patients.
#[axum::debug_handler]
pub(crate) async fn register_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterPatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let actor = authenticate(&state, &headers)?;
    let patient = state.service.register_patient(&actor, &req.name)?;
    Ok((StatusCode::CREATED, Json(PatientRes::from(&patient))))
}

#[utoipa::path(
    get,
    path = "/patients",
    params(SearchPatientsQuery),
    responses(
        (status = 200, description = "Matching patients in name order", body = SearchPatientsRes)
    )
)]
/// Search patients by name. A blank query matches nobody.
pub(crate) async fn search_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchPatientsQuery>,
) -> ApiResult<Json<SearchPatientsRes>> {
    require_api_key(&state, &headers)?;
    let patients = state
        .service
        .search_patients(&query.q, query.mode.into())
        .iter()
        .map(PatientRes::from)
        .collect();
    Ok(Json(SearchPatientsRes { patients }))
}

#[utoipa::path(
    post,
    path = "/triage/arrivals",
    request_body = RegisterArrivalReq,
    responses(
        (status = 201, description = "Arrival registered", body = TriageRecordRes),
        (status = 400, description = "Malformed patient id or folio", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Register a patient's arrival at the emergency department
///
/// Creates a triage record in state `awaiting intake`. When no folio is supplied the next one
/// of the day is generated.
#[axum::debug_handler]
pub(crate) async fn register_arrival(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterArrivalReq>,
) -> ApiResult<(StatusCode, Json<TriageRecordRes>)> {
    let actor = authenticate(&state, &headers)?;
    let patient_id = PatientId::parse(req.patient_id.trim())
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let record = state
        .service
        .register_arrival(&actor, patient_id, req.folio.as_deref())?;
    Ok((StatusCode::CREATED, Json(TriageRecordRes::from(&record))))
}

#[utoipa::path(
    get,
    path = "/triage/{id}",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "The persisted record", body = TriageRecordRes),
        (status = 404, description = "Unknown record", body = ErrorRes)
    )
)]
pub(crate) async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<TriageRecordRes>> {
    require_api_key(&state, &headers)?;
    let record = state.service.record(&parse_triage_id(&id)?)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/triage/folio/{folio}",
    params(("folio" = String, Path, description = "Folio of a queued record")),
    responses(
        (status = 200, description = "The queued record", body = TriageRecordRes),
        (status = 404, description = "No queued record has this folio", body = ErrorRes)
    )
)]
/// Look up a queued record by folio.
pub(crate) async fn find_by_folio(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(folio): AxumPath<String>,
) -> ApiResult<Json<TriageRecordRes>> {
    require_api_key(&state, &headers)?;
    state
        .service
        .queue()
        .find_by_folio(&folio)
        .map(|record| Json(TriageRecordRes::from(&record)))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("no queued folio '{folio}'")))
}

#[utoipa::path(
    post,
    path = "/triage/{id}/intake",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "Intake started", body = TriageRecordRes),
        (status = 409, description = "Record is past intake", body = ErrorRes)
    )
)]
pub(crate) async fn begin_intake(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<TriageRecordRes>> {
    let actor = authenticate(&state, &headers)?;
    let record = state.service.begin_intake(&actor, parse_triage_id(&id)?)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    post,
    path = "/triage/{id}/complete",
    params(("id" = String, Path, description = "Triage record id")),
    request_body = CompleteTriageReq,
    responses(
        (status = 200, description = "Triage completed and patient queued", body = TriageRecordRes),
        (status = 400, description = "Unknown urgency level or blank specialty", body = ErrorRes),
        (status = 404, description = "Unknown record", body = ErrorRes),
        (status = 409, description = "Record already triaged or queued", body = ErrorRes)
    )
)]
/// Complete triage for a record
///
/// Assigns the urgency level (and optionally a specialty) and adds the patient to the queue.
///
/// # Errors
/// Returns `409 Conflict` if the record is no longer awaiting triage or its folio is already
/// queued.
#[axum::debug_handler]
pub(crate) async fn complete_triage(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<CompleteTriageReq>,
) -> ApiResult<Json<TriageRecordRes>> {
    let actor = authenticate(&state, &headers)?;
    let id = parse_triage_id(&id)?;
    let level = req.urgency.parse::<UrgencyLevel>()?;
    let specialty = req
        .specialty
        .as_deref()
        .map(Specialty::new)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let record = state
        .service
        .complete_triage(&actor, id, level, specialty)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    post,
    path = "/triage/{id}/call",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "Patient called for attention", body = TriageRecordRes),
        (status = 404, description = "Unknown record", body = ErrorRes),
        (status = 409, description = "Record is not queued", body = ErrorRes)
    )
)]
pub(crate) async fn call_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<TriageRecordRes>> {
    let actor = authenticate(&state, &headers)?;
    let record = state.service.call_patient(&actor, parse_triage_id(&id)?)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    post,
    path = "/triage/{id}/finish",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "Attention completed", body = TriageRecordRes),
        (status = 409, description = "Patient is not in attention", body = ErrorRes)
    )
)]
pub(crate) async fn complete_attention(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<TriageRecordRes>> {
    let actor = authenticate(&state, &headers)?;
    let record = state
        .service
        .complete_attention(&actor, parse_triage_id(&id)?)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/triage/next",
    responses(
        (status = 200, description = "Next acute patient, without removing them", body = NextPatientRes)
    )
)]
/// Peek at who is next in acute care.
pub(crate) async fn next_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<NextPatientRes>> {
    require_api_key(&state, &headers)?;
    Ok(Json(state.service.queue().next_patient().into()))
}

#[utoipa::path(
    post,
    path = "/triage/next/call",
    responses(
        (status = 200, description = "Patient called, or null when nobody is waiting", body = NextPatientRes)
    )
)]
/// Call the next acute patient for attention
///
/// Removes the most severe, earliest queued patient from the queue and marks them in attention.
/// Concurrent callers never receive the same patient.
pub(crate) async fn call_next(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<NextPatientRes>> {
    let actor = authenticate(&state, &headers)?;
    Ok(Json(state.service.call_next(&actor)?.into()))
}

#[utoipa::path(
    post,
    path = "/triage/ambulatory/next",
    responses(
        (status = 200, description = "Ambulatory patient called, or null", body = NextPatientRes)
    )
)]
pub(crate) async fn call_next_ambulatory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<NextPatientRes>> {
    let actor = authenticate(&state, &headers)?;
    Ok(Json(state.service.call_next_ambulatory(&actor)?.into()))
}

#[utoipa::path(
    get,
    path = "/triage/{id}/history",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "Events in the order they happened", body = HistoryRes)
    )
)]
pub(crate) async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<HistoryRes>> {
    require_api_key(&state, &headers)?;
    let events = state
        .service
        .history_for(&parse_triage_id(&id)?)
        .iter()
        .map(HistoryEventRes::from)
        .collect();
    Ok(Json(HistoryRes { events }))
}

#[utoipa::path(
    get,
    path = "/triage/stats",
    responses(
        (status = 200, description = "Queued patients per urgency level", body = LevelStatsRes)
    )
)]
pub(crate) async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<LevelStatsRes>> {
    require_api_key(&state, &headers)?;
    Ok(Json(state.service.queue().stats_per_level().into()))
}

#[utoipa::path(
    get,
    path = "/triage/dashboard",
    responses(
        (status = 200, description = "Consistent snapshot of the queue", body = DashboardRes)
    )
)]
/// Everything a dashboard refresh needs, read in one consistent snapshot.
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DashboardRes>> {
    require_api_key(&state, &headers)?;
    let snapshot = state.service.snapshot(Utc::now());
    Ok(Json(DashboardRes::from(&snapshot)))
}

#[utoipa::path(
    get,
    path = "/roster",
    responses(
        (status = 200, description = "Active doctors per specialty", body = RosterRes)
    )
)]
pub(crate) async fn roster(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<RosterRes>> {
    require_api_key(&state, &headers)?;
    let specialties = state
        .service
        .roster_overview()
        .iter()
        .map(SpecialtyDoctorsRes::from)
        .collect();
    Ok(Json(RosterRes { specialties }))
}

#[utoipa::path(
    get,
    path = "/roster/{specialty}",
    params(("specialty" = String, Path, description = "Specialty name, case-insensitive")),
    responses(
        (status = 200, description = "Active doctors in registration order", body = SpecialtyDoctorsRes)
    )
)]
pub(crate) async fn doctors_for(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(specialty): AxumPath<String>,
) -> ApiResult<Json<SpecialtyDoctorsRes>> {
    require_api_key(&state, &headers)?;
    let specialty = parse_specialty(&specialty)?;
    let doctors = state.service.doctors_for(&specialty);
    Ok(Json(SpecialtyDoctorsRes::from(&(specialty, doctors))))
}

#[utoipa::path(
    post,
    path = "/roster/{specialty}/doctors",
    params(("specialty" = String, Path, description = "Specialty name, case-insensitive")),
    request_body = AssignDoctorReq,
    responses(
        (status = 200, description = "Doctor registered or updated", body = DoctorRes),
        (status = 400, description = "Blank name or malformed doctor id", body = ErrorRes),
        (status = 403, description = "Role may not manage the roster", body = ErrorRes)
    )
)]
/// Register a doctor for a specialty
///
/// Sending an existing doctor id replaces that entry in place, e.g. `"active": false` to take
/// the doctor off the roster without losing their position.
#[axum::debug_handler]
pub(crate) async fn assign_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(specialty): AxumPath<String>,
    Json(req): Json<AssignDoctorReq>,
) -> ApiResult<Json<DoctorRes>> {
    let actor = authenticate(&state, &headers)?;
    let specialty = parse_specialty(&specialty)?;
    let id = match req.id.as_deref() {
        Some(raw) => {
            DoctorId::parse(raw.trim()).map_err(|err| ApiError::bad_request(err.to_string()))?
        }
        None => DoctorId::new(),
    };
    let doctor = Doctor {
        id,
        name: NonEmptyText::new(&req.name).map_err(|err| ApiError::bad_request(err.to_string()))?,
        active: req.active,
    };

    let res = DoctorRes::from(&doctor);
    state.service.assign_doctor(&actor, specialty, doctor)?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/roster/{specialty}/available",
    params(
        ("specialty" = String, Path, description = "Specialty name, case-insensitive"),
        AvailableDoctorQuery
    ),
    responses(
        (status = 200, description = "First free doctor, or null", body = AvailableDoctorRes),
        (status = 400, description = "Malformed date or time", body = ErrorRes)
    )
)]
/// First active doctor of the specialty that the scheduling calendar reports free for the slot.
pub(crate) async fn available_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(specialty): AxumPath<String>,
    Query(query): Query<AvailableDoctorQuery>,
) -> ApiResult<Json<AvailableDoctorRes>> {
    require_api_key(&state, &headers)?;
    let specialty = parse_specialty(&specialty)?;
    let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .map_err(|err| ApiError::bad_request(format!("invalid date '{}': {err}", query.date)))?;
    let time = NaiveTime::parse_from_str(query.time.trim(), "%H:%M")
        .map_err(|err| ApiError::bad_request(format!("invalid time '{}': {err}", query.time)))?;

    let doctor = state
        .service
        .pick_doctor(&specialty, date, time, state.availability.as_ref());
    Ok(Json(AvailableDoctorRes {
        doctor: doctor.as_ref().map(DoctorRes::from),
    }))
}
