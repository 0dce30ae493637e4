use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::{
    error::AppError,
    model::{Population, RESERVED_KEYS, Response},
    state::AppState,
};

pub async fn submit_student_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    submit(state, Population::Students, &headers, body).await
}

pub async fn submit_professor_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    submit(state, Population::Professors, &headers, body).await
}

async fn submit(
    state: Arc<AppState>,
    population: Population,
    headers: &HeaderMap,
    mut answers: Map<String, Value>,
) -> Result<Json<Value>, AppError> {
    if answers.is_empty() {
        return Err(AppError::MalformedPayload);
    }

    let completion_time = answers.remove("completionTime").unwrap_or(Value::Null);
    for key in RESERVED_KEYS {
        answers.remove(key);
    }

    let response = Response {
        id: state.store.next_id().await?,
        submitted_at: Utc::now(),
        origin: client_origin(headers),
        completion_time,
        submitted: true,
        answers,
    };

    let total = state.store.append(population, &response).await?;
    info!(
        "Stored {} response {} ({} total)",
        population.as_str(),
        response.id,
        total
    );

    // The record is durable at this point. A snapshot failure must not fail
    // the write, the next write or read recomputes it.
    if let Err(e) = state.refresh_snapshot().await {
        warn!("Snapshot refresh after response {} failed: {e}", response.id);
    }

    let (message, total_key) = match population {
        Population::Students => ("Student survey saved", "totalStudents"),
        Population::Professors => ("Professor survey saved", "totalProfessors"),
    };

    let mut reply = json!({
        "success": true,
        "message": message,
        "id": response.id,
        "timestamp": response.submitted_at,
    });
    reply[total_key] = json!(total);

    Ok(Json(reply))
}

pub async fn all_data_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let students = state.store.load(Population::Students).await?;
    let professors = state.store.load(Population::Professors).await?;
    let (student_count, professor_count) = (students.len(), professors.len());

    Ok(Json(json!({
        "success": true,
        "students": students,
        "professors": professors,
        "totals": {
            "students": student_count,
            "professors": professor_count,
            "total": student_count + professor_count,
        },
        "lastUpdated": Utc::now(),
    })))
}

pub async fn results_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let students = state.store.load(Population::Students).await?;
    let professors = state.store.load(Population::Professors).await?;
    let (student_count, professor_count) = (students.len(), professors.len());

    Ok(Json(json!({
        "students": students,
        "professors": professors,
        "totals": {
            "students": student_count,
            "professors": professor_count,
            "total": student_count + professor_count,
        },
    })))
}

pub async fn analysis_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let persisted = match state.store.load_snapshot().await? {
        Some(persisted) => persisted,
        None => state.refresh_snapshot().await?,
    };

    let mut reply = serde_json::to_value(&persisted)?;
    reply["success"] = json!(true);

    Ok(Json(reply))
}

pub async fn export_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let students = state.store.load(Population::Students).await?;
    let professors = state.store.load(Population::Professors).await?;

    let (student_count, professor_count) = (students.len(), professors.len());
    let document = json!({
        "exportDate": Utc::now(),
        "project": "LMS Research Survey",
        "students": students,
        "professors": professors,
        "summary": {
            "totalStudents": student_count,
            "totalProfessors": professor_count,
            "totalParticipants": student_count + professor_count,
        },
    });

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"lms-survey-data.json\"",
            ),
        ],
        serde_json::to_string_pretty(&document)?,
    ))
}

pub async fn keep_alive_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let (students, professors) = state.store.counts().await?;

    Ok(Json(json!({
        "status": "active",
        "timestamp": Utc::now(),
        "uptime": state.uptime_secs(),
        "database": {
            "students": students,
            "professors": professors,
            "total": students + professors,
        },
    })))
}

pub async fn system_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let (students, professors) = state.store.counts().await?;

    Ok(Json(json!({
        "system": "LMS Research Survey System",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "timestamp": Utc::now(),
        "uptime": state.uptime_secs(),
        "dataStats": {
            "students": students,
            "professors": professors,
            "totalParticipants": students + professors,
        },
        "endpoints": [
            { "path": "/api/survey/student", "method": "POST", "description": "Submit a student survey" },
            { "path": "/api/survey/professor", "method": "POST", "description": "Submit a professor survey" },
            { "path": "/api/data/all", "method": "GET", "description": "All raw responses" },
            { "path": "/api/analysis", "method": "GET", "description": "Aggregated statistics" },
            { "path": "/api/results", "method": "GET", "description": "Dashboard results" },
            { "path": "/api/export/json", "method": "GET", "description": "Export all data" },
            { "path": "/keep-alive", "method": "GET", "description": "Liveness check" },
            { "path": "/system-status", "method": "GET", "description": "Service status" },
        ],
    })))
}

fn client_origin(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
