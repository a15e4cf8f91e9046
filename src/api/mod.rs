//! REST API over the server-side notes table.
//!
//! - `GET    /notes?title=&limit=&offset=`
//! - `POST   /notes`
//! - `PUT    /notes/{id}`
//! - `DELETE /notes/{id}`

mod repository;

pub use repository::{ListQuery, NoteInput, NoteRepository, NoteRow};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;

use crate::error::CarnetError;

const NOT_FOUND_MESSAGE: &str = "Note non trouvée";
const DELETED_MESSAGE: &str = "Note supprimée avec succès";

/// Handler failure. Storage problems are logged and answered with a bare 500.
pub enum ApiError {
    NotFound,
    Server(CarnetError),
}

impl From<CarnetError> for ApiError {
    fn from(e: CarnetError) -> Self {
        ApiError::Server(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": NOT_FOUND_MESSAGE }))).into_response()
            }
            ApiError::Server(e) => {
                tracing::error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
            }
        }
    }
}

type AppState = Arc<NoteRepository>;

pub fn router(repository: Arc<NoteRepository>) -> Router {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", put(update_note).delete(delete_note))
        .with_state(repository)
}

async fn list_notes(
    State(repo): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<NoteRow>>, ApiError> {
    Ok(Json(repo.list(&query).await?))
}

async fn create_note(
    State(repo): State<AppState>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<NoteRow>), ApiError> {
    let row = repo.create(&input).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update_note(
    State(repo): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> Result<Json<NoteRow>, ApiError> {
    repo.update(id, &input)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_note(
    State(repo): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let row = repo.delete(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "message": DELETED_MESSAGE, "note": row })))
}

/// Bind `0.0.0.0:<port>` and serve until ctrl-c.
pub async fn serve(repository: NoteRepository, port: u16) -> crate::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "REST API listening");
    eprintln!("Serveur démarré sur le port {}", port);

    axum::serve(listener, router(Arc::new(repository)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
