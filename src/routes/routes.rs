//! Defines routes for the client registration API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /health` — liveness with server time
//!   - `GET    /readyz` — readiness (DB connectivity)
//!
//! - **Upload grants**
//!   - `POST   /api/get-upload-url` — presigned PUT for a fresh object key
//!
//! - **Clients**
//!   - `POST   /api/clients` — register client + picture metadata
//!   - `GET    /api/clients` — list all clients, newest first
//!   - `GET    /api/clients/{client_id}` — fetch one client
//!   - `DELETE /api/clients/{client_id}` — delete client, cascade pictures

use crate::{
    handlers::{
        client_handlers::{create_client, delete_client, get_client, get_upload_url, list_clients},
        health_handlers::{health, readyz},
    },
    services::registry_service::RegistryService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all registry routes.
///
/// The router carries shared state (`RegistryService`) to all handlers.
pub fn routes() -> Router<RegistryService> {
    Router::new()
        // probes (mounted at root)
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        // upload grants
        .route("/api/get-upload-url", post(get_upload_url))
        // client CRUD
        .route("/api/clients", post(create_client).get(list_clients))
        .route(
            "/api/clients/{client_id}",
            get(get_client).delete(delete_client),
        )
}
