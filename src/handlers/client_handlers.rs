//! HTTP handlers for upload grants and the client CRUD surface.
//!
//! Request bodies arrive camelCase per the browser client; responses carry
//! the stored snake_case shape. All storage concerns are delegated to
//! `RegistryService` and its `ObjectStore`.

use crate::{
    errors::AppError,
    models::client::{Address, ClientView},
    services::registry_service::{ClientRecord, NewClient, NewPicture, RegistryService},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Body for `POST /api/get-upload-url`. All fields optional; the defaults
/// mirror what the browser sends when a field is absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub key: String,
}

/// Body for `POST /api/clients`. Picture descriptors reference keys handed
/// out by the upload-grant endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub client_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dob: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub notes: Option<String>,
    #[serde(default)]
    pub pictures: Vec<PictureDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureDescriptor {
    pub key: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

/// POST `/api/get-upload-url` — mint a presigned PUT so the browser uploads
/// the binary straight to the object store.
pub async fn get_upload_url(
    State(registry): State<RegistryService>,
    Json(req): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let file_name = req.file_name.as_deref().unwrap_or("file");
    let file_type = req.file_type.as_deref().unwrap_or("application/octet-stream");
    let client_id = req.client_id.as_deref().unwrap_or("unknown");

    let grant = registry
        .objects
        .presign_upload(file_name, file_type, client_id)
        .await?;

    Ok(Json(UploadUrlResponse {
        upload_url: grant.upload_url,
        key: grant.key,
    }))
}

/// POST `/api/clients` — register a client together with its pictures.
pub async fn create_client(
    State(registry): State<RegistryService>,
    Json(req): Json<CreateClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = registry
        .create_client(NewClient {
            client_id: req.client_id,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            dob: req.dob,
            street: req.address.street,
            city: req.address.city,
            state: req.address.state,
            zip_code: req.address.zip,
            country: req.address.country,
            notes: req.notes,
            pictures: req
                .pictures
                .into_iter()
                .map(|p| NewPicture {
                    key: p.key,
                    file_name: p.file_name,
                    file_type: p.file_type,
                })
                .collect(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Client registered",
            "clientId": record.client.client_id,
            "id": record.client.id,
        })),
    ))
}

/// GET `/api/clients` — every client, newest first.
pub async fn list_clients(
    State(registry): State<RegistryService>,
) -> Result<Json<Vec<ClientView>>, AppError> {
    let records = registry.list_clients().await?;
    let views = records
        .into_iter()
        .map(|record| into_view(&registry, record))
        .collect();
    Ok(Json(views))
}

/// GET `/api/clients/{client_id}` — one client by external identifier.
pub async fn get_client(
    State(registry): State<RegistryService>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientView>, AppError> {
    let record = registry.get_client(&client_id).await?;
    Ok(Json(into_view(&registry, record)))
}

/// DELETE `/api/clients/{client_id}` — remove the client and its pictures,
/// cleaning up stored objects best-effort.
pub async fn delete_client(
    State(registry): State<RegistryService>,
    Path(client_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    registry.delete_client(&client_id).await?;
    Ok(Json(json!({
        "message": format!("Client {} deleted", client_id),
    })))
}

fn into_view(registry: &RegistryService, record: ClientRecord) -> ClientView {
    ClientView::new(record.client, record.pictures, |key| {
        registry.objects.object_url(key)
    })
}
