//! Represents a registered client and its JSON response shape.

use crate::models::picture::{Picture, PictureView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A client record as stored in the `clients` table.
///
/// `id` is the surrogate key assigned by the database; `client_id` is the
/// caller-supplied external identifier and is unique across all clients.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Client {
    /// Surrogate numeric identifier (DB-assigned, immutable).
    pub id: i64,

    /// External client identifier (caller-assigned, globally unique).
    pub client_id: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,

    pub phone: Option<String>,
    pub dob: Option<String>,

    /// Postal address, stored flattened in the row.
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,

    pub notes: Option<String>,

    /// When this client was registered (UTC, assigned at insert).
    pub created_at: DateTime<Utc>,
}

/// Nested address object as it appears on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// JSON shape returned by the read endpoints: the client row with its
/// address re-nested and the picture list attached.
#[derive(Serialize, Debug)]
pub struct ClientView {
    pub id: i64,
    pub client_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub address: Address,
    pub notes: Option<String>,
    pub pictures: Vec<PictureView>,
    pub created_at: DateTime<Utc>,
}

impl ClientView {
    /// Assemble the response shape from a row and its pictures, resolving
    /// each picture's retrieval URL through `url_for`.
    pub fn new(client: Client, pictures: Vec<Picture>, url_for: impl Fn(&str) -> String) -> Self {
        Self {
            id: client.id,
            client_id: client.client_id,
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone: client.phone,
            dob: client.dob,
            address: Address {
                street: client.street,
                city: client.city,
                state: client.state,
                zip: client.zip_code,
                country: client.country,
            },
            notes: client.notes,
            pictures: pictures
                .into_iter()
                .map(|p| PictureView::new(p, &url_for))
                .collect(),
            created_at: client.created_at,
        }
    }
}
