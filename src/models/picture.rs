//! Represents a picture attached to a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A picture row from the `client_pictures` table.
///
/// The row holds metadata only; the binary lives in the object store under
/// `s3_key`. Pictures are owned by exactly one client and are created and
/// destroyed with it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Picture {
    /// Surrogate numeric identifier.
    pub id: i64,

    /// Foreign key to the owning client's surrogate id.
    pub client_id: i64,

    /// Object-store key referencing the uploaded binary.
    pub s3_key: String,

    /// Original filename as supplied by the uploader.
    pub file_name: Option<String>,

    /// Declared MIME type.
    pub file_type: Option<String>,

    /// When the row was attached (UTC).
    pub uploaded_at: DateTime<Utc>,
}

/// JSON shape for a picture in responses, including the derived retrieval
/// URL. The URL is computed from bucket + key and never persisted.
#[derive(Serialize, Debug)]
pub struct PictureView {
    pub id: i64,
    pub s3_key: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub url: String,
}

impl PictureView {
    pub fn new(picture: Picture, url_for: impl Fn(&str) -> String) -> Self {
        let url = url_for(&picture.s3_key);
        Self {
            id: picture.id,
            s3_key: picture.s3_key,
            file_name: picture.file_name,
            file_type: picture.file_type,
            url,
        }
    }
}
