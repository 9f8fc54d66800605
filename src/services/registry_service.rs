//! src/services/registry_service.rs
//!
//! RegistryService — the CRUD surface over clients and their pictures.
//! Client and picture rows live in SQLite; picture binaries live in the
//! object store and are referenced by key. A client and its pictures are
//! written in one transaction and removed together; object cleanup on
//! delete is best-effort only and never blocks row removal.

use crate::models::{client::Client, picture::Picture};
use crate::services::object_store::ObjectStore;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("client id `{0}` already exists")]
    DuplicateClientId(String),
    #[error("client `{0}` not found")]
    ClientNotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Input for a registration call. Picture descriptors carry keys previously
/// obtained from the upload-grant endpoint; nothing verifies the referenced
/// objects actually exist.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub client_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub pictures: Vec<NewPicture>,
}

#[derive(Debug, Clone)]
pub struct NewPicture {
    pub key: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

/// A client row together with its owned picture rows.
#[derive(Debug)]
pub struct ClientRecord {
    pub client: Client,
    pub pictures: Vec<Picture>,
}

const CLIENT_COLUMNS: &str = "id, client_id, first_name, last_name, email, phone, dob, \
     street, city, state, zip_code, country, notes, created_at";

const PICTURE_COLUMNS: &str = "id, client_id, s3_key, file_name, file_type, uploaded_at";

/// RegistryService provides the client CRUD operations:
/// - create a client together with its picture rows (one transaction)
/// - list all clients, newest first
/// - fetch one client by external identifier
/// - delete a client, cascading to picture rows, with best-effort object
///   cleanup in the store
#[derive(Clone)]
pub struct RegistryService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Shared object store handle, used for cleanup and retrieval URLs.
    pub objects: ObjectStore,
}

impl RegistryService {
    pub fn new(db: Arc<SqlitePool>, objects: ObjectStore) -> Self {
        Self { db, objects }
    }

    /// Create the schema if it does not exist yet.
    ///
    /// Executes the embedded migration file statement-by-statement, the same
    /// way at startup and in tests.
    pub async fn init_schema(db: &SqlitePool) -> RegistryResult<()> {
        let sql = include_str!("../../migrations/0001_init.sql");
        for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(db).await?;
        }
        Ok(())
    }

    /// Register a client and attach its picture rows atomically.
    ///
    /// The external `client_id` uniqueness is enforced by the UNIQUE
    /// constraint, not by a prior lookup, so concurrent creators racing on
    /// the same identifier are serialized by the database: the second
    /// committer gets `DuplicateClientId` and writes nothing.
    pub async fn create_client(&self, new: NewClient) -> RegistryResult<ClientRecord> {
        let mut tx = self.db.begin().await?;
        let now = Utc::now();

        let insert = sqlx::query_as::<_, Client>(&format!(
            "INSERT INTO clients \
                 (client_id, first_name, last_name, email, phone, dob, \
                  street, city, state, zip_code, country, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(&new.client_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.dob)
        .bind(&new.street)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.zip_code)
        .bind(&new.country)
        .bind(&new.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        let client = match insert {
            Ok(client) => client,
            Err(err) if is_unique_violation(&err) => {
                return Err(RegistryError::DuplicateClientId(new.client_id));
            }
            Err(err) => return Err(err.into()),
        };

        // The generated surrogate id is visible inside the transaction, so
        // picture rows attach before anything is observable to readers.
        let mut pictures = Vec::with_capacity(new.pictures.len());
        for pic in &new.pictures {
            let row = sqlx::query_as::<_, Picture>(&format!(
                "INSERT INTO client_pictures \
                     (client_id, s3_key, file_name, file_type, uploaded_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 RETURNING {PICTURE_COLUMNS}"
            ))
            .bind(client.id)
            .bind(&pic.key)
            .bind(&pic.file_name)
            .bind(&pic.file_type)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            pictures.push(row);
        }

        tx.commit().await?;

        debug!(
            client_id = %client.client_id,
            pictures = pictures.len(),
            "client registered"
        );

        Ok(ClientRecord { client, pictures })
    }

    /// All clients, most recently created first, each with its pictures.
    pub async fn list_clients(&self) -> RegistryResult<Vec<ClientRecord>> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.db)
        .await?;

        let mut records = Vec::with_capacity(clients.len());
        for client in clients {
            let pictures = self.fetch_pictures(client.id).await?;
            records.push(ClientRecord { client, pictures });
        }
        Ok(records)
    }

    /// One client by external identifier, with pictures.
    pub async fn get_client(&self, client_id: &str) -> RegistryResult<ClientRecord> {
        let client = self.fetch_client(client_id).await?;
        let pictures = self.fetch_pictures(client.id).await?;
        Ok(ClientRecord { client, pictures })
    }

    /// Delete a client and everything it owns.
    ///
    /// Object-store deletions come first and are best-effort: individual
    /// failures are logged and swallowed so that store unavailability never
    /// blocks row removal. Deleting the client row cascades to its picture
    /// rows via the schema foreign key. Orphaned objects may remain in the
    /// store after a successful return.
    pub async fn delete_client(&self, client_id: &str) -> RegistryResult<()> {
        let client = self.fetch_client(client_id).await?;
        let pictures = self.fetch_pictures(client.id).await?;

        for pic in &pictures {
            if let Err(err) = self.objects.delete_object(&pic.s3_key).await {
                warn!(key = %pic.s3_key, error = %err, "object cleanup failed, continuing");
            }
        }

        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(client.id)
            .execute(&*self.db)
            .await?;

        debug!(client_id = %client_id, pictures = pictures.len(), "client deleted");
        Ok(())
    }

    async fn fetch_client(&self, client_id: &str) -> RegistryResult<Client> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = ?"
        ))
        .bind(client_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RegistryError::ClientNotFound(client_id.to_string()),
            other => RegistryError::Sqlx(other),
        })
    }

    async fn fetch_pictures(&self, client_pk: i64) -> RegistryResult<Vec<Picture>> {
        Ok(sqlx::query_as::<_, Picture>(&format!(
            "SELECT {PICTURE_COLUMNS} FROM client_pictures WHERE client_id = ? ORDER BY id ASC"
        ))
        .bind(client_pk)
        .fetch_all(&*self.db)
        .await?)
    }
}

/// Return true if the SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::ClientView;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::Client as S3Client;
    use aws_sdk_s3::config::{Credentials, Region, retry::RetryConfig};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    /// In-memory pool capped at one connection so every query sees the same
    /// database.
    async fn test_db() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        RegistryService::init_schema(&pool).await.unwrap();
        Arc::new(pool)
    }

    /// Object store pointed at an unreachable endpoint: every store call
    /// fails fast, which is exactly what the best-effort paths must survive.
    fn unreachable_store() -> ObjectStore {
        let conf = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "static"))
            .endpoint_url("http://127.0.0.1:1")
            .retry_config(RetryConfig::disabled())
            .build();
        ObjectStore::with_client(S3Client::from_conf(conf), "registry-test")
    }

    async fn test_registry() -> RegistryService {
        RegistryService::new(test_db().await, unreachable_store())
    }

    fn sample_client(client_id: &str) -> NewClient {
        NewClient {
            client_id: client_id.to_string(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: Some("555-0100".into()),
            dob: None,
            street: Some("1 Main St".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            zip_code: Some("62701".into()),
            country: Some("US".into()),
            notes: None,
            pictures: vec![
                NewPicture {
                    key: format!("clients/{client_id}/aaa_front.png"),
                    file_name: Some("front.png".into()),
                    file_type: Some("image/png".into()),
                },
                NewPicture {
                    key: format!("clients/{client_id}/bbb_back.png"),
                    file_name: Some("back.png".into()),
                    file_type: Some("image/png".into()),
                },
            ],
        }
    }

    async fn picture_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM client_pictures")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_attaches_all_pictures_atomically() {
        let registry = test_registry().await;
        let record = registry.create_client(sample_client("C1")).await.unwrap();

        assert_eq!(record.pictures.len(), 2);
        assert!(record.pictures.iter().all(|p| p.client_id == record.client.id));

        let fetched = registry.get_client("C1").await.unwrap();
        let keys: Vec<&str> = fetched.pictures.iter().map(|p| p.s3_key.as_str()).collect();
        assert_eq!(keys, ["clients/C1/aaa_front.png", "clients/C1/bbb_back.png"]);
    }

    #[tokio::test]
    async fn duplicate_client_id_fails_with_no_side_effects() {
        let registry = test_registry().await;
        registry.create_client(sample_client("C1")).await.unwrap();
        let before = picture_count(&registry.db).await;

        let err = registry.create_client(sample_client("C1")).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateClientId(id) if id == "C1"));

        assert_eq!(registry.list_clients().await.unwrap().len(), 1);
        assert_eq!(picture_count(&registry.db).await, before);
    }

    #[tokio::test]
    async fn get_unknown_client_is_not_found() {
        let registry = test_registry().await;
        let err = registry.get_client("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::ClientNotFound(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_picture_rows() {
        let registry = test_registry().await;
        let record = registry.create_client(sample_client("C1")).await.unwrap();
        let client_pk = record.client.id;

        registry.delete_client("C1").await.unwrap();

        let err = registry.get_client("C1").await.unwrap_err();
        assert!(matches!(err, RegistryError::ClientNotFound(_)));

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM client_pictures WHERE client_id = ?")
                .bind(client_pk)
                .fetch_one(&*registry.db)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn delete_succeeds_even_when_object_store_is_down() {
        // The test store's endpoint refuses every connection, so each
        // per-picture cleanup call fails; row removal must proceed anyway.
        let registry = test_registry().await;
        registry.create_client(sample_client("C1")).await.unwrap();

        registry.delete_client("C1").await.unwrap();
        assert!(registry.list_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_client_is_not_found() {
        let registry = test_registry().await;
        let err = registry.delete_client("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::ClientNotFound(_)));
    }

    #[tokio::test]
    async fn address_round_trips_through_get() {
        let registry = test_registry().await;
        registry.create_client(sample_client("C1")).await.unwrap();

        let record = registry.get_client("C1").await.unwrap();
        let view = ClientView::new(record.client, record.pictures, |key| {
            registry.objects.object_url(key)
        });

        assert_eq!(view.address.street.as_deref(), Some("1 Main St"));
        assert_eq!(view.address.city.as_deref(), Some("Springfield"));
        assert_eq!(view.address.state.as_deref(), Some("IL"));
        assert_eq!(view.address.zip.as_deref(), Some("62701"));
        assert_eq!(view.address.country.as_deref(), Some("US"));
        assert_eq!(view.pictures.len(), 2);
        assert!(view.pictures[0].url.ends_with("clients/C1/aaa_front.png"));
    }

    #[tokio::test]
    async fn list_orders_by_creation_time_descending() {
        let registry = test_registry().await;
        for id in ["C1", "C2", "C3"] {
            registry.create_client(sample_client(id)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let records = registry.list_clients().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.client.client_id.as_str()).collect();
        assert_eq!(ids, ["C3", "C2", "C1"]);
    }
}
