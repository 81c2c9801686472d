//! SQLite-backed bundle persistence.
//!
//! Every artifact is one row of the `artifacts` table, tagged with the
//! schema version it was produced under. [`save`] rewrites all rows in a
//! single transaction; [`load`] refuses to return a bundle unless every
//! artifact is present, current and mutually consistent.
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use super::{BundleError, ModelBundle};
use crate::features::{FeatureSchema, SCHEMA_VERSION};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS artifacts (
    name TEXT PRIMARY KEY,
    schema_version INTEGER NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

pub const CLASSIFIER: &str = "classifier";
pub const BINARY_HEAD: &str = "binary_head";
pub const VECTORIZER: &str = "vectorizer";
pub const LABEL_ENCODER: &str = "label_encoder";
pub const SCHEMA: &str = "schema";

/// Artifact names in the order they are written.
pub const ARTIFACTS: [&str; 5] = [CLASSIFIER, BINARY_HEAD, VECTORIZER, LABEL_ENCODER, SCHEMA];

/// A wrapper around a SQLite connection holding one bundle.
pub struct BundleStore {
    conn: Connection,
}

impl BundleStore {
    /// Open (creating if needed) a bundle store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self, BundleError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Replace the stored bundle. All artifacts are written or none are.
    pub fn write(&mut self, bundle: &ModelBundle) -> Result<(), BundleError> {
        let payloads = ARTIFACTS
            .iter()
            .map(|&name| Ok((name, encode_artifact(bundle, name)?)))
            .collect::<Result<Vec<_>, BundleError>>()?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM artifacts", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO artifacts (name, schema_version, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (name, payload) in &payloads {
                stmt.execute(params![name, bundle.schema_version(), payload, created_at])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read and validate the stored bundle.
    pub fn read(&self) -> Result<ModelBundle, BundleError> {
        let schema: FeatureSchema = self.artifact(SCHEMA)?;
        schema.validate()?;

        let bundle = ModelBundle::new(
            self.artifact(CLASSIFIER)?,
            self.artifact(BINARY_HEAD)?,
            self.artifact(VECTORIZER)?,
            self.artifact(LABEL_ENCODER)?,
            schema,
        )?;
        Ok(bundle)
    }

    /// Names of the artifacts currently stored.
    pub fn artifact_names(&self) -> Result<Vec<String>, BundleError> {
        let mut stmt = self.conn.prepare("SELECT name FROM artifacts ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn artifact<T: DeserializeOwned>(&self, name: &str) -> Result<T, BundleError> {
        let row: Option<(u32, String)> = self
            .conn
            .query_row(
                "SELECT schema_version, payload FROM artifacts WHERE name = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (version, payload) = row.ok_or_else(|| BundleError::MissingArtifact(name.to_string()))?;
        if version != SCHEMA_VERSION {
            return Err(BundleError::VersionMismatch {
                artifact: name.to_string(),
                expected: SCHEMA_VERSION,
                found: version,
            });
        }
        serde_json::from_str(&payload).map_err(|source| BundleError::Corrupt {
            artifact: name.to_string(),
            source,
        })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn encode_artifact(bundle: &ModelBundle, name: &str) -> Result<String, BundleError> {
    match name {
        CLASSIFIER => encode(name, bundle.classifier()),
        BINARY_HEAD => encode(name, bundle.binary_head()),
        VECTORIZER => encode(name, bundle.vectorizer()),
        LABEL_ENCODER => encode(name, bundle.label_encoder()),
        SCHEMA => encode(name, bundle.schema()),
        other => Err(BundleError::MissingArtifact(other.to_string())),
    }
}

fn encode<T: Serialize>(name: &str, artifact: &T) -> Result<String, BundleError> {
    serde_json::to_string(artifact).map_err(|source| BundleError::Encode {
        artifact: name.to_string(),
        source,
    })
}

/// Persist `bundle` to the store at `destination`.
pub fn save(bundle: &ModelBundle, destination: &Path) -> Result<(), BundleError> {
    let mut store = BundleStore::open(destination)?;
    store.write(bundle)?;
    info!(
        "Saved model bundle (schema v{}, {} text columns) to {}",
        bundle.schema_version(),
        bundle.schema().vocabulary_size,
        destination.display()
    );
    Ok(())
}

/// Load the bundle stored at `source`.
pub fn load(source: &Path) -> Result<ModelBundle, BundleError> {
    if !source.exists() {
        return Err(BundleError::NotFound(source.to_path_buf()));
    }
    let bundle = BundleStore::open(source)?.read()?;
    info!(
        "Loaded model bundle from {} ({} classes)",
        source.display(),
        bundle.label_encoder().len()
    );
    Ok(bundle)
}
