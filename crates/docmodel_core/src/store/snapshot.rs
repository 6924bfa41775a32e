//! JSON snapshots of a loaded model.
//!
//! # Responsibility
//! - Capture classifiers and documents in their persisted layout format.
//! - Restore a model from a snapshot through the normal load paths, so
//!   every load-time check still applies.

use crate::config::ModelOptions;
use crate::error::ModelError;
use crate::model::classifier::Classifier;
use crate::model::document::Document;
use crate::schema::hierarchy::Hierarchy;
use crate::store::instance_store::Model;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot read/write failure.
#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Model(ModelError),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "snapshot io failed: {err}"),
            Self::Json(err) => write!(f, "snapshot json is invalid: {err}"),
            Self::Model(err) => write!(f, "snapshot rejected by model: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Model(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ModelError> for SnapshotError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

/// Persisted form of a model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub classifiers: Vec<Classifier>,
    pub documents: Vec<Document>,
}

impl ModelSnapshot {
    /// Rebuilds a model: classifiers first, then documents.
    pub fn restore(self, options: ModelOptions) -> Result<Model, ModelError> {
        let hierarchy = Hierarchy::load_model(self.classifiers)?;
        let mut model = Model::with_options(hierarchy, options);
        model.load_model(self.documents)?;
        Ok(model)
    }
}

impl Model {
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            classifiers: self.hierarchy().classifiers().cloned().collect(),
            documents: self.dump(),
        }
    }
}

pub fn read_snapshot(path: impl AsRef<Path>) -> SnapshotResult<ModelSnapshot> {
    let file = File::open(path.as_ref())?;
    let snapshot: ModelSnapshot = serde_json::from_reader(BufReader::new(file))?;
    info!(
        "event=snapshot_read module=store status=ok classifiers={} documents={}",
        snapshot.classifiers.len(),
        snapshot.documents.len()
    );
    Ok(snapshot)
}

pub fn write_snapshot(path: impl AsRef<Path>, snapshot: &ModelSnapshot) -> SnapshotResult<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    info!(
        "event=snapshot_write module=store status=ok classifiers={} documents={}",
        snapshot.classifiers.len(),
        snapshot.documents.len()
    );
    Ok(())
}

/// Reads a snapshot file and restores it into a model.
pub fn load_snapshot(path: impl AsRef<Path>, options: ModelOptions) -> SnapshotResult<Model> {
    Ok(read_snapshot(path)?.restore(options)?)
}
