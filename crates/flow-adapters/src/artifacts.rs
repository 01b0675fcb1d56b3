//! Reportes tipados que dejan los steps.
//!
//! Se serializan a `flow_core::Artifact` vía `ArtifactSpec`; el engine calcula
//! el hash sobre el payload canónico.

use flow_core::{ArtifactKind, ArtifactSpec};
use serde::{Deserialize, Serialize};

use crate::services::{JobState, MovedObject};

/// Objetos encontrados por el sensor y cuántos pokes hicieron falta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListingArtifact {
    pub bucket: String,
    pub prefix: String,
    pub objects: Vec<String>,
    pub pokes: u32,
}

impl ArtifactSpec for ObjectListingArtifact {
    const KIND: ArtifactKind = ArtifactKind::ObjectListing;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceiptArtifact {
    pub job_id: String,
    pub state: JobState,
    pub cluster_name: String,
    pub region: String,
    pub project_id: String,
    pub statements: usize,
}

impl ArtifactSpec for JobReceiptArtifact {
    const KIND: ArtifactKind = ArtifactKind::JobReceipt;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReportArtifact {
    pub command: String,
    pub moved: Vec<MovedObject>,
}

impl ArtifactSpec for CommandReportArtifact {
    const KIND: ArtifactKind = ArtifactKind::CommandReport;
}
