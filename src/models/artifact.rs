use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::offer::Leg;

/// A physical scan event marking arrival at a lifecycle milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    PickedUp,
    Received,
    Ready,
    Delivered,
}

/// Where a stored photo came from: a checkpoint scan, or an ad-hoc
/// issue report outside the checkpoint vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoTag {
    PickedUp,
    Received,
    Ready,
    Delivered,
    Issue,
}

impl From<Checkpoint> for PhotoTag {
    fn from(checkpoint: Checkpoint) -> Self {
        match checkpoint {
            Checkpoint::PickedUp => PhotoTag::PickedUp,
            Checkpoint::Received => PhotoTag::Received,
            Checkpoint::Ready => PhotoTag::Ready,
            Checkpoint::Delivered => PhotoTag::Delivered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactKind {
    Signature { leg: Leg },
    Photo { tag: PhotoTag },
}

/// A photo or signature captured alongside a scan. Each photo in a
/// multi-photo scan is stored as its own artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: ArtifactKind,
    pub data: String,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}
