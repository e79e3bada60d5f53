//! Media evidence metadata
//!
//! Binary content lives outside the service; a media asset only records the
//! external file reference and how it relates to a submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{unknown_value, Audience, Location, SubmissionKind, UserRef};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Photo,
    Video,
    Audio,
}

impl MediaType {
    pub const ALL: [&'static str; 3] = ["photo", "video", "audio"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Photo => "photo",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaType::Photo),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            other => Err(unknown_value("media_type", other, &MediaType::ALL)),
        }
    }
}

/// Reference to a submission by kind and id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRef {
    pub kind: SubmissionKind,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaAsset {
    pub id: i64,
    pub file_ref: String,
    pub media_type: MediaType,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: Option<i64>,
    pub submission: Option<SubmissionRef>,
    #[serde(flatten)]
    pub location: Option<Location>,
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<UserRef>,
    pub is_anonymous: bool,
    /// Set once an administrator has reviewed the asset
    pub is_moderated: bool,
    pub is_approved: bool,
    pub moderation_notes: String,
    pub created_at: DateTime<Utc>,
}

impl MediaAsset {
    /// Copy of the asset suitable for `audience`, with the uploader removed
    /// from anonymous assets shown to non-administrators
    pub fn for_audience(&self, audience: Audience) -> MediaAsset {
        let mut asset = self.clone();
        if self.is_anonymous && audience == Audience::Public {
            asset.uploaded_by = None;
        }
        asset
    }
}
