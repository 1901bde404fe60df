use serde::{Deserialize, Serialize};

use crate::ErrorInfo;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DriftReviewStatus {
    #[default]
    Pending,
    Accepted,
    Ignored,
}

impl DriftReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftReviewStatus::Pending => "pending",
            DriftReviewStatus::Accepted => "accepted",
            DriftReviewStatus::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DriftReviewStatus::Pending),
            "accepted" => Some(DriftReviewStatus::Accepted),
            "ignored" => Some(DriftReviewStatus::Ignored),
            _ => None,
        }
    }
}

/// Identity of one reviewable drift change: `collectionId:method:path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriftKey {
    pub collection_id: String,
    pub method: String,
    pub path: String,
}

impl DriftKey {
    pub fn new(
        collection_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.collection_id, self.method, self.path)
    }

    /// Splits on the first two colons only; `path` may contain colons.
    pub fn decode(encoded: &str) -> Result<Self, ErrorInfo> {
        let mut parts = encoded.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(collection_id), Some(method), Some(path))
                if !collection_id.is_empty() && !method.is_empty() =>
            {
                Ok(Self::new(collection_id, method, path))
            }
            _ => Err(ErrorInfo::new(
                "invalid_drift_key",
                format!("drift key must be collectionId:method:path, got {:?}", encoded),
            )),
        }
    }
}
