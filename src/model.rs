use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub version: String,
    #[serde(default)]
    pub changelog: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResult {
    pub has_update: bool,
    pub local_version: String,
    pub remote_version: Option<String>,
    pub changelog: Option<String>,
    pub error: Option<String>,
}

/// Last known update state, as persisted by the checker and read by `status`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateState {
    pub last_update_check: Option<i64>,
    pub remote_version: Option<String>,
    #[serde(default)]
    pub has_update: bool,
    pub changelog: Option<String>,
    #[serde(default)]
    pub update_dismissed: bool,
    pub dismissed_version: Option<String>,
}

impl UpdateState {
    /// The banner stays visible until dismissed for this exact remote version.
    pub fn banner_visible(&self) -> bool {
        self.has_update
            && self.remote_version.is_some()
            && !(self.update_dismissed && self.dismissed_version == self.remote_version)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TreeListing {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileEntry {
    pub relative_path: String,
    pub source_locator: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Written,
    Ok,
    Failed,
}

/// One row of a sync or download report.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ItemOutcome {
    pub item: String,
    pub status: ItemStatus,
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_accepts_optional_fields() {
        let d: VersionDescriptor = serde_json::from_str(r#"{"version":"1.4.2"}"#).unwrap();
        assert_eq!(d.version, "1.4.2");
        assert!(d.changelog.is_empty());
        assert!(d.release_date.is_none());

        let d: VersionDescriptor = serde_json::from_str(
            r#"{"version":"2.0.0","changelog":"- faster","releaseDate":"2025-01-02"}"#,
        )
        .unwrap();
        assert_eq!(d.release_date.as_deref(), Some("2025-01-02"));
    }

    #[test]
    fn banner_hidden_after_dismissing_same_version() {
        let mut state = UpdateState {
            has_update: true,
            remote_version: Some("1.5.0".into()),
            ..Default::default()
        };
        assert!(state.banner_visible());

        state.update_dismissed = true;
        state.dismissed_version = Some("1.5.0".into());
        assert!(!state.banner_visible());

        state.remote_version = Some("1.6.0".into());
        assert!(state.banner_visible());
    }
}
