// Distribution point preferences.
//
// Connectors carry these records but never read them; file transfer to
// the repositories is handled elsewhere.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for one file-storage backend.
///
/// `name` must match the distribution point name on the server for the
/// short form; `type` (`"CDP"`, `"JDS"`, `"AFP"`, `"SMB"`) selects the
/// explicit form. Remaining keys (`password`, `URL`, `share_name`, ...)
/// are kept as-is.
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RepositoryPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl RepositoryPrefs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// Settings may hold passwords; only their keys are printed.
impl fmt::Debug for RepositoryPrefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryPrefs")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The distribution points a connector was configured with.
#[derive(Debug, Clone, Default)]
pub struct DistributionPoints {
    repos: Vec<RepositoryPrefs>,
}

impl DistributionPoints {
    pub fn new(repos: Vec<RepositoryPrefs>) -> Self {
        Self { repos }
    }

    pub fn repos(&self) -> &[RepositoryPrefs] {
        &self.repos
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Names of the configured repositories, in order. Records without a
    /// name (explicit CDP/JDS entries) are skipped.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repos.iter().filter_map(|r| r.name.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_kept() {
        let prefs: RepositoryPrefs = serde_json::from_value(serde_json::json!({
            "name": "CasperShare",
            "password": "hunter2",
            "share_name": "CasperShare"
        }))
        .unwrap();
        assert_eq!(prefs.name.as_deref(), Some("CasperShare"));
        assert_eq!(prefs.settings.len(), 2);
        assert!(!format!("{prefs:?}").contains("hunter2"));
    }

    #[test]
    fn explicit_form_has_type() {
        let prefs: RepositoryPrefs =
            serde_json::from_value(serde_json::json!({ "type": "JDS" })).unwrap();
        assert_eq!(prefs.kind.as_deref(), Some("JDS"));
        assert!(prefs.name.is_none());
    }

    #[test]
    fn names_skip_unnamed() {
        let dps = DistributionPoints::new(vec![
            RepositoryPrefs::named("A"),
            RepositoryPrefs {
                kind: Some("CDP".into()),
                ..RepositoryPrefs::default()
            },
            RepositoryPrefs::named("B"),
        ]);
        assert_eq!(dps.len(), 3);
        assert_eq!(dps.names().collect::<Vec<_>>(), ["A", "B"]);
    }
}
