//! Identity configuration
//!
//! Resolves the project and service identity from a `key=value` env file,
//! falling back to the ambient process environment per key. The env file is
//! parsed with `dotenvy` without mutating the process environment.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Required key naming the project
pub const PROJECT_ID_KEY: &str = "ProjectID";

/// Optional key naming the service account
pub const SERVICE_ACCOUNT_ID_KEY: &str = "ServiceAccountID";

/// Project and service identity resolved at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Project identifier (required)
    pub project_id: String,

    /// Service account identifier (optional, empty when unset)
    #[serde(default)]
    pub service_account_id: String,
}

impl Identity {
    /// Load identity from an env file with ambient-environment fallback
    ///
    /// An absent file is not an error by itself; each key falls back to the
    /// process environment. A present but unreadable or unparsable file is
    /// `Config/FileUnreadable`. A `ProjectID` resolvable from neither source
    /// is `Config/MissingField`.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let mut file_vars: HashMap<String, String> = HashMap::new();

        if let Some(path) = env_file {
            if path.exists() {
                let entries = dotenvy::from_path_iter(path).map_err(|e| {
                    StoreError::file_unreadable(format!("{}: {}", path.display(), e))
                })?;
                for entry in entries {
                    let (key, value) = entry.map_err(|e| {
                        StoreError::file_unreadable(format!("{}: {}", path.display(), e))
                    })?;
                    file_vars.insert(key, value);
                }
                debug!(path = %path.display(), keys = file_vars.len(), "loaded env file");
            } else {
                debug!(path = %path.display(), "env file absent, using process environment");
            }
        }

        let lookup = |key: &str| {
            file_vars
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
                .filter(|v| !v.is_empty())
        };

        let project_id =
            lookup(PROJECT_ID_KEY).ok_or_else(|| StoreError::missing_field(PROJECT_ID_KEY))?;
        let service_account_id = lookup(SERVICE_ACCOUNT_ID_KEY).unwrap_or_default();

        Ok(Self {
            project_id,
            service_account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigErrorKind;
    use std::io::Write;
    use std::sync::Mutex;

    // Tests mutate process environment variables; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_env_file(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_from_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(PROJECT_ID_KEY);
        std::env::remove_var(SERVICE_ACCOUNT_ID_KEY);

        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "ProjectID=test-proj\n");

        let identity = Identity::load(Some(&path)).unwrap();
        assert_eq!(identity.project_id, "test-proj");
        assert_eq!(identity.service_account_id, "");
    }

    #[test]
    fn test_empty_file_falls_back_to_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(PROJECT_ID_KEY, "env-proj");
        std::env::remove_var(SERVICE_ACCOUNT_ID_KEY);

        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "");

        let identity = Identity::load(Some(&path)).unwrap();
        assert_eq!(identity.project_id, "env-proj");
        assert_eq!(identity.service_account_id, "");

        std::env::remove_var(PROJECT_ID_KEY);
    }

    #[test]
    fn test_absent_file_falls_back_to_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(PROJECT_ID_KEY, "env-proj");
        std::env::set_var(SERVICE_ACCOUNT_ID_KEY, "svc-1");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.env");

        let identity = Identity::load(Some(&path)).unwrap();
        assert_eq!(identity.project_id, "env-proj");
        assert_eq!(identity.service_account_id, "svc-1");

        std::env::remove_var(PROJECT_ID_KEY);
        std::env::remove_var(SERVICE_ACCOUNT_ID_KEY);
    }

    #[test]
    fn test_missing_project_id_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(PROJECT_ID_KEY);
        std::env::remove_var(SERVICE_ACCOUNT_ID_KEY);

        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "");

        let err = Identity::load(Some(&path)).unwrap_err();
        assert_eq!(err.config_kind(), Some(ConfigErrorKind::MissingField));
    }

    #[test]
    fn test_file_takes_precedence_over_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(PROJECT_ID_KEY, "env-proj");

        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "ProjectID=file-proj\nServiceAccountID=svc-2\n");

        let identity = Identity::load(Some(&path)).unwrap();
        assert_eq!(identity.project_id, "file-proj");
        assert_eq!(identity.service_account_id, "svc-2");

        std::env::remove_var(PROJECT_ID_KEY);
    }
}
