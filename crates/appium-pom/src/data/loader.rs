//! Test-data loading with a per-loader cache.

use super::{merge_records, DataStore, Record, TestCase, TestData};
use crate::error::{PomError, PomResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default test-data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "test_data";

/// Environment variable selecting the active environment section
pub const TEST_ENV: &str = "TEST_ENV";

/// Loads test-data files from a directory and caches the parses.
///
/// # Example
///
/// ```no_run
/// use appium_pom::data::TestDataLoader;
///
/// let mut loader = TestDataLoader::new("test_data");
/// let case = loader.get_test_case_data("login_test_data", "valid_login")?;
/// assert_eq!(case.name, "valid_login");
/// # Ok::<(), appium_pom::PomError>(())
/// ```
#[derive(Debug)]
pub struct TestDataLoader {
    data_dir: PathBuf,
    store: DataStore,
    default_environment: String,
    environment: Option<String>,
}

impl TestDataLoader {
    /// Loader for a data directory with the `default` environment active
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            store: DataStore::new(),
            default_environment: crate::config::DEFAULT_ENVIRONMENT.to_string(),
            environment: None,
        }
    }

    /// Loader whose active environment comes from `TEST_ENV`
    #[must_use]
    pub fn from_env(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(data_dir).with_environment(std::env::var(TEST_ENV).ok())
    }

    /// Name of the fallback environment section
    #[must_use]
    pub fn with_default_environment(mut self, name: impl Into<String>) -> Self {
        self.default_environment = name.into();
        self
    }

    /// Select the active environment (`None` means the default one)
    #[must_use]
    pub fn with_environment(mut self, name: Option<String>) -> Self {
        self.environment = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// Data directory
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Active environment name
    #[must_use]
    pub fn active_environment(&self) -> &str {
        self.environment
            .as_deref()
            .unwrap_or(&self.default_environment)
    }

    /// Fallback environment name
    #[must_use]
    pub fn default_environment(&self) -> &str {
        &self.default_environment
    }

    /// Cache key / file name for a data file (`.json` appended when missing)
    #[must_use]
    pub fn normalize(filename: &str) -> String {
        if filename.ends_with(".json") {
            filename.to_string()
        } else {
            format!("{filename}.json")
        }
    }

    /// Read and parse a data file, or return the cached parse.
    ///
    /// Nothing is cached when reading or parsing fails.
    pub fn load_test_data(&mut self, filename: &str) -> PomResult<Arc<TestData>> {
        let key = Self::normalize(filename);
        if let Some(cached) = self.store.get(&key) {
            trace!(file = %key, "test data cache hit");
            return Ok(cached);
        }

        let path = self.data_dir.join(&key);
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PomError::FileNotFound { path: path.clone() },
            _ => PomError::Io(e),
        })?;
        let data: TestData = serde_json::from_str(&text).map_err(|source| PomError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(
            file = %path.display(),
            cases = data.test_cases.len(),
            "loaded test data"
        );
        Ok(self.store.insert(key, data))
    }

    /// Case record layered over the active environment and `common`.
    pub fn get_test_case_data(&mut self, filename: &str, case_name: &str) -> PomResult<TestCase> {
        let data = self.load_test_data(filename)?;
        let record = data.case(case_name).ok_or_else(|| PomError::CaseNotFound {
            case: case_name.to_string(),
            file: Self::normalize(filename),
        })?;
        Ok(self.layered(&data, case_name, record))
    }

    /// Every case in file order, layered like [`Self::get_test_case_data`].
    pub fn get_all_test_cases(&mut self, filename: &str) -> PomResult<Vec<TestCase>> {
        let data = self.load_test_data(filename)?;
        Ok(data
            .test_cases
            .iter()
            .map(|(name, record)| self.layered(&data, name, record))
            .collect())
    }

    /// The `common` section (empty when absent)
    pub fn get_common_data(&mut self, filename: &str) -> PomResult<Record> {
        Ok(self.load_test_data(filename)?.common.clone())
    }

    /// Environment section with fallback to the default environment.
    ///
    /// `None` selects the active environment. A present environment is
    /// layered over the default one; an absent one yields the default
    /// environment's data, or an empty record when that is absent too.
    pub fn get_environment_data(
        &mut self,
        filename: &str,
        environment: Option<&str>,
    ) -> PomResult<Record> {
        let data = self.load_test_data(filename)?;
        let name = environment.unwrap_or_else(|| self.active_environment());
        Ok(self.environment_record(&data, name))
    }

    /// Drop all cached parses; the next load reads from disk again.
    pub fn clear_cache(&mut self) {
        debug!(files = self.store.len(), "clearing test data cache");
        self.store.clear();
    }

    /// Cached file names, sorted
    #[must_use]
    pub fn cached_files(&self) -> Vec<&str> {
        self.store.keys()
    }

    /// Files read from disk so far
    #[must_use]
    pub fn disk_reads(&self) -> usize {
        self.store.disk_reads()
    }

    fn environment_record(&self, data: &TestData, name: &str) -> Record {
        let default = data.environments.get(&self.default_environment);
        match (data.environments.get(name), default) {
            (Some(env), Some(default)) if name != self.default_environment => {
                merge_records(default, env)
            }
            (Some(env), _) => env.clone(),
            (None, Some(default)) => {
                debug!(
                    environment = name,
                    fallback = %self.default_environment,
                    "environment missing, using default"
                );
                default.clone()
            }
            (None, None) => Record::new(),
        }
    }

    fn layered(&self, data: &TestData, name: &str, record: &Record) -> TestCase {
        let env = self.environment_record(data, self.active_environment());
        let base = merge_records(&data.common, &env);
        TestCase {
            name: name.to_string(),
            data: merge_records(&base, record),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn login_data() -> Value {
        json!({
            "common": {"app_name": "Demo", "timeout": 10, "expected_result": "success"},
            "environments": {
                "default": {"base_url": "https://example.com", "timeout": 20},
                "staging": {"base_url": "https://staging.example.com"}
            },
            "test_cases": {
                "valid_login": {"username": "alice", "password": "secret", "timeout": 30},
                "invalid_username": {"username": "nobody", "password": "secret", "expected_result": "error"},
                "empty_credentials": {"username": "", "password": "", "expected_result": "error"}
            }
        })
    }

    fn fixture() -> (TempDir, TestDataLoader) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("login_test_data.json"),
            serde_json::to_string(&login_data()).unwrap(),
        )
        .unwrap();
        let loader = TestDataLoader::new(dir.path());
        (dir, loader)
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_second_load_is_cached() {
            let (dir, mut loader) = fixture();
            let first = loader.load_test_data("login_test_data").unwrap();
            fs::remove_file(dir.path().join("login_test_data.json")).unwrap();
            let second = loader.load_test_data("login_test_data.json").unwrap();
            assert_eq!(first, second);
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(loader.disk_reads(), 1);
            assert_eq!(loader.cached_files(), vec!["login_test_data.json"]);
        }

        #[test]
        fn test_clear_cache_rereads() {
            let (dir, mut loader) = fixture();
            let _ = loader.load_test_data("login_test_data").unwrap();
            fs::write(
                dir.path().join("login_test_data.json"),
                r#"{"test_cases": {"only": {}}}"#,
            )
            .unwrap();
            loader.clear_cache();
            let data = loader.load_test_data("login_test_data").unwrap();
            assert_eq!(data.case_names(), vec!["only"]);
            assert_eq!(loader.disk_reads(), 2);
        }

        #[test]
        fn test_missing_file_not_cached() {
            let (_dir, mut loader) = fixture();
            let err = loader.load_test_data("nope").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert!(loader.cached_files().is_empty());
        }

        #[test]
        fn test_malformed_file_not_cached() {
            let (dir, mut loader) = fixture();
            fs::write(dir.path().join("broken.json"), "{\"common\": ").unwrap();
            let err = loader.load_test_data("broken").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse);
            assert!(loader.cached_files().is_empty());
            assert_eq!(loader.disk_reads(), 0);

            fs::write(dir.path().join("broken.json"), "{}").unwrap();
            assert!(loader.load_test_data("broken").is_ok());
        }
    }

    mod case_tests {
        use super::*;

        #[test]
        fn test_case_overrides_common_and_environment() {
            let (_dir, mut loader) = fixture();
            let case = loader
                .get_test_case_data("login_test_data", "valid_login")
                .unwrap();
            assert_eq!(case.name, "valid_login");
            assert_eq!(case["timeout"], 30);
            assert_eq!(case["app_name"], "Demo");
            assert_eq!(case["username"], "alice");
            assert_eq!(case["base_url"], "https://example.com");
            assert_eq!(case["expected_result"], "success");
        }

        #[test]
        fn test_active_environment_layer() {
            let (_dir, loader) = fixture();
            let mut loader = loader.with_environment(Some("staging".to_string()));
            let case = loader
                .get_test_case_data("login_test_data", "invalid_username")
                .unwrap();
            assert_eq!(case["base_url"], "https://staging.example.com");
            assert_eq!(case["timeout"], 20);
            assert_eq!(case["expected_result"], "error");
        }

        #[test]
        fn test_missing_case() {
            let (_dir, mut loader) = fixture();
            let err = loader
                .get_test_case_data("login_test_data", "nonexistent")
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert!(err.to_string().contains("nonexistent"));
        }

        #[test]
        fn test_all_cases_in_file_order() {
            let (_dir, mut loader) = fixture();
            let cases = loader.get_all_test_cases("login_test_data").unwrap();
            let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(
                names,
                vec!["valid_login", "invalid_username", "empty_credentials"]
            );
            let single = loader
                .get_test_case_data("login_test_data", "empty_credentials")
                .unwrap();
            assert_eq!(cases[2], single);
        }
    }

    mod section_tests {
        use super::*;

        #[test]
        fn test_common_data() {
            let (_dir, mut loader) = fixture();
            let common = loader.get_common_data("login_test_data").unwrap();
            assert_eq!(common["app_name"], "Demo");
        }

        #[test]
        fn test_environment_layered_over_default() {
            let (_dir, mut loader) = fixture();
            let env = loader
                .get_environment_data("login_test_data", Some("staging"))
                .unwrap();
            assert_eq!(env["base_url"], "https://staging.example.com");
            assert_eq!(env["timeout"], 20);
        }

        #[test]
        fn test_missing_environment_falls_back_to_default() {
            let (_dir, mut loader) = fixture();
            let env = loader
                .get_environment_data("login_test_data", Some("missing_env"))
                .unwrap();
            assert_eq!(env["base_url"], "https://example.com");
        }

        #[test]
        fn test_no_environments_at_all() {
            let (dir, mut loader) = fixture();
            fs::write(dir.path().join("bare.json"), "{}").unwrap();
            let env = loader.get_environment_data("bare", Some("prod")).unwrap();
            assert!(env.is_empty());
            assert!(loader.get_common_data("bare").unwrap().is_empty());
        }

        #[test]
        fn test_none_uses_active_environment() {
            let (_dir, loader) = fixture();
            let mut loader = loader.with_environment(Some("staging".to_string()));
            assert_eq!(loader.active_environment(), "staging");
            let env = loader.get_environment_data("login_test_data", None).unwrap();
            assert_eq!(env["base_url"], "https://staging.example.com");
        }

        #[test]
        fn test_custom_default_environment() {
            let (_dir, loader) = fixture();
            let mut loader = loader.with_default_environment("staging");
            let env = loader
                .get_environment_data("login_test_data", Some("qa"))
                .unwrap();
            assert_eq!(env["base_url"], "https://staging.example.com");
            assert!(!env.contains_key("timeout"));
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(TestDataLoader::normalize("login"), "login.json");
        assert_eq!(TestDataLoader::normalize("login.json"), "login.json");
    }
}
