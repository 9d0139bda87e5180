//! Mapping test function names to test-data cases.
//!
//! The leading `test_` is stripped, then an ordered rule table runs:
//!
//! 1. [`ResolutionRule::Exact`]: the stripped name itself
//! 2. [`ResolutionRule::Substitution`]: keyword substitutions on the
//!    stripped name
//! 3. [`ResolutionRule::FullName`]: the function name with its `test_`
//!    prefix kept
//!
//! The first candidate present in the data file wins. A [`CaseBinding`]
//! registered for a test skips the table.

use crate::data::TestDataLoader;
use crate::error::{PomError, PomResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Data file used when neither the binding nor the resolver names one
pub const DEFAULT_DATA_FILE: &str = "login_test_data";

/// Keyword substitutions applied by [`ResolutionRule::Substitution`], in order
pub const DEFAULT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("successful", "valid"),
    ("invalid_credentials", "invalid_username"),
    ("wrong_credentials", "invalid_username"),
    ("wrong_password", "invalid_password"),
    ("empty_fields", "empty_credentials"),
];

/// Rule that produced a candidate case name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// Function name without `test_`
    Exact,
    /// Keyword substitution on the stripped name
    Substitution,
    /// Function name with `test_` kept
    FullName,
    /// Explicit [`CaseBinding`]
    Binding,
}

impl ResolutionRule {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Substitution => "substitution",
            Self::FullName => "full_name",
            Self::Binding => "binding",
        }
    }
}

impl fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit test-to-case mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseBinding {
    /// Case name
    pub case: String,
    /// Data file, the resolver's default when `None`
    pub data_file: Option<String>,
}

impl CaseBinding {
    /// Bind to a case in the default data file
    #[must_use]
    pub fn case(case: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            data_file: None,
        }
    }

    /// Read the case from another data file
    #[must_use]
    pub fn in_file(mut self, data_file: impl Into<String>) -> Self {
        self.data_file = Some(data_file.into());
        self
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Test function name, module path stripped
    pub test_name: String,
    /// Winning case name
    pub case: String,
    /// Data file the case was found in
    pub data_file: String,
    /// Rule that produced the winning candidate
    pub rule: ResolutionRule,
    /// Candidates tried, up to and including the winner
    pub candidates: Vec<String>,
}

/// Ordered name-to-case rule table plus explicit bindings.
#[derive(Debug, Clone)]
pub struct CaseResolver {
    substitutions: Vec<(String, String)>,
    bindings: HashMap<String, CaseBinding>,
    data_file: String,
}

impl Default for CaseResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseResolver {
    /// Resolver with the default substitution table
    #[must_use]
    pub fn new() -> Self {
        Self {
            substitutions: DEFAULT_SUBSTITUTIONS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            bindings: HashMap::new(),
            data_file: DEFAULT_DATA_FILE.to_string(),
        }
    }

    /// Resolver without substitutions
    #[must_use]
    pub fn without_substitutions() -> Self {
        Self {
            substitutions: Vec::new(),
            ..Self::new()
        }
    }

    /// Append a substitution (tried after the existing ones)
    #[must_use]
    pub fn with_substitution(
        mut self,
        keyword: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.substitutions.push((keyword.into(), replacement.into()));
        self
    }

    /// Data file for implicit resolution
    #[must_use]
    pub fn with_data_file(mut self, data_file: impl Into<String>) -> Self {
        self.data_file = data_file.into();
        self
    }

    /// Data file for implicit resolution
    #[must_use]
    pub fn data_file(&self) -> &str {
        &self.data_file
    }

    /// Substitution table, in order
    #[must_use]
    pub fn substitutions(&self) -> &[(String, String)] {
        &self.substitutions
    }

    /// Bind a test to a case, replacing any earlier binding
    pub fn bind(&mut self, test_name: &str, binding: CaseBinding) -> &mut Self {
        let _ = self
            .bindings
            .insert(strip_module_path(test_name).to_string(), binding);
        self
    }

    /// Remove a binding
    pub fn unbind(&mut self, test_name: &str) -> Option<CaseBinding> {
        self.bindings.remove(strip_module_path(test_name))
    }

    /// Binding registered for a test
    #[must_use]
    pub fn binding(&self, test_name: &str) -> Option<&CaseBinding> {
        self.bindings.get(strip_module_path(test_name))
    }

    /// Candidate case names for a test, deduplicated, in rule order.
    #[must_use]
    pub fn candidates(&self, test_name: &str) -> Vec<(String, ResolutionRule)> {
        let name = strip_module_path(test_name);
        let stripped = name.strip_prefix("test_").unwrap_or(name);

        let mut out: Vec<(String, ResolutionRule)> = Vec::new();
        let mut push = |candidate: String, rule: ResolutionRule| {
            if !candidate.is_empty() && !out.iter().any(|(c, _)| *c == candidate) {
                out.push((candidate, rule));
            }
        };

        push(stripped.to_string(), ResolutionRule::Exact);
        let tokens: Vec<&str> = stripped.split('_').collect();
        for (keyword, replacement) in &self.substitutions {
            if let Some((replaced, suffix)) = substitute(&tokens, keyword, replacement) {
                push(replaced, ResolutionRule::Substitution);
                push(suffix, ResolutionRule::Substitution);
            }
        }
        push(name.to_string(), ResolutionRule::FullName);
        out
    }

    /// Resolve a test to a case in its data file.
    ///
    /// # Errors
    ///
    /// [`PomError::UnresolvedTestCase`] when no candidate exists,
    /// [`PomError::CaseNotFound`] when a bound case is missing, plus any
    /// error from loading the data file.
    pub fn resolve(&self, test_name: &str, loader: &mut TestDataLoader) -> PomResult<Resolution> {
        let name = strip_module_path(test_name);

        if let Some(binding) = self.bindings.get(name) {
            let file = binding.data_file.as_deref().unwrap_or(&self.data_file);
            let data = loader.load_test_data(file)?;
            if !data.has_case(&binding.case) {
                return Err(PomError::CaseNotFound {
                    case: binding.case.clone(),
                    file: TestDataLoader::normalize(file),
                });
            }
            debug!(test = name, case = %binding.case, "test case bound explicitly");
            return Ok(Resolution {
                test_name: name.to_string(),
                case: binding.case.clone(),
                data_file: file.to_string(),
                rule: ResolutionRule::Binding,
                candidates: vec![binding.case.clone()],
            });
        }

        let data = loader.load_test_data(&self.data_file)?;
        let mut tried = Vec::new();
        for (candidate, rule) in self.candidates(name) {
            tried.push(candidate.clone());
            if data.has_case(&candidate) {
                debug!(test = name, case = %candidate, %rule, "resolved test case");
                return Ok(Resolution {
                    test_name: name.to_string(),
                    case: candidate,
                    data_file: self.data_file.clone(),
                    rule,
                    candidates: tried,
                });
            }
        }

        Err(PomError::UnresolvedTestCase {
            test_name: name.to_string(),
            file: TestDataLoader::normalize(&self.data_file),
            candidates: tried,
        })
    }
}

fn substitute(tokens: &[&str], keyword: &str, replacement: &str) -> Option<(String, String)> {
    let needle: Vec<&str> = keyword.split('_').collect();
    if needle.is_empty() || needle.len() > tokens.len() {
        return None;
    }
    let at = tokens.windows(needle.len()).position(|w| w == needle.as_slice())?;

    let mut replaced: Vec<&str> = tokens[..at].to_vec();
    replaced.push(replacement);
    replaced.extend_from_slice(&tokens[at + needle.len()..]);

    let suffix = replaced[at..].join("_");
    Some((replaced.join("_"), suffix))
}

/// Last path segment of a function path (`a::b::test_x` → `test_x`).
#[must_use]
pub fn strip_module_path(name: &str) -> &str {
    let name = name.trim_end_matches("::{{closure}}");
    name.rsplit("::").next().unwrap_or(name)
}

/// Name of the enclosing function, without its module path.
///
/// ```
/// fn test_successful_login() -> &'static str {
///     appium_pom::test_fn_name!()
/// }
/// assert_eq!(test_successful_login(), "test_successful_login");
/// ```
#[macro_export]
macro_rules! test_fn_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        $crate::resolve::strip_module_path(name.strip_suffix("::f").unwrap_or(name))
    }};
}
