use serde_json::{Map, Value};

/// A problem found by a health check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// `true` for errors, `false` for warnings.
    pub is_error: bool,
    /// Invariant code, like `MYSQL_FAILURE`.
    pub code: String,
    /// Human-readable description.
    pub description: String,
}

impl Problem {
    /// An error-level problem.
    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            is_error: true,
            code: code.into(),
            description: description.into(),
        }
    }

    /// A warning-level problem.
    pub fn warning(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            is_error: false,
            code: code.into(),
            description: description.into(),
        }
    }
}

/// Extra information a health check wants to report.
///
/// Each check writes into its own accumulator; the status action merges them
/// in check order once every check has run. Checks are responsible for
/// choosing keys that do not collide with other checks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics(Map<String, Value>);

impl Diagnostics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up a diagnostic value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// The recorded values.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
