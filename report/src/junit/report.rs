use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A `<property>` entry attached to a test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Payload of a `<failure>` or `<error>` element. Sub-fields the source
/// omitted are carried as empty strings, not options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Terminal status of a test case, resolved from the raw optional fields
/// with the priority failure > error > skipped > passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl TestStatus {
    pub const ALL: [TestStatus; 4] = [
        TestStatus::Passed,
        TestStatus::Failed,
        TestStatus::Errored,
        TestStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Errored => "error",
            TestStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(TestStatus::Passed),
            "failed" => Ok(TestStatus::Failed),
            "error" => Ok(TestStatus::Errored),
            "skipped" => Ok(TestStatus::Skipped),
            other => Err(format!(
                "unknown status `{other}` (expected passed, failed, error, or skipped)"
            )),
        }
    }
}

/// A single test execution result.
///
/// `failure`, `error`, and `skipped` are carried exactly as the source
/// declared them and are not mutually exclusive; [`TestCase::status`]
/// resolves the ambiguity once for rendering and filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub classname: String,
    /// Elapsed seconds.
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_err: Option<String>,
}

impl TestCase {
    pub fn status(&self) -> TestStatus {
        if self.failure.is_some() {
            TestStatus::Failed
        } else if self.error.is_some() {
            TestStatus::Errored
        } else if self.skipped {
            TestStatus::Skipped
        } else {
            TestStatus::Passed
        }
    }
}

/// A named, possibly nested, group of test cases with aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSuite {
    pub name: String,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    /// Elapsed seconds.
    pub time: f64,
    pub timestamp: String,
    pub testcases: Vec<TestCase>,
    pub testsuites: Vec<TestSuite>,
}

/// Root of a normalized report tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunitReport {
    pub name: String,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    /// Elapsed seconds.
    pub time: f64,
    pub timestamp: String,
    pub testsuites: Vec<TestSuite>,
}

/// Derived aggregate statistics over a suite or a whole report.
///
/// Counts are taken at face value from the source, so `success_count` can
/// go negative when declared aggregates disagree with reality; that
/// inconsistency is passed through rather than clamped.
pub trait TestSummary {
    fn tests(&self) -> u64;
    fn failures(&self) -> u64;
    fn errors(&self) -> u64;
    fn skipped(&self) -> u64;

    fn success_count(&self) -> i64 {
        self.tests() as i64
            - self.failures() as i64
            - self.errors() as i64
            - self.skipped() as i64
    }

    /// Percentage of successful tests, 0.0 when there are no tests at all.
    fn success_rate(&self) -> f64 {
        if self.tests() == 0 {
            return 0.0;
        }
        self.success_count() as f64 / self.tests() as f64 * 100.0
    }
}

impl TestSummary for TestSuite {
    fn tests(&self) -> u64 {
        self.tests
    }

    fn failures(&self) -> u64 {
        self.failures
    }

    fn errors(&self) -> u64 {
        self.errors
    }

    fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl TestSummary for JunitReport {
    fn tests(&self) -> u64 {
        self.tests
    }

    fn failures(&self) -> u64 {
        self.failures
    }

    fn errors(&self) -> u64 {
        self.errors
    }

    fn skipped(&self) -> u64 {
        self.skipped
    }
}
