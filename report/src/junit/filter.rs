use std::collections::BTreeSet;

use super::report::{TestCase, TestStatus, TestSuite};

/// An active set of statuses to show.
///
/// An empty set means "show all", not "show none": clearing every filter
/// chip is how a viewer resets itself, so it must not blank the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    active: BTreeSet<TestStatus>,
}

impl StatusFilter {
    pub fn new<I: IntoIterator<Item = TestStatus>>(statuses: I) -> Self {
        StatusFilter {
            active: statuses.into_iter().collect(),
        }
    }

    /// All four statuses active, equivalent to showing everything.
    pub fn all() -> Self {
        StatusFilter::new(TestStatus::ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, status: TestStatus) -> bool {
        self.active.contains(&status)
    }

    pub fn toggle(&mut self, status: TestStatus) {
        if !self.active.remove(&status) {
            self.active.insert(status);
        }
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        self.active.is_empty() || self.active.contains(&case.status())
    }

    /// Direct cases of a suite that pass the filter, in document order.
    pub fn filter_cases<'a>(&self, suite: &'a TestSuite) -> Vec<&'a TestCase> {
        suite
            .testcases
            .iter()
            .filter(|case| self.matches(case))
            .collect()
    }
}
