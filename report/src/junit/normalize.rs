use constants::DEFAULT_REPORT_NAME;
use thiserror::Error;

use super::report::{FailureDetail, JunitReport, Property, TestCase, TestSuite};
use super::xml::RawElement;

const TAG_REPORT: &str = "testsuites";
const TAG_TEST_SUITE: &str = "testsuite";
const TAG_TEST_CASE: &str = "testcase";
const TAG_PROPERTIES: &str = "properties";
const TAG_PROPERTY: &str = "property";
const TAG_FAILURE: &str = "failure";
const TAG_ERROR: &str = "error";
const TAG_SKIPPED: &str = "skipped";
const TAG_SYSTEM_OUT: &str = "system-out";
const TAG_SYSTEM_ERR: &str = "system-err";

/// The document is not recognizable as JUnit XML at all.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not a JUnit report: no `testsuites` or `testsuite` root element")]
pub struct FormatError;

/// Normalizes a raw parsed document into a canonical report tree.
///
/// Declared numeric attributes win whenever they parse; absent or
/// malformed ones fall back to values derived from children (`tests`) or
/// to zero (everything else). Declared and derived values are never
/// cross-checked against each other.
pub fn normalize(root: &RawElement) -> Result<JunitReport, FormatError> {
    if let Some(wrapper) = root.child(TAG_REPORT) {
        let testsuites: Vec<TestSuite> = wrapper
            .children_named(TAG_TEST_SUITE)
            .into_iter()
            .map(process_suite)
            .collect();

        Ok(JunitReport {
            name: non_empty(wrapper.attr("name"))
                .unwrap_or(DEFAULT_REPORT_NAME)
                .to_string(),
            tests: parse_count(wrapper.attr("tests"))
                .unwrap_or_else(|| testsuites.iter().map(|s| s.tests).sum()),
            failures: parse_count(wrapper.attr("failures"))
                .unwrap_or_else(|| testsuites.iter().map(|s| s.failures).sum()),
            errors: parse_count(wrapper.attr("errors"))
                .unwrap_or_else(|| testsuites.iter().map(|s| s.errors).sum()),
            skipped: parse_count(wrapper.attr("skipped"))
                .unwrap_or_else(|| testsuites.iter().map(|s| s.skipped).sum()),
            time: parse_time(wrapper.attr("time"))
                .unwrap_or_else(|| testsuites.iter().map(|s| s.time).sum()),
            timestamp: wrapper.attr("timestamp").unwrap_or_default().to_string(),
            testsuites,
        })
    } else if let Some(suite) = root.child(TAG_TEST_SUITE) {
        let processed = process_suite(suite);
        Ok(JunitReport {
            name: non_empty(Some(processed.name.as_str()))
                .unwrap_or(DEFAULT_REPORT_NAME)
                .to_string(),
            tests: processed.tests,
            failures: processed.failures,
            errors: processed.errors,
            skipped: processed.skipped,
            time: processed.time,
            timestamp: processed.timestamp.clone(),
            testsuites: vec![processed],
        })
    } else {
        Err(FormatError)
    }
}

/// Post-order recursive suite transform: children are processed first so
/// the `tests` fallback can count them.
fn process_suite(raw: &RawElement) -> TestSuite {
    let testsuites: Vec<TestSuite> = raw
        .children_named(TAG_TEST_SUITE)
        .into_iter()
        .map(process_suite)
        .collect();
    let nested_tests: u64 = testsuites.iter().map(|s| s.tests).sum();

    let testcases: Vec<TestCase> = raw
        .children_named(TAG_TEST_CASE)
        .into_iter()
        .map(process_case)
        .collect();
    let direct_tests = testcases.len() as u64;

    TestSuite {
        name: raw.attr("name").unwrap_or_default().to_string(),
        tests: parse_count(raw.attr("tests")).unwrap_or(direct_tests + nested_tests),
        failures: parse_count(raw.attr("failures")).unwrap_or(0),
        errors: parse_count(raw.attr("errors")).unwrap_or(0),
        skipped: parse_count(raw.attr("skipped")).unwrap_or(0),
        time: parse_time(raw.attr("time")).unwrap_or(0.0),
        timestamp: raw.attr("timestamp").unwrap_or_default().to_string(),
        testcases,
        testsuites,
    }
}

fn process_case(raw: &RawElement) -> TestCase {
    TestCase {
        name: raw.attr("name").unwrap_or_default().to_string(),
        classname: raw.attr("classname").unwrap_or_default().to_string(),
        time: parse_time(raw.attr("time")).unwrap_or(0.0),
        properties: raw.child(TAG_PROPERTIES).map(|properties| {
            properties
                .children_named(TAG_PROPERTY)
                .into_iter()
                .map(process_property)
                .collect()
        }),
        failure: raw.child(TAG_FAILURE).map(process_detail),
        error: raw.child(TAG_ERROR).map(process_detail),
        // Presence is all that matters; `<skipped/>` content is ignored.
        skipped: raw.has_child(TAG_SKIPPED),
        system_out: raw
            .child(TAG_SYSTEM_OUT)
            .and_then(|e| non_empty(e.text()))
            .map(String::from),
        system_err: raw
            .child(TAG_SYSTEM_ERR)
            .and_then(|e| non_empty(e.text()))
            .map(String::from),
    }
}

fn process_property(raw: &RawElement) -> Property {
    Property {
        name: raw.attr("name").unwrap_or_default().to_string(),
        value: raw.attr("value").map(String::from),
        text: raw.text().map(String::from),
    }
}

fn process_detail(raw: &RawElement) -> FailureDetail {
    FailureDetail {
        message: raw.attr("message").unwrap_or_default().to_string(),
        kind: raw.attr("type").unwrap_or_default().to_string(),
        text: raw.text().unwrap_or_default().to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_count(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Elapsed times are non-negative seconds; non-finite or negative declared
/// values count as parse failures.
fn parse_time(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|t| t.is_finite() && *t >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::super::xml::parse_document;
    use super::*;

    fn normalized(xml: &str) -> JunitReport {
        normalize(&parse_document(xml.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn declared_root_counts_win_over_computed() {
        let report = normalized(
            r#"<testsuites tests="3" failures="1">
                <testsuite name="a" tests="2" failures="1"><testcase name="x"/><testcase name="y"/></testsuite>
                <testsuite name="b" tests="1"><testcase name="z"/></testsuite>
            </testsuites>"#,
        );
        assert_eq!(report.tests, 3);
        assert_eq!(report.failures, 1);
        assert_eq!(report.testsuites.len(), 2);
    }

    #[test]
    fn missing_root_counts_fall_back_to_suite_sums() {
        let report = normalized(
            r#"<testsuites>
                <testsuite name="a" tests="2" failures="1" errors="1" skipped="0" time="1.5"/>
                <testsuite name="b" tests="4" failures="0" errors="0" skipped="2" time="0.5"/>
            </testsuites>"#,
        );
        assert_eq!(report.tests, 6);
        assert_eq!(report.failures, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.time, 2.0);
    }

    #[test]
    fn malformed_suite_numerics_fall_back() {
        let report = normalized(
            r#"<testsuites>
                <testsuite name="S" time="bad" tests="">
                    <testcase name="t" time="0.5"/>
                </testsuite>
            </testsuites>"#,
        );
        let suite = &report.testsuites[0];
        assert_eq!(suite.tests, 1);
        assert_eq!(suite.time, 0.0);
        assert_eq!(suite.testcases[0].time, 0.5);
    }

    #[test]
    fn undeclared_suite_tests_count_direct_and_nested_cases() {
        let report = normalized(
            r#"<testsuites>
                <testsuite name="outer">
                    <testcase name="a"/>
                    <testsuite name="inner">
                        <testcase name="b"/>
                        <testcase name="c"/>
                    </testsuite>
                </testsuite>
            </testsuites>"#,
        );
        let outer = &report.testsuites[0];
        assert_eq!(outer.testsuites[0].tests, 2);
        assert_eq!(outer.tests, 3);
        assert_eq!(report.tests, 3);
    }

    #[test]
    fn bare_testsuite_root_wraps_as_single_suite_report() {
        let report = normalized(
            r#"<testsuite name="Only" tests="2" failures="0">
                <testcase name="a"/>
                <testcase name="b"/>
            </testsuite>"#,
        );
        assert_eq!(report.name, "Only");
        assert_eq!(report.tests, 2);
        assert_eq!(report.testsuites.len(), 1);
        assert_eq!(report.testsuites[0].name, "Only");
    }

    #[test]
    fn unrecognized_root_is_a_format_error() {
        let raw = parse_document("<coverage line-rate=\"0.5\"/>".as_bytes()).unwrap();
        assert_eq!(normalize(&raw), Err(FormatError));
    }

    #[test]
    fn missing_names_fall_back_to_the_default() {
        let report = normalized(r#"<testsuites><testsuite name="s"/></testsuites>"#);
        assert_eq!(report.name, DEFAULT_REPORT_NAME);

        let report = normalized(r#"<testsuite><testcase name="a"/></testsuite>"#);
        assert_eq!(report.name, DEFAULT_REPORT_NAME);
        assert_eq!(report.testsuites[0].name, "");
    }

    #[test]
    fn failure_and_error_subfields_default_to_empty_strings() {
        let report = normalized(
            r#"<testsuite name="s">
                <testcase name="f"><failure/></testcase>
                <testcase name="e"><error message="boom" type="Panic">trace</error></testcase>
            </testsuite>"#,
        );
        let cases = &report.testsuites[0].testcases;

        let failure = cases[0].failure.as_ref().unwrap();
        assert_eq!(failure.message, "");
        assert_eq!(failure.kind, "");
        assert_eq!(failure.text, "");

        let error = cases[1].error.as_ref().unwrap();
        assert_eq!(error.message, "boom");
        assert_eq!(error.kind, "Panic");
        assert_eq!(error.text, "trace");
    }

    #[test]
    fn failure_and_skipped_can_both_be_set() {
        let report = normalized(
            r#"<testsuite name="s">
                <testcase name="t"><failure message="m"/><skipped/></testcase>
            </testsuite>"#,
        );
        let case = &report.testsuites[0].testcases[0];
        assert!(case.failure.is_some());
        assert!(case.skipped);
    }

    #[test]
    fn skipped_presence_check_ignores_content() {
        let report = normalized(
            r#"<testsuite name="s">
                <testcase name="t"><skipped>not run on this platform</skipped></testcase>
            </testsuite>"#,
        );
        assert!(report.testsuites[0].testcases[0].skipped);
    }

    #[test]
    fn properties_coerce_singleton_and_list_uniformly() {
        let single = normalized(
            r#"<testsuite name="s">
                <testcase name="t">
                    <properties><property name="os" value="linux"/></properties>
                </testcase>
            </testsuite>"#,
        );
        let many = normalized(
            r#"<testsuite name="s">
                <testcase name="t">
                    <properties>
                        <property name="os" value="linux"/>
                        <property name="arch">x86_64</property>
                    </properties>
                </testcase>
            </testsuite>"#,
        );

        let single_props = single.testsuites[0].testcases[0]
            .properties
            .as_ref()
            .unwrap();
        assert_eq!(single_props.len(), 1);
        assert_eq!(single_props[0].name, "os");
        assert_eq!(single_props[0].value.as_deref(), Some("linux"));
        assert_eq!(single_props[0].text, None);

        let many_props = many.testsuites[0].testcases[0].properties.as_ref().unwrap();
        assert_eq!(many_props.len(), 2);
        assert_eq!(many_props[1].name, "arch");
        assert_eq!(many_props[1].value, None);
        assert_eq!(many_props[1].text.as_deref(), Some("x86_64"));
    }

    #[test]
    fn empty_system_output_normalizes_to_none() {
        let report = normalized(
            r#"<testsuite name="s">
                <testcase name="t">
                    <system-out></system-out>
                    <system-err>warning: deprecated</system-err>
                </testcase>
            </testsuite>"#,
        );
        let case = &report.testsuites[0].testcases[0];
        assert_eq!(case.system_out, None);
        assert_eq!(case.system_err.as_deref(), Some("warning: deprecated"));
    }

    #[test]
    fn negative_and_non_finite_times_fall_back() {
        let report = normalized(
            r#"<testsuites>
                <testsuite name="s" time="-3.0">
                    <testcase name="a" time="NaN"/>
                    <testcase name="b" time="inf"/>
                </testsuite>
            </testsuites>"#,
        );
        let suite = &report.testsuites[0];
        assert_eq!(suite.time, 0.0);
        assert_eq!(suite.testcases[0].time, 0.0);
        assert_eq!(suite.testcases[1].time, 0.0);
    }
}
