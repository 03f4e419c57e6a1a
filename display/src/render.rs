use colored::{ColoredString, Colorize};
use console::Emoji;
use report::junit::filter::StatusFilter;
use report::junit::report::{JunitReport, TestCase, TestStatus, TestSuite, TestSummary};

static PASSED_ICON: Emoji = Emoji("✔", "+");
static FAILED_ICON: Emoji = Emoji("✖", "x");
static ERRORED_ICON: Emoji = Emoji("💥", "!");
static SKIPPED_ICON: Emoji = Emoji("⏭", ">");

const SUCCESS_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub filter: StatusFilter,
    /// Include captured system-out/system-err blocks.
    pub show_output: bool,
}

/// Renders a whole report tree to a string; the caller decides where it
/// goes. Colors obey the global `colored` override, so output stays
/// assertable in tests and pipeable in shells.
pub fn render_report(report: &JunitReport, options: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", report.name.bold()));
    if !report.timestamp.is_empty() {
        out.push_str(&format!("  {}\n", report.timestamp.dimmed()));
    }
    out.push_str(&format!("  {}\n", summary_line(report)));
    out.push_str(&format!(
        "  {} {:.1}%\n",
        success_bar(report.success_rate()),
        report.success_rate()
    ));

    for suite in &report.testsuites {
        render_suite(&mut out, suite, 1, options);
    }
    out
}

fn render_suite(out: &mut String, suite: &TestSuite, depth: usize, options: &RenderOptions) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "\n{}{} • {} • {:.1}%\n",
        indent,
        suite.name.bold(),
        summary_line(suite),
        suite.success_rate()
    ));

    for case in options.filter.filter_cases(suite) {
        render_case(out, case, depth + 1, options);
    }
    for nested in &suite.testsuites {
        render_suite(out, nested, depth + 1, options);
    }
}

fn render_case(out: &mut String, case: &TestCase, depth: usize, options: &RenderOptions) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{}{} {} • {} • {} • {:.3}s\n",
        indent,
        status_icon(case.status()),
        case.name,
        case.classname,
        status_word(case.status()),
        case.time
    ));

    let detail_indent = format!("{}    ", indent);
    let detail = match case.status() {
        TestStatus::Failed => case.failure.as_ref(),
        TestStatus::Errored => case.error.as_ref(),
        _ => None,
    };
    if let Some(detail) = detail {
        if !detail.message.is_empty() {
            out.push_str(&format!("{}{}\n", detail_indent, detail.message.red()));
        }
        if !detail.kind.is_empty() {
            out.push_str(&format!("{}{}\n", detail_indent, detail.kind.dimmed()));
        }
        if !detail.text.is_empty() {
            push_text_block(out, &detail_indent, &detail.text);
        }
    }

    if let Some(properties) = &case.properties {
        for property in properties {
            let value = property
                .value
                .as_deref()
                .or(property.text.as_deref())
                .unwrap_or_default();
            out.push_str(&format!(
                "{}{}: {}\n",
                detail_indent,
                property.name.dimmed(),
                value
            ));
        }
    }

    if options.show_output {
        if let Some(system_out) = &case.system_out {
            out.push_str(&format!("{}{}\n", detail_indent, "system-out:".dimmed()));
            push_text_block(out, &detail_indent, system_out);
        }
        if let Some(system_err) = &case.system_err {
            out.push_str(&format!("{}{}\n", detail_indent, "system-err:".dimmed()));
            push_text_block(out, &detail_indent, system_err);
        }
    }
}

fn push_text_block(out: &mut String, indent: &str, text: &str) {
    for line in text.lines() {
        out.push_str(&format!("{}{}\n", indent, line));
    }
}

fn summary_line<T: TestSummary>(summary: &T) -> String {
    let mut parts = vec![format!("{} passed", summary.success_count())
        .green()
        .to_string()];
    if summary.failures() > 0 {
        parts.push(format!("{} failed", summary.failures()).red().to_string());
    }
    if summary.errors() > 0 {
        parts.push(format!("{} errors", summary.errors()).red().to_string());
    }
    if summary.skipped() > 0 {
        parts.push(
            format!("{} skipped", summary.skipped())
                .yellow()
                .to_string(),
        );
    }
    parts.push(format!("of {} tests", summary.tests()));
    parts.join(", ")
}

fn success_bar(rate: f64) -> String {
    let filled = ((rate.clamp(0.0, 100.0) / 100.0) * SUCCESS_BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(SUCCESS_BAR_WIDTH - filled)
    );
    if rate >= 100.0 {
        bar.green().to_string()
    } else {
        bar.to_string()
    }
}

fn status_word(status: TestStatus) -> ColoredString {
    match status {
        TestStatus::Passed => "Passed".green(),
        TestStatus::Failed => "Failed".red(),
        TestStatus::Errored => "Error".red(),
        TestStatus::Skipped => "Skipped".yellow(),
    }
}

fn status_icon(status: TestStatus) -> String {
    match status {
        TestStatus::Passed => format!("{}", PASSED_ICON).green().to_string(),
        TestStatus::Failed => format!("{}", FAILED_ICON).red().to_string(),
        TestStatus::Errored => format!("{}", ERRORED_ICON).red().to_string(),
        TestStatus::Skipped => format!("{}", SKIPPED_ICON).yellow().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use report::junit::report::{FailureDetail, Property};

    use super::*;

    fn sample_report() -> JunitReport {
        let failing = TestCase {
            name: String::from("parses empty input"),
            classname: String::from("parser.Edge"),
            time: 0.25,
            properties: Some(vec![Property {
                name: String::from("os"),
                value: Some(String::from("linux")),
                text: None,
            }]),
            failure: Some(FailureDetail {
                message: String::from("expected Ok, got Err"),
                kind: String::from("AssertionError"),
                text: String::from("left: Ok\nright: Err"),
            }),
            error: None,
            skipped: false,
            system_out: Some(String::from("parsing...")),
            system_err: None,
        };
        let passing = TestCase {
            name: String::from("parses valid input"),
            classname: String::from("parser.Happy"),
            time: 0.1,
            properties: None,
            failure: None,
            error: None,
            skipped: false,
            system_out: None,
            system_err: None,
        };
        JunitReport {
            name: String::from("nightly"),
            tests: 2,
            failures: 1,
            errors: 0,
            skipped: 0,
            time: 0.35,
            timestamp: String::from("2024-01-01T00:00:00Z"),
            testsuites: vec![TestSuite {
                name: String::from("parser"),
                tests: 2,
                failures: 1,
                errors: 0,
                skipped: 0,
                time: 0.35,
                timestamp: String::new(),
                testcases: vec![passing, failing],
                testsuites: Vec::new(),
            }],
        }
    }

    fn render_plain(report: &JunitReport, options: &RenderOptions) -> String {
        colored::control::set_override(false);
        render_report(report, options)
    }

    #[test]
    fn renders_summary_counts_and_rate() {
        let out = render_plain(&sample_report(), &RenderOptions::default());
        assert!(out.contains("nightly"));
        assert!(out.contains("1 passed, 1 failed, of 2 tests"));
        assert!(out.contains("50.0%"));
    }

    #[test]
    fn renders_failure_details_and_properties() {
        let out = render_plain(&sample_report(), &RenderOptions::default());
        assert!(out.contains("expected Ok, got Err"));
        assert!(out.contains("AssertionError"));
        assert!(out.contains("left: Ok"));
        assert!(out.contains("os: linux"));
    }

    #[test]
    fn system_output_is_hidden_unless_requested() {
        let report = sample_report();
        let hidden = render_plain(&report, &RenderOptions::default());
        assert!(!hidden.contains("parsing..."));

        let shown = render_plain(
            &report,
            &RenderOptions {
                show_output: true,
                ..Default::default()
            },
        );
        assert!(shown.contains("system-out:"));
        assert!(shown.contains("parsing..."));
    }

    #[test]
    fn filter_drops_non_matching_cases() {
        let report = sample_report();
        let options = RenderOptions {
            filter: StatusFilter::new([TestStatus::Failed]),
            ..Default::default()
        };
        let out = render_plain(&report, &options);
        assert!(out.contains("parses empty input"));
        assert!(!out.contains("parses valid input"));
    }

    #[test]
    fn success_bar_is_full_at_one_hundred_percent() {
        colored::control::set_override(false);
        assert_eq!(success_bar(100.0), "[####################]");
        assert_eq!(success_bar(0.0), "[--------------------]");
        // Negative rates from inconsistent counts clamp instead of panicking.
        assert_eq!(success_bar(-50.0), "[--------------------]");
    }
}
