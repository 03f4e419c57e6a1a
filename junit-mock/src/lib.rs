use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use clap::Parser;
use fake::Fake;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rand::prelude::*;
use rand::rngs::StdRng;

macro_rules! percentages_parser {
    ($func_name:ident, $num_percentages:literal) => {
        fn $func_name(argument: &str) -> std::result::Result<Vec<u8>, clap::Error> {
            argument
                .split(',')
                .enumerate()
                .try_fold((0_u8, Vec::new()), |mut acc, (i, percentage_str)| {
                    if i >= $num_percentages {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            "More than $num_percentages percentages provided",
                        ));
                    }
                    let percentage = percentage_str
                        .parse::<u8>()
                        .map_err(|e| clap::Error::raw(clap::error::ErrorKind::InvalidValue, e))?;

                    if percentage > 100 {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            format!("Percentage at index {} is greater than 100", i),
                        ));
                    }

                    acc.0 += percentage;

                    if acc.0 > 100 {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            "Sum of percentages are greater than 100",
                        ));
                    }

                    acc.1.push(percentage);

                    Ok(acc)
                })
                .map(|v| v.1)
        }
    };
}

percentages_parser!(four_percentages_parser, 4);

#[derive(Debug, Parser, Clone)]
pub struct Options {
    #[command(flatten, next_help_heading = "Global Options")]
    pub global: GlobalOptions,

    #[command(flatten, next_help_heading = "Report Options")]
    pub report: ReportOptions,

    #[command(flatten, next_help_heading = "Test Suite Options")]
    pub test_suite: TestSuiteOptions,

    #[command(flatten, next_help_heading = "Test Case Options")]
    pub test_case: TestCaseOptions,
}

impl Default for Options {
    fn default() -> Self {
        Options::try_parse_from([""]).unwrap()
    }
}

#[test]
fn options_can_be_defaulted_without_panicing() {
    Options::default();
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct GlobalOptions {
    /// Seed for all generated data, defaults to randomly generated seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Timestamp for all data to be based on, defaults to now
    #[arg(long)]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct ReportOptions {
    /// A list of report names to generate (conflicts with --report-random-count)
    #[arg(long, conflicts_with = "report_random_count")]
    pub report_names: Option<Vec<String>>,

    /// The number of reports with random names to generate (conflicts with --report-names)
    #[arg(long, default_value = "1", conflicts_with = "report_names")]
    pub report_random_count: usize,

    /// Serialize each report as a bare `testsuite` root without the
    /// top-level `testsuites` element (forces one suite per report)
    #[arg(long)]
    pub do_not_render_testsuites_element: bool,

    /// The chance of an element omitting its declared count attributes
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "0")]
    pub omit_counts_percentage: u8,

    /// The chance of an element declaring unparsable count attributes
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "0")]
    pub malformed_counts_percentage: u8,
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct TestSuiteOptions {
    /// A list of test suite names to generate (conflicts with --test-suite-random-count)
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "test_suite_random_count"
    )]
    pub test_suite_names: Option<Vec<String>>,

    /// The number of test suites with random names to generate (conflicts with --test-suite-names)
    #[arg(long, conflicts_with = "test_suite_names", default_value = "5")]
    pub test_suite_random_count: usize,

    /// The chance of a test suite containing a nested test suite
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "25")]
    pub nested_suite_percentage: u8,

    /// Maximum nesting depth of generated test suites
    #[arg(long, default_value = "2")]
    pub max_nested_depth: usize,

    /// The chance of a system out message being added to a test case
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "25")]
    pub test_case_sys_out_percentage: u8,

    /// The chance of a system error message being added to a test case
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "25")]
    pub test_case_sys_err_percentage: u8,
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct TestCaseOptions {
    /// The maximum number of test cases to generate per suite (each suite
    /// rolls its own count, so singleton-child suites occur naturally)
    #[arg(long, default_value = "10")]
    pub test_case_max_count: usize,

    /// The chance of a test case carrying a properties block
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "25")]
    pub property_percentage: u8,

    /// Inclusive range of test case durations
    #[arg(long, num_args = 1..=2, value_names = ["DURATION_RANGE_START", "DURATION_RANGE_END"], default_values = ["30s", "1m"])]
    pub test_case_duration_range: Vec<humantime::Duration>,

    /// The chance of a test case succeeding, skipping, failing, and erroring (must add up to 100)
    #[arg(long, value_parser = four_percentages_parser, default_value = "25,25,25,25")]
    pub test_case_success_to_skip_to_fail_to_error_percentage: Vec<Vec<u8>>,
}

/// One generated document plus the aggregate counts a tolerant normalizer
/// is expected to produce for it, fallback policy included.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub name: String,
    pub xml: String,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredCounts {
    Valid,
    Omitted,
    Malformed,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    tests: u64,
    failures: u64,
    errors: u64,
    skipped: u64,
}

#[derive(Debug, Clone)]
enum MockStatus {
    Pass,
    Skip,
    Fail { message: String, text: String },
    Error { message: String, text: String },
}

#[derive(Debug, Clone)]
struct MockCase {
    name: String,
    classname: String,
    time: f64,
    status: MockStatus,
    properties: Vec<(String, String)>,
    system_out: Option<String>,
    system_err: Option<String>,
}

#[derive(Debug, Clone)]
struct MockSuite {
    name: String,
    timestamp: String,
    time: f64,
    declared: DeclaredCounts,
    cases: Vec<MockCase>,
    nested: Vec<MockSuite>,
}

impl MockSuite {
    /// Counts derived from what is actually in the tree (cumulative over
    /// nested suites), which is also what a truthful emitter declares.
    fn actual(&self) -> Counts {
        let mut counts = self
            .nested
            .iter()
            .map(MockSuite::actual)
            .fold(Counts::default(), |acc, nested| Counts {
                tests: acc.tests + nested.tests,
                failures: acc.failures + nested.failures,
                errors: acc.errors + nested.errors,
                skipped: acc.skipped + nested.skipped,
            });
        counts.tests += self.cases.len() as u64;
        for case in &self.cases {
            match case.status {
                MockStatus::Pass => (),
                MockStatus::Skip => counts.skipped += 1,
                MockStatus::Fail { .. } => counts.failures += 1,
                MockStatus::Error { .. } => counts.errors += 1,
            }
        }
        counts
    }

    /// Counts after the normalizer's fallback policy: declared values when
    /// they parse, computed `tests` and zeroed failure counts otherwise.
    fn expected(&self) -> Counts {
        let actual = self.actual();
        match self.declared {
            DeclaredCounts::Valid => actual,
            DeclaredCounts::Omitted | DeclaredCounts::Malformed => Counts {
                tests: actual.tests,
                failures: 0,
                errors: 0,
                skipped: 0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct JunitMock {
    seed: u64,
    options: Options,

    // state for generating reports
    rng: StdRng,
    timestamp: DateTime<FixedOffset>,
}

impl JunitMock {
    pub fn new(options: Options) -> Self {
        let (seed, rng) = JunitMock::rng_from_seed(&options);
        let timestamp = options.global.timestamp.unwrap_or_default();
        Self {
            seed,
            options,
            rng,
            timestamp,
        }
    }

    fn rng_from_seed(options: &Options) -> (u64, StdRng) {
        let seed = options.global.seed.unwrap_or_else(rand::random);
        (seed, StdRng::seed_from_u64(seed))
    }

    pub fn set_options(&mut self, options: Options) {
        let (seed, rng) = JunitMock::rng_from_seed(&options);
        self.seed = seed;
        self.rng = rng;
        self.options = options;
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn generate_reports(&mut self) -> Result<Vec<GeneratedReport>> {
        self.timestamp = self
            .options
            .global
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().fixed_offset());

        self.options
            .report
            .report_names
            .as_ref()
            .cloned()
            .map(|mut report_names| {
                report_names.shuffle(&mut self.rng);
                report_names
            })
            .unwrap_or_else(|| {
                (0..self.options.report.report_random_count)
                    .map(|_| fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng))
                    .collect()
            })
            .into_iter()
            .map(|report_name| self.generate_report(report_name))
            .collect()
    }

    pub fn write_reports_to_file<T: AsRef<Path>, U: AsRef<[GeneratedReport]>>(
        &self,
        directory: T,
        reports: U,
    ) -> Result<Vec<PathBuf>> {
        reports.as_ref().iter().enumerate().try_fold(
            Vec::new(),
            |mut acc, (i, report)| -> Result<Vec<PathBuf>> {
                let path = directory.as_ref().join(format!("junit-{}.xml", i));
                let mut file = File::create(&path)?;
                file.write_all(report.xml.as_bytes())?;
                acc.push(path);
                Ok(acc)
            },
        )
    }

    fn generate_report(&mut self, name: String) -> Result<GeneratedReport> {
        let bare_root = self.options.report.do_not_render_testsuites_element;
        let suite_count = if bare_root { 1 } else { usize::MAX };
        let suites = self.generate_test_suites(suite_count);

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let totals = if bare_root {
            let suite = suites.first().expect("bare root forces one suite");
            self.write_suite(&mut writer, suite)?;
            suite.expected()
        } else {
            let declared = self.roll_declared_counts();
            let declared_totals = suites
                .iter()
                .map(MockSuite::actual)
                .fold(Counts::default(), |acc, c| Counts {
                    tests: acc.tests + c.tests,
                    failures: acc.failures + c.failures,
                    errors: acc.errors + c.errors,
                    skipped: acc.skipped + c.skipped,
                });
            let fallback_totals = suites
                .iter()
                .map(MockSuite::expected)
                .fold(Counts::default(), |acc, c| Counts {
                    tests: acc.tests + c.tests,
                    failures: acc.failures + c.failures,
                    errors: acc.errors + c.errors,
                    skipped: acc.skipped + c.skipped,
                });

            let mut start = BytesStart::new("testsuites");
            start.push_attribute(("name", name.as_str()));
            start.push_attribute(("timestamp", self.timestamp.to_rfc3339().as_str()));
            let time: f64 = suites.iter().map(|s| s.time).sum();
            start.push_attribute(("time", format!("{:.3}", time).as_str()));
            self.push_count_attributes(&mut start, declared, &declared_totals);
            writer.write_event(Event::Start(start))?;
            for suite in &suites {
                self.write_suite(&mut writer, suite)?;
            }
            writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

            match declared {
                DeclaredCounts::Valid => declared_totals,
                DeclaredCounts::Omitted | DeclaredCounts::Malformed => fallback_totals,
            }
        };

        let xml = String::from_utf8(writer.into_inner())?;
        Ok(GeneratedReport {
            name,
            xml,
            tests: totals.tests,
            failures: totals.failures,
            errors: totals.errors,
            skipped: totals.skipped,
        })
    }

    fn generate_test_suites(&mut self, max_count: usize) -> Vec<MockSuite> {
        self.options
            .test_suite
            .test_suite_names
            .as_ref()
            .cloned()
            .map(|mut test_suite_names| {
                test_suite_names.shuffle(&mut self.rng);
                test_suite_names
            })
            .unwrap_or_else(|| {
                (0..self.options.test_suite.test_suite_random_count)
                    .map(|_| fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng))
                    .collect()
            })
            .into_iter()
            .take(max_count)
            .map(|name| self.generate_test_suite(name, 0))
            .collect()
    }

    fn generate_test_suite(&mut self, name: String, depth: usize) -> MockSuite {
        let timestamp = self.timestamp.to_rfc3339();
        let cases = self.generate_test_cases();
        let time = cases.iter().map(|c| c.time).sum();

        let nested = if depth < self.options.test_suite.max_nested_depth
            && self.rand_bool(self.options.test_suite.nested_suite_percentage)
        {
            let nested_name: String =
                fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng);
            vec![self.generate_test_suite(nested_name, depth + 1)]
        } else {
            Vec::new()
        };

        MockSuite {
            name,
            timestamp,
            time,
            declared: self.roll_declared_counts(),
            cases,
            nested,
        }
    }

    fn generate_test_cases(&mut self) -> Vec<MockCase> {
        let count = self
            .rng
            .gen_range(1..=self.options.test_case.test_case_max_count.max(1));
        (0..count)
            .map(|_| {
                let name: String =
                    fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng);
                let classname: String =
                    fake::faker::filesystem::en::DirPath().fake_with_rng(&mut self.rng);
                let status = self.generate_test_case_status();
                let duration = if matches!(status, MockStatus::Skip) {
                    Duration::default()
                } else {
                    self.fake_duration(self.options.test_case.test_case_duration_range.clone())
                };
                self.timestamp += duration;

                let properties = if self.rand_bool(self.options.test_case.property_percentage) {
                    (0..self.rng.gen_range(1..=3))
                        .map(|_| {
                            (
                                fake::faker::lorem::en::Word().fake_with_rng(&mut self.rng),
                                self.fake_sentence(),
                            )
                        })
                        .collect()
                } else {
                    Vec::new()
                };

                let system_out = self
                    .rand_bool(self.options.test_suite.test_case_sys_out_percentage)
                    .then(|| self.fake_paragraphs());
                let system_err = self
                    .rand_bool(self.options.test_suite.test_case_sys_err_percentage)
                    .then(|| self.fake_paragraphs());

                MockCase {
                    name,
                    classname,
                    time: duration.as_secs_f64(),
                    status,
                    properties,
                    system_out,
                    system_err,
                }
            })
            .collect()
    }

    fn generate_test_case_status(&mut self) -> MockStatus {
        let rand_percentage = self.rand_percentage();
        let mut total = 0_u8;
        for (i, percentage) in self
            .options
            .test_case
            .test_case_success_to_skip_to_fail_to_error_percentage
            .iter()
            .flatten()
            .enumerate()
        {
            let new_total = total + percentage;
            if (total..=new_total).contains(&rand_percentage) {
                return match i {
                    0 => MockStatus::Pass,
                    1 => MockStatus::Skip,
                    2 => MockStatus::Fail {
                        message: self.fake_sentence(),
                        text: self.fake_paragraphs(),
                    },
                    3 => MockStatus::Error {
                        message: self.fake_sentence(),
                        text: self.fake_paragraphs(),
                    },
                    _ => unreachable!("only 4 percentages are valid"),
                };
            }
            total = new_total;
        }
        unreachable!("invalid percentage of test case status")
    }

    fn roll_declared_counts(&mut self) -> DeclaredCounts {
        if self.rand_bool(self.options.report.malformed_counts_percentage) {
            DeclaredCounts::Malformed
        } else if self.rand_bool(self.options.report.omit_counts_percentage) {
            DeclaredCounts::Omitted
        } else {
            DeclaredCounts::Valid
        }
    }

    fn push_count_attributes(
        &mut self,
        start: &mut BytesStart,
        declared: DeclaredCounts,
        counts: &Counts,
    ) {
        match declared {
            DeclaredCounts::Omitted => (),
            DeclaredCounts::Valid => {
                start.push_attribute(("tests", counts.tests.to_string().as_str()));
                start.push_attribute(("failures", counts.failures.to_string().as_str()));
                start.push_attribute(("errors", counts.errors.to_string().as_str()));
                start.push_attribute(("skipped", counts.skipped.to_string().as_str()));
            }
            DeclaredCounts::Malformed => {
                const GARBAGE: [&str; 4] = ["NaN", "unknown", "-1", ""];
                for attr in ["tests", "failures", "errors", "skipped"] {
                    let garbage = GARBAGE[self.rng.gen_range(0..GARBAGE.len())];
                    start.push_attribute((attr, garbage));
                }
            }
        }
    }

    fn write_suite(&mut self, writer: &mut Writer<Vec<u8>>, suite: &MockSuite) -> Result<()> {
        let mut start = BytesStart::new("testsuite");
        start.push_attribute(("name", suite.name.as_str()));
        start.push_attribute(("timestamp", suite.timestamp.as_str()));
        start.push_attribute(("time", format!("{:.3}", suite.time).as_str()));
        let actual = suite.actual();
        self.push_count_attributes(&mut start, suite.declared, &actual);
        writer.write_event(Event::Start(start))?;

        for case in &suite.cases {
            self.write_case(writer, case)?;
        }
        for nested in &suite.nested {
            self.write_suite(writer, nested)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
        Ok(())
    }

    fn write_case(&mut self, writer: &mut Writer<Vec<u8>>, case: &MockCase) -> Result<()> {
        let mut start = BytesStart::new("testcase");
        start.push_attribute(("name", case.name.as_str()));
        start.push_attribute(("classname", case.classname.as_str()));
        start.push_attribute(("time", format!("{:.3}", case.time).as_str()));

        let is_bare = matches!(case.status, MockStatus::Pass)
            && case.properties.is_empty()
            && case.system_out.is_none()
            && case.system_err.is_none();
        if is_bare {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;

        if !case.properties.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("properties")))?;
            for (name, value) in &case.properties {
                let mut property = BytesStart::new("property");
                property.push_attribute(("name", name.as_str()));
                property.push_attribute(("value", value.as_str()));
                writer.write_event(Event::Empty(property))?;
            }
            writer.write_event(Event::End(BytesEnd::new("properties")))?;
        }

        match &case.status {
            MockStatus::Pass => (),
            MockStatus::Skip => {
                writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
            }
            MockStatus::Fail { message, text } => {
                self.write_detail(writer, "failure", message, text)?;
            }
            MockStatus::Error { message, text } => {
                self.write_detail(writer, "error", message, text)?;
            }
        }

        if let Some(system_out) = &case.system_out {
            writer.write_event(Event::Start(BytesStart::new("system-out")))?;
            writer.write_event(Event::Text(BytesText::new(system_out)))?;
            writer.write_event(Event::End(BytesEnd::new("system-out")))?;
        }
        if let Some(system_err) = &case.system_err {
            writer.write_event(Event::Start(BytesStart::new("system-err")))?;
            writer.write_event(Event::Text(BytesText::new(system_err)))?;
            writer.write_event(Event::End(BytesEnd::new("system-err")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("testcase")))?;
        Ok(())
    }

    fn write_detail(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        tag: &str,
        message: &str,
        text: &str,
    ) -> Result<()> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(("message", message));
        start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn fake_sentence(&mut self) -> String {
        let sentences: Vec<String> =
            fake::faker::lorem::en::Sentences(1..2).fake_with_rng(&mut self.rng);
        sentences.join(" ")
    }

    fn fake_paragraphs(&mut self) -> String {
        let paragraphs: Vec<String> =
            fake::faker::lorem::en::Paragraphs(1..3).fake_with_rng(&mut self.rng);
        paragraphs.join("\n")
    }

    fn fake_duration<T: AsRef<[humantime::Duration]>>(&mut self, range: T) -> Duration {
        let range_start = range
            .as_ref()
            .first()
            .expect("must have start range for duration")
            .as_nanos();
        let range_end = range
            .as_ref()
            .get(1)
            .expect("must have end range for duration")
            .as_nanos();
        let rand_duration_ns = self.rng.gen_range(range_start..=range_end);
        Duration::new(0, rand_duration_ns as u32)
    }

    fn rand_bool<T: Into<f64>>(&mut self, percentage_chance: T) -> bool {
        self.rng.gen_bool(percentage_chance.into() / 100.0)
    }

    fn rand_percentage(&mut self) -> u8 {
        self.rng.gen_range(0..=100)
    }
}
