use std::path::{Path, PathBuf};

use anyhow::Context;
use report::junit::normalize::normalize;
use report::junit::report::JunitReport;
use report::junit::xml::parse_document;

/// One successfully loaded file, the unit a viewer tab is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReport {
    pub path: PathBuf,
    pub file_name: String,
    pub report: JunitReport,
}

/// Loads files one at a time, in the given order. A file that cannot be
/// read, parsed, or recognized as JUnit XML is logged and skipped; the
/// rest of the batch is unaffected.
pub async fn load_reports<P: AsRef<Path>>(paths: &[P]) -> Vec<LoadedReport> {
    let mut loaded = Vec::new();
    for path in paths {
        match load_report(path.as_ref()).await {
            Ok(report) => loaded.push(report),
            Err(e) => log::warn!("skipping {}: {:#}", path.as_ref().display(), e),
        }
    }
    loaded
}

pub async fn load_report(path: &Path) -> anyhow::Result<LoadedReport> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let raw = parse_document(contents.as_bytes())
        .with_context(|| format!("could not parse {}", path.display()))?;
    let report = normalize(&raw)
        .with_context(|| format!("{} is not a JUnit report", path.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedReport {
        path: path.to_path_buf(),
        file_name,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn one_bad_file_does_not_sink_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        fs::write(
            &good,
            r#"<testsuite name="s"><testcase name="a"/></testsuite>"#,
        )
        .unwrap();
        let not_junit = dir.path().join("coverage.xml");
        fs::write(&not_junit, r#"<coverage line-rate="1.0"/>"#).unwrap();
        let missing = dir.path().join("missing.xml");

        let loaded = load_reports(&[good.clone(), not_junit, missing]).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, good);
        assert_eq!(loaded[0].file_name, "good.xml");
        assert_eq!(loaded[0].report.tests, 1);
    }

    #[tokio::test]
    async fn malformed_xml_is_contained_to_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let truncated = dir.path().join("truncated.xml");
        fs::write(&truncated, r#"<testsuite name="s"><testcase"#).unwrap();

        let loaded = load_reports(&[truncated]).await;
        assert!(loaded.is_empty());
    }
}
