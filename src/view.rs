use std::path::PathBuf;

use clap::Args;
use constants::{EXIT_FAILURE, EXIT_SUCCESS};
use display::{render_report, RenderOptions};
use report::junit::filter::StatusFilter;
use report::junit::report::{JunitReport, TestStatus};

use crate::loader::load_reports;
use crate::recent::RecentStore;

#[derive(Args, Clone, Debug)]
pub struct ViewArgs {
    #[arg(required = true, help = "JUnit XML files to open.")]
    paths: Vec<PathBuf>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated statuses to show (passed, failed, error, skipped). No value shows everything."
    )]
    filter: Vec<TestStatus>,
    #[arg(long, help = "Include captured system-out/system-err blocks.")]
    show_output: bool,
    #[arg(long, help = "Emit the normalized report trees as JSON.")]
    json: bool,
}

pub async fn run_view(view_args: ViewArgs) -> anyhow::Result<i32> {
    let ViewArgs {
        paths,
        filter,
        show_output,
        json,
    } = view_args;

    let loaded = load_reports(&paths).await;
    if loaded.is_empty() {
        log::error!("none of the {} provided files produced a report", paths.len());
        return Ok(EXIT_FAILURE);
    }
    if loaded.len() < paths.len() {
        log::warn!("loaded {} of {} files", loaded.len(), paths.len());
    }

    let mut recent = RecentStore::open();
    for report in &loaded {
        recent.touch(&report.path);
    }
    recent.save();

    if json {
        let reports: Vec<&JunitReport> = loaded.iter().map(|l| &l.report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(EXIT_SUCCESS);
    }

    let options = RenderOptions {
        filter: StatusFilter::new(filter),
        show_output,
    };
    for (i, loaded_report) in loaded.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("── {}", loaded_report.file_name);
        print!("{}", render_report(&loaded_report.report, &options));
    }
    Ok(EXIT_SUCCESS)
}
