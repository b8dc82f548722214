//! The download pipeline: enumerate, filter, fetch, aggregate, write.
//!
//! Single thread of control, every network call is synchronous; the batch
//! runs to completion or aborts on the first fatal error.
//!

use std::path::Path;

use eyre::Result;
use tracing::{info, warn};

use irida_client::{day_of, filter_by_range, IridaClient};

use crate::{Opts, OutputContext, SheetSet};

/// Drive one full export for a project.
///
pub fn download_all_results(
    client: &mut IridaClient,
    opts: &Opts,
    from_ms: i64,
    to_ms: i64,
) -> Result<()> {
    let project = opts.project;
    info!(
        "Requesting completed amr analysis submissions for project id [{project}]. \
         This may take a while..."
    );
    let results = client.completed_amr_results(project)?;
    if results.is_empty() {
        warn!("No completed amr analysis results for project id [{project}].");
        return Ok(());
    }

    let results = filter_by_range(results, from_ms, to_ms);
    if results.is_empty() {
        warn!(
            "No completed amr analysis created from [{}] to [{}]. Exiting..",
            day_of(from_ms),
            day_of(to_ms)
        );
        return Ok(());
    }

    let prefix = opts.output.strip_suffix(".xlsx").unwrap_or(&opts.output);
    let ctx = OutputContext::create(Path::new("."), prefix)?;

    if opts.split {
        info!("Split mode: Writing each analysis into its own output file...");
        for result in &results {
            info!("Creating a file for analysis [{}].", result.name);
            let files = client.result_files(&result.identifier)?;
            let mut sheets = SheetSet::new();
            sheets.accumulate(&files)?;
            let path = ctx.split_path(result.created_date)?;
            sheets.write_workbook(&path)?;
        }
    } else {
        info!("Aggregate mode: Writing all results data in one output file...");
        let mut sheets = SheetSet::new();
        for result in &results {
            info!("Appending analysis [{}].", result.name);
            let files = client.result_files(&result.identifier)?;
            sheets.accumulate(&files)?;
        }
        sheets.write_workbook(&ctx.aggregate_path())?;
    }

    info!("Download complete for project id [{project}].");
    Ok(())
}
