//! Typed views over the IRIDA response bodies this crate cares about.
//!

use serde::Deserialize;
use strum::{Display, EnumIter};

use crate::{Link, AMR_DETECTION};

/// Lifecycle state of an analysis submission.
///
/// The service knows more states than we enumerate; anything unrecognised
/// lands in `Unknown` and is simply never completed.
///
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisState {
    New,
    Preparing,
    Prepared,
    Submitting,
    Running,
    FinishedRunning,
    PostProcessing,
    Transferred,
    Completing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// A queued or run job, as listed under `project/analyses`.
///
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSubmission {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    pub analysis_state: AnalysisState,
    /// Epoch milliseconds.
    pub created_date: i64,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// The completed job's typed output summary, addressed separately from the
/// submission.
///
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    /// Epoch milliseconds.
    pub created_date: i64,
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisType {
    #[serde(rename = "type")]
    pub kind: String,
}

impl AnalysisResult {
    /// True for the one analysis type this tool collects.
    #[inline]
    pub fn is_amr(&self) -> bool {
        self.analysis_type.kind == AMR_DETECTION
    }
}

/// The fixed set of output artifacts a StarAMR run produces.
///
/// Iteration order is the download order, and therefore the sheet order in
/// the workbooks.
///
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, PartialEq)]
pub enum FileKey {
    #[strum(serialize = "staramr-resfinder.tsv")]
    Resfinder,
    #[strum(serialize = "staramr-detailed-summary.tsv")]
    DetailedSummary,
    #[strum(serialize = "staramr-settings.txt")]
    Settings,
    #[strum(serialize = "staramr-summary.tsv")]
    Summary,
    #[strum(serialize = "staramr-plasmidfinder.tsv")]
    Plasmidfinder,
    #[strum(serialize = "staramr-mlst.tsv")]
    Mlst,
    #[strum(serialize = "staramr-pointfinder.tsv")]
    Pointfinder,
}

impl FileKey {
    /// Worksheet this file's rows land in.
    ///
    pub fn sheet_name(self) -> &'static str {
        match self {
            FileKey::Resfinder => "ResFinder",
            FileKey::DetailedSummary => "Detailed_Summary",
            FileKey::Settings => "Settings",
            FileKey::Summary => "Summary",
            FileKey::Plasmidfinder => "PlasmidFinder",
            FileKey::Mlst => "MLST_Summary",
            FileKey::Pointfinder => "PointFinder",
        }
    }

    /// Download relation carried by the analysis resource.
    ///
    pub fn rel(self) -> String {
        format!("outputFile/{self}")
    }

    /// PointFinder can be disabled per-run, its file is allowed to be
    /// absent from an analysis.
    #[inline]
    pub fn optional(self) -> bool {
        matches!(self, FileKey::Pointfinder)
    }
}

/// One downloaded output artifact.
///
#[derive(Clone, Debug)]
pub struct ResultFile {
    pub key: FileKey,
    /// Display label from the file metadata.
    pub label: String,
    /// Raw contents, fetched with `Accept: text/plain`.
    pub content: Vec<u8>,
}
