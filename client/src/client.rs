//! The high-level IRIDA operations: enumerate the completed AMR results of
//! a project and download their output files.
//!

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, error, info, warn};

use crate::{
    fetch_envelope, resolve, AnalysisResult, AnalysisState, AnalysisSubmission, ClientError,
    FileKey, ResourceMatch, ResultFile, Session,
};

/// Metadata half of an output file fetch, only the label matters.
///
#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    label: String,
}

/// Read-only client over one IRIDA instance.
///
/// The top-level `projects` and `analysisSubmissions` URLs are resolved
/// once and cached for the lifetime of the client, as is the result-id to
/// submission-id index the file downloads need (output files are addressed
/// through the submission, not the result).
///
pub struct IridaClient {
    session: Session,
    projects_url: Option<String>,
    submissions_url: Option<String>,
    /// result id -> submission id
    submission_ids: HashMap<String, String>,
}

impl IridaClient {
    pub fn new(session: Session) -> Self {
        IridaClient {
            session,
            projects_url: None,
            submissions_url: None,
            submission_ids: HashMap::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// All COMPLETED analysis results of AMR detection type in a project.
    ///
    /// An empty project is expected and yields an empty list with a
    /// warning; an unknown project id is [`ClientError::ResourceNotFound`].
    ///
    pub fn completed_amr_results(
        &mut self,
        project_id: i64,
    ) -> Result<Vec<AnalysisResult>, ClientError> {
        info!("Requesting project [{project_id}]'s analysis submissions.");
        let submissions = self.project_analysis_submissions(project_id)?;

        let mut results = vec![];
        for submission in &submissions {
            if submission.analysis_state != AnalysisState::Completed {
                debug!(
                    "Skipping submission [{}], state {:?}.",
                    submission.identifier, submission.analysis_state
                );
                continue;
            }
            let result = match self.analysis_result(&submission.identifier)? {
                Some(result) => result,
                None => continue,
            };
            if result.is_amr() {
                self.submission_ids
                    .insert(result.identifier.clone(), submission.identifier.clone());
                results.push(result);
            }
        }

        if results.is_empty() {
            warn!("No Completed AMR Detection type found in project [{project_id}].");
        }
        Ok(results)
    }

    /// Download the output files of one completed AMR analysis.
    ///
    /// A missing pointfinder output is normal (PointFinder can be disabled
    /// per run) and skipped silently; any other missing file is logged as
    /// an anomaly and skipped, the batch goes on with what is there.
    ///
    pub fn result_files(&mut self, analysis_id: &str) -> Result<Vec<ResultFile>, ClientError> {
        let submission_id = match self.submission_ids.get(analysis_id) {
            Some(id) => id.clone(),
            None => return Err(ClientError::ResourceNotFound(analysis_id.to_string())),
        };
        let analysis_url = self.analysis_results_url(&submission_id)?;

        let mut files = vec![];
        for key in FileKey::iter() {
            let file_url = match resolve(&self.session, &analysis_url, &key.rel(), None) {
                Ok(url) => url,
                Err(ClientError::RelationNotFound { .. }) => {
                    if key.optional() {
                        debug!("No {key} found as one of the output files for analysis [{analysis_id}], skipping...");
                    } else {
                        error!(
                            "No {key} output exists for analysis id [{analysis_id}]. \
                             Ensure the analysis status is COMPLETED and with type AMR_DETECTION."
                        );
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            // Two fetches per file: the JSON metadata for the label, then
            // the raw contents as plain text.
            //
            let info = self.file_info(&file_url)?;
            let resp = self.session.get_with_accept(&file_url, "text/plain")?;
            let content = resp
                .bytes()
                .map_err(|e| ClientError::ResourceParse(e.to_string()))?
                .to_vec();

            debug!("Fetched {} ({} bytes)", info.label, content.len());
            files.push(ResultFile {
                key,
                label: info.label,
                content,
            });
        }
        Ok(files)
    }

    /// All analysis submissions of a project, regardless of type or state.
    ///
    fn project_analysis_submissions(
        &mut self,
        project_id: i64,
    ) -> Result<Vec<AnalysisSubmission>, ClientError> {
        let projects_url = self.projects_url()?;
        info!("Requesting {projects_url}.");

        let analyses_url = match resolve(
            &self.session,
            &projects_url,
            "project/analyses",
            Some(&ResourceMatch::new("identifier", project_id)),
        ) {
            Ok(url) => url,
            Err(ClientError::ValueNotFound(_)) => {
                error!("The given project ID doesn't exist: {project_id}");
                return Err(ClientError::ResourceNotFound(project_id.to_string()));
            }
            Err(e) => return Err(e),
        };

        info!("Requesting {analyses_url}.");
        let envelope = fetch_envelope(&self.session, &analyses_url)?;
        envelope
            .resource
            .resources
            .into_iter()
            .map(|r| {
                serde_json::from_value(r)
                    .map_err(|e| ClientError::ResourceParse(format!("analysis submission: {e}")))
            })
            .collect()
    }

    /// Result attached to a submission, `None` when the submission does
    /// not carry a decodable result.
    ///
    fn analysis_result(
        &mut self,
        submission_id: &str,
    ) -> Result<Option<AnalysisResult>, ClientError> {
        let url = self.analysis_results_url(submission_id)?;
        info!("Requesting {url}.");

        let resp = self.session.get(&url)?;
        if !resp.status().is_success() {
            return Err(ClientError::ResourceParse(format!(
                "{url} responded with {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .map_err(|e| ClientError::ResourceParse(e.to_string()))?;
        let resource = body
            .get("resource")
            .cloned()
            .ok_or_else(|| ClientError::ResourceParse(format!("{url}: no resource in response")))?;

        match serde_json::from_value::<AnalysisResult>(resource) {
            Ok(result) => Ok(Some(result)),
            Err(_) => {
                info!("No analysis result exists for analysis submission id [{submission_id}]. Moving on...");
                Ok(None)
            }
        }
    }

    /// `<analysisSubmissions>/<id>/analysis`, built by hand rather than
    /// resolved to keep the call count down.
    ///
    fn analysis_results_url(&mut self, submission_id: &str) -> Result<String, ClientError> {
        let submissions_url = self.submissions_url()?;
        Ok(format!("{submissions_url}/{submission_id}/analysis"))
    }

    fn projects_url(&mut self) -> Result<String, ClientError> {
        if let Some(url) = &self.projects_url {
            return Ok(url.clone());
        }
        let url = resolve(&self.session, self.session.base_url().as_str(), "projects", None)?;
        self.projects_url = Some(url.clone());
        Ok(url)
    }

    fn submissions_url(&mut self) -> Result<String, ClientError> {
        if let Some(url) = &self.submissions_url {
            return Ok(url.clone());
        }
        info!("Requesting analysis submissions url.");
        let url = resolve(
            &self.session,
            self.session.base_url().as_str(),
            "analysisSubmissions",
            None,
        )?;
        self.submissions_url = Some(url.clone());
        Ok(url)
    }

    fn file_info(&self, url: &str) -> Result<FileInfo, ClientError> {
        let resp = self.session.get_with_accept(url, "application/json")?;
        if !resp.status().is_success() {
            return Err(ClientError::ResourceParse(format!(
                "{url} responded with {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .map_err(|e| ClientError::ResourceParse(e.to_string()))?;
        let resource = body
            .get("resource")
            .cloned()
            .ok_or_else(|| ClientError::ResourceParse(format!("{url}: no resource in response")))?;
        serde_json::from_value(resource).map_err(|e| ClientError::ResourceParse(e.to_string()))
    }
}
