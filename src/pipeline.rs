//! The four sequential stages: query, retrieval, selection, report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{
    GENERATE_QUERY, JSON_WRITER, MODERATOR, QUERY_ENGINEER, SELECT_AND_EXPLAIN, WRITE_JSON,
};
use crate::arxiv::{Retrieval, SearchTool};
use crate::error::{Error, Result};
use crate::llm::LanguageModel;
use crate::paper::{PaperReport, SelectedPaper};
use crate::progress::LogBuffer;
use crate::report::{read_report, write_report};
use crate::selection::{clean_query, ground_selection, parse_selection};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub query: String,
    pub candidates: usize,
    pub report: PaperReport,
    pub output: PathBuf,
}

pub struct Pipeline {
    llm: Arc<dyn LanguageModel>,
    search: SearchTool,
    output: PathBuf,
    logs: Option<LogBuffer>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: SearchTool,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            search,
            output: output.into(),
            logs: None,
        }
    }

    pub fn with_logs(mut self, logs: LogBuffer) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn note(&self, message: &str) {
        info!("{message}");
        if let Some(logs) = &self.logs {
            logs.push(message);
        }
    }

    /// Runs every stage in order and returns the report as read back from disk.
    pub async fn kickoff(&self, wish: &str) -> Result<RunSummary> {
        let wish = wish.trim();
        if wish.is_empty() {
            return Err(Error::EmptyWish);
        }
        self.note(&format!("Starting run with {} for: {wish}", self.llm.describe()));

        let query = self.generate_query(wish).await?;
        let retrieval = self.retrieve(&query).await;
        let selected = self.select_and_explain(wish, &retrieval).await?;
        self.write(selected)?;

        let report = read_report(&self.output)?;
        self.note(&format!(
            "Run complete: {} papers written to {}",
            report.papers.len(),
            self.output.display()
        ));

        Ok(RunSummary {
            query,
            candidates: retrieval.papers.len(),
            report,
            output: self.output.clone(),
        })
    }

    pub async fn generate_query(&self, wish: &str) -> Result<String> {
        self.note("[1/4] Generating search query");
        let raw = self
            .llm
            .complete(&QUERY_ENGINEER.system_prompt(wish), &GENERATE_QUERY.prompt(wish, ""))
            .await?;
        let query = clean_query(&raw, wish);
        self.note(&format!("Query: {query}"));
        Ok(query)
    }

    pub async fn retrieve(&self, query: &str) -> Retrieval {
        self.note("[2/4] Searching arXiv");
        let retrieval = self.search.search(query).await;
        if retrieval.papers.is_empty() {
            self.note(&format!("No papers retrieved: {}", retrieval.listing));
        } else {
            self.note(&format!("Retrieved {} unique papers", retrieval.papers.len()));
        }
        retrieval
    }

    pub async fn select_and_explain(
        &self,
        wish: &str,
        retrieval: &Retrieval,
    ) -> Result<Vec<SelectedPaper>> {
        self.note("[3/4] Selecting and explaining papers");
        if retrieval.papers.is_empty() {
            self.note("Nothing to select from, skipping the moderator");
            return Ok(Vec::new());
        }

        let context = format!("Query used: {}\n\n{}", retrieval.query, retrieval.listing);
        let raw = self
            .llm
            .complete(&MODERATOR.system_prompt(wish), &SELECT_AND_EXPLAIN.prompt(wish, &context))
            .await?;

        let parsed = match parse_selection(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "moderator answer is not usable JSON");
                self.note(
                    "Moderator answer was not valid JSON, asking the JSON writer to restructure it",
                );
                let fixed = self
                    .llm
                    .complete(&JSON_WRITER.system_prompt(wish), &WRITE_JSON.prompt(wish, &raw))
                    .await?;
                parse_selection(&fixed)?
            }
        };

        let selected = ground_selection(parsed, &retrieval.papers);
        self.note(&format!(
            "Selected {} of {} papers",
            selected.len(),
            retrieval.papers.len()
        ));
        Ok(selected)
    }

    pub fn write(&self, papers: Vec<SelectedPaper>) -> Result<PaperReport> {
        self.note("[4/4] Writing report");
        let report = PaperReport { papers };
        write_report(&self.output, &report)?;
        Ok(report)
    }
}
