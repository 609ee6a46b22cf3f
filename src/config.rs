use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::arxiv::{
    ArxivClient, SearchTool, DEFAULT_ABSTRACT_CHARS, DEFAULT_API_URL, DEFAULT_MAX_RESULTS,
};
use crate::error::{Error, Result};
use crate::llm::{
    LanguageModel, OllamaModel, OpenAiModel, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL,
};
use crate::pipeline::Pipeline;
use crate::report::DEFAULT_REPORT_FILE;

const ARXIV_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Openai,
    Ollama,
}

// CL arguments for config
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "ArXiv research tool: turns a research wish into a curated, explained paper list",
    long_about = None
)]
pub struct Args {
    /// Run once for this research interest and print the papers instead of serving the web UI
    #[arg(short, long)]
    pub wish: Option<String>,

    #[arg(short, long, default_value_t = 8501)]
    pub port: u16,

    #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = Provider::Openai)]
    pub provider: Provider,

    /// Defaults to gpt-4o-mini for OpenAI and llama3.2:latest for Ollama
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long, default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_API_URL)]
    pub arxiv_url: String,

    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: usize,

    #[arg(long, default_value_t = DEFAULT_ABSTRACT_CHARS)]
    pub abstract_chars: usize,

    /// Timeout for a single language model call
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn model_name(&self) -> String {
        match (&self.model, self.provider) {
            (Some(model), _) if !model.trim().is_empty() => model.trim().to_string(),
            (_, Provider::Openai) => DEFAULT_OPENAI_MODEL.to_string(),
            (_, Provider::Ollama) => DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }

    pub async fn build_model(&self) -> Result<Arc<dyn LanguageModel>> {
        let timeout = Duration::from_secs(self.timeout_secs.max(1));
        match self.provider {
            Provider::Openai => {
                let key = self.openai_api_key.as_deref().ok_or_else(|| {
                    Error::Config(
                        "OPENAI_API_KEY is required for the openai provider (or use --provider ollama)"
                            .into(),
                    )
                })?;
                let model =
                    OpenAiModel::new(&self.openai_base_url, key, &self.model_name(), timeout)?;
                Ok(Arc::new(model))
            }
            Provider::Ollama => {
                let model = OllamaModel::new(&self.ollama_url, &self.model_name(), timeout)?;
                model.probe().await;
                Ok(Arc::new(model))
            }
        }
    }

    pub fn build_search_tool(&self) -> Result<SearchTool> {
        let client = ArxivClient::new(&self.arxiv_url, ARXIV_TIMEOUT)?;
        Ok(SearchTool::new(Arc::new(client)).with_limits(self.max_results, self.abstract_chars))
    }

    pub async fn build_pipeline(&self) -> Result<Pipeline> {
        let llm = self.build_model().await?;
        Ok(Pipeline::new(llm, self.build_search_tool()?, self.output.clone()))
    }
}
