use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Upstream {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("feed parse error: {0}")]
    Feed(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("the research wish is empty")]
    EmptyWish,
}

/// Cuts an upstream response body down to something loggable.
pub(crate) fn body_preview(body: &str) -> String {
    let trimmed = body.trim();
    let mut preview: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        preview.push('…');
    }
    preview
}
