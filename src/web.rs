// Browser front end: one text box, one button, a list of paper cards.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::Error;
use crate::paper::{PaperReport, SelectedPaper};
use crate::pipeline::Pipeline;
use crate::progress::LogBuffer;
use crate::report::read_report;

#[derive(Debug, Serialize)]
struct StatusMessage {
    status: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    status: String,
    message: String,
    query: String,
    papers: Vec<SelectedPaper>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    wish: String,
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    logs: LogBuffer,
    // One run at a time: every run overwrites the same report file.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    fn new(pipeline: Pipeline, logs: LogBuffer) -> Self {
        Self {
            pipeline: Arc::new(pipeline.with_logs(logs.clone())),
            logs,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

fn status_reply(code: StatusCode, status: &str, message: impl Into<String>) -> Response {
    warp::reply::with_status(
        warp::reply::json(&StatusMessage {
            status: status.to_string(),
            message: message.into(),
        }),
        code,
    )
    .into_response()
}

fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(index_html()));

    let search = warp::post()
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(run_search);

    let results = warp::get()
        .and(warp::path("results"))
        .and(warp::path::end())
        .and(state_filter.clone())
        .and_then(get_results);

    let get_logs = warp::get()
        .and(warp::path("logs"))
        .and(warp::path::end())
        .and(state_filter)
        .map(|state: AppState| warp::reply::json(&state.logs.snapshot()));

    index.or(search).or(results).or(get_logs)
}

pub async fn start_web_server(pipeline: Pipeline, logs: LogBuffer, port: u16) {
    let routes = routes(AppState::new(pipeline, logs));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Web interface running on http://{addr}");
    warp::serve(routes).run(addr).await;
}

async fn run_search(request: SearchRequest, state: AppState) -> Result<Response, Rejection> {
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Ok(status_reply(
            StatusCode::CONFLICT,
            "busy",
            "A search is already running, wait for it to finish",
        ));
    };

    match state.pipeline.kickoff(&request.wish).await {
        Ok(summary) => {
            let count = summary.report.papers.len();
            let reply = SearchResponse {
                status: "ok".to_string(),
                message: format!("Search complete! {count} papers selected."),
                query: summary.query,
                papers: summary.report.papers,
            };
            Ok(warp::reply::json(&reply).into_response())
        }
        Err(Error::EmptyWish) => Ok(status_reply(
            StatusCode::BAD_REQUEST,
            "error",
            "Enter a research query first",
        )),
        Err(e) => {
            state.logs.push(&format!("Search error: {e}"));
            Ok(status_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("An error occurred: {e}"),
            ))
        }
    }
}

async fn get_results(state: AppState) -> Result<impl Reply, Rejection> {
    let report = match read_report(state.pipeline.output()) {
        Ok(report) => report,
        Err(e) => {
            debug!(error = %e, "no readable report yet");
            PaperReport::default()
        }
    };
    Ok(warp::reply::json(&report))
}

pub fn index_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>ArXiv Research Tool</title>
    <style>
        body { font-family: Arial; margin: 20px; background: #f5f5f5; min-height: 100vh; display: flex; flex-direction: column; }
        .content { flex: 1; max-width: 900px; }
        h1 { color: #333; }

        .status-message { padding: 10px; margin: 10px 0; display: none; }
        .status-message.success { background: #d4edda; color: #155724; border: 1px solid #c3e6cb; }
        .status-message.error { background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }

        .search-form { background: white; padding: 20px; }
        .search-form label { display: block; margin: 0 0 8px 0; font-weight: bold; }
        textarea { width: 100%; box-sizing: border-box; min-height: 90px; padding: 8px; font-family: Arial; }

        button { padding: 8px 16px; background: rgb(100, 149, 237); color: white; border: none; cursor: pointer; margin-top: 10px; }
        button:hover { background: #5a8dd4; }
        button:disabled { background: #9bb5e0; cursor: wait; }

        .loading { display: none; padding: 10px; background: #fff3cd; border: 1px solid #ffc107; margin: 10px 0; }
        .loading.active { display: block; }

        .query { color: #666; font-size: 14px; margin: 10px 0; }

        .paper { background: white; padding: 15px; margin: 10px 0; border: 1px solid #ddd; }
        .paper h3 { margin: 0 0 10px 0; }
        .paper a { color: #007bff; text-decoration: none; }
        .paper a:hover { text-decoration: underline; }
        .info { color: #666; font-size: 14px; margin: 4px 0; }
        .abstract { margin-top: 10px; padding: 10px; background: #f9f9f9; border-left: 3px solid #007bff; font-size: 14px; }
        .why { margin-top: 10px; padding: 10px; background: #eef7ee; border-left: 3px solid #28a745; font-size: 14px; }

        .log-container { background: #1e1e1e; color: #d4d4d4; padding: 10px; max-height: 200px; overflow-y: auto; font-family: 'Courier New', monospace; font-size: 12px; margin-top: 10px; display: none; }
        .log-container.active { display: block; }

        footer { margin-top: 40px; padding: 20px; text-align: center; color: black; }
    </style>
</head>
<body>
    <div class="content">
        <h1>ArXiv Research Tool</h1>
        <p>An interactive tool to explore research papers related to engineering, computer science, and healthcare from ArXiv.</p>

        <div class="search-form">
            <h2>Search for Research Papers</h2>
            <label for="wish">Enter your research query (e.g., 'Mitigating AI bias in medical imaging'):</label>
            <textarea id="wish"></textarea>
            <button id="search-button" onclick="searchPapers()">Search Papers</button>
        </div>

        <div id="status-message" class="status-message"></div>
        <div id="loading" class="loading">Fetching and processing research papers...</div>
        <div id="log-container" class="log-container"></div>

        <div id="query" class="query"></div>
        <div id="papers"></div>
    </div>

    <footer>
        <p>Built with Rust, warp and the ArXiv API.</p>
    </footer>

    <script>
        let logInterval;

        function escapeHtml(value) {
            const div = document.createElement('div');
            div.textContent = value == null ? '' : String(value);
            return div.innerHTML;
        }

        function safeUrl(value) {
            const url = String(value || '');
            return /^https?:\/\//i.test(url) ? url : '#';
        }

        function showStatusMessage(message, isSuccess) {
            const element = document.getElementById('status-message');
            element.textContent = message;
            element.className = 'status-message ' + (isSuccess ? 'success' : 'error');
            element.style.display = 'block';
        }

        function renderPapers(papers) {
            const container = document.getElementById('papers');
            container.innerHTML = '';

            if (!papers || papers.length === 0) {
                container.innerHTML = '<p>No papers selected yet.</p>';
                return;
            }

            papers.forEach(paper => {
                const authors = Array.isArray(paper.authors) ? paper.authors.join(', ') : paper.authors;
                const div = document.createElement('div');
                div.className = 'paper';
                div.innerHTML = `
                    <h3>${escapeHtml(paper.title)}</h3>
                    <div class="info"><b>Authors:</b> ${escapeHtml(authors)}</div>
                    <div class="info"><b>Published:</b> ${escapeHtml(paper.published)}</div>
                    <div class="abstract"><b>Abstract:</b> ${escapeHtml(paper.abstract)}</div>
                    <div class="info"><a href="${escapeHtml(safeUrl(paper.PDF))}" target="_blank" rel="noopener">PDF Link</a></div>
                    <div class="why"><b>Why Selected:</b> ${escapeHtml(paper.explanation)}</div>
                `;
                container.appendChild(div);
            });
        }

        function loadLogs() {
            fetch('/logs')
                .then(r => r.json())
                .then(logs => {
                    const container = document.getElementById('log-container');
                    container.innerHTML = '';
                    logs.slice(-50).forEach(log => {
                        const div = document.createElement('div');
                        div.textContent = log;
                        container.appendChild(div);
                    });
                    container.scrollTop = container.scrollHeight;
                })
                .catch(() => {});
        }

        function setBusy(busy) {
            document.getElementById('search-button').disabled = busy;
            document.getElementById('loading').classList.toggle('active', busy);
            document.getElementById('log-container').classList.toggle('active', busy);
            if (busy) {
                loadLogs();
                logInterval = setInterval(loadLogs, 2000);
            } else if (logInterval) {
                clearInterval(logInterval);
            }
        }

        async function searchPapers() {
            const wish = document.getElementById('wish').value;
            document.getElementById('status-message').style.display = 'none';
            setBusy(true);

            try {
                const response = await fetch('/search', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ wish: wish })
                });
                const data = await response.json();

                if (data.status === 'ok') {
                    showStatusMessage(data.message + ' Here are the selected papers:', true);
                    document.getElementById('query').textContent = 'Query used: ' + data.query;
                    renderPapers(data.papers);
                } else {
                    showStatusMessage(data.message, false);
                }
            } catch (err) {
                showStatusMessage('Something went wrong: ' + err, false);
            } finally {
                setBusy(false);
            }
        }

        function loadResults() {
            fetch('/results')
                .then(r => r.json())
                .then(data => renderPapers(data.papers))
                .catch(err => showStatusMessage('Could not load previous results: ' + err, false));
        }

        loadResults();
    </script>
</body>
</html>"#
        .to_string()
}
