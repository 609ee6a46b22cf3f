//! arXiv search: the Atom API client and the search tool the pipeline calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{body_preview, Error, Result};
use crate::paper::{title_key, Paper};

pub const DEFAULT_API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_MAX_RESULTS: usize = 30;
pub const DEFAULT_ABSTRACT_CHARS: usize = 700;

/// One `<entry>` of the Atom feed, before any trimming.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub summary: String,
    pub pdf_url: String,
}

/// Anything that can answer a search query with feed entries.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivEntry>>;
}

#[derive(Clone)]
pub struct ArxivClient {
    client: Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("arxiv_curator/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ArxivEntry>> {
        debug!(url = %self.base_url, query, max_results, "querying arXiv");

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "arXiv",
                status,
                body: body_preview(&body),
            });
        }

        let body = response.text().await?;
        let entries = parse_feed(&body)?;
        info!(count = entries.len(), "arXiv returned entries");
        Ok(entries)
    }
}

#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Published,
    Summary,
    AuthorName,
}

/// Parses an arXiv Atom response into entries.
///
/// arXiv reports a malformed query as a feed holding a single entry whose id
/// points at `/api/errors`; that case is turned into `Error::Feed`.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut field: Option<Field> = None;
    let mut author_name = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(ArxivEntry::default()),
                b"id" if current.is_some() => field = Some(Field::Id),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"published" if current.is_some() => field = Some(Field::Published),
                b"summary" if current.is_some() => field = Some(Field::Summary),
                b"name" if current.is_some() => {
                    author_name.clear();
                    field = Some(Field::AuthorName);
                }
                b"link" => {
                    if let Some(entry) = current.as_mut() {
                        take_pdf_link(&e, entry);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(entry) = current.as_mut() {
                        take_pdf_link(&e, entry);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| Error::Feed(e.to_string()))?;
                    let target = match f {
                        Field::Id => &mut entry.id,
                        Field::Title => &mut entry.title,
                        Field::Published => &mut entry.published,
                        Field::Summary => &mut entry.summary,
                        Field::AuthorName => &mut author_name,
                    };
                    if !target.is_empty() {
                        target.push(' ');
                    }
                    target.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(mut entry) = current.take() {
                        if entry.id.contains("/api/errors") {
                            return Err(Error::Feed(format!(
                                "arXiv rejected the query: {}",
                                entry.summary.trim()
                            )));
                        }
                        if entry.pdf_url.is_empty() && entry.id.contains("/abs/") {
                            entry.pdf_url = entry.id.replacen("/abs/", "/pdf/", 1);
                        }
                        entry.title = title_key(&entry.title);
                        entry.summary =
                            entry.summary.split_whitespace().collect::<Vec<_>>().join(" ");
                        entries.push(entry);
                    }
                    field = None;
                }
                b"name" => {
                    if let (Some(entry), Some(Field::AuthorName)) = (current.as_mut(), field) {
                        let name = author_name.trim();
                        if !name.is_empty() {
                            entry.authors.push(name.to_string());
                        }
                    }
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Feed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn take_pdf_link(e: &BytesStart<'_>, entry: &mut ArxivEntry) {
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"title" if value.eq_ignore_ascii_case("pdf") => is_pdf = true,
            b"type" if value.contains("pdf") => is_pdf = true,
            _ => {}
        }
    }
    if let (true, Some(href)) = (is_pdf, href) {
        if entry.pdf_url.is_empty() {
            entry.pdf_url = href;
        }
    }
}

/// The outcome of one retrieval step. On failure `papers` is empty and
/// `listing` holds the error text instead of paper blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub query: String,
    pub papers: Vec<Paper>,
    pub listing: String,
}

/// Fixed-cap, deduplicating, abstract-trimming wrapper around a [`PaperSource`].
#[derive(Clone)]
pub struct SearchTool {
    source: Arc<dyn PaperSource>,
    max_results: usize,
    abstract_chars: usize,
}

impl SearchTool {
    pub fn new(source: Arc<dyn PaperSource>) -> Self {
        Self {
            source,
            max_results: DEFAULT_MAX_RESULTS,
            abstract_chars: DEFAULT_ABSTRACT_CHARS,
        }
    }

    pub fn with_limits(mut self, max_results: usize, abstract_chars: usize) -> Self {
        self.max_results = max_results.max(1);
        self.abstract_chars = abstract_chars.max(1);
        self
    }

    /// Never fails: a search error becomes the listing text.
    pub async fn search(&self, query: &str) -> Retrieval {
        match self.source.search(query, self.max_results).await {
            Ok(entries) => {
                let papers = self.collect_papers(entries);
                let listing = format_listing(&papers);
                Retrieval {
                    query: query.to_string(),
                    papers,
                    listing,
                }
            }
            Err(e) => {
                warn!(error = %e, query, "arXiv search failed");
                Retrieval {
                    query: query.to_string(),
                    papers: Vec::new(),
                    listing: format!("An error occurred while searching on ArXiv: {e}"),
                }
            }
        }
    }

    fn collect_papers(&self, entries: Vec<ArxivEntry>) -> Vec<Paper> {
        let mut seen = HashSet::new();
        let mut papers = Vec::new();
        for entry in entries.into_iter().take(self.max_results) {
            let key = title_key(&entry.title);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            papers.push(Paper {
                title: key,
                authors: entry.authors,
                published: entry.published.trim().to_string(),
                abstract_text: truncate_abstract(&entry.summary, self.abstract_chars),
                pdf_url: entry.pdf_url,
            });
        }
        papers
    }
}

/// Cuts `text` to `max_chars` characters and marks the cut with `...`.
pub fn truncate_abstract(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn format_paper(paper: &Paper) -> String {
    format!(
        "Title: {}\nAuthors: {}\nPublished: {}\nAbstract: {}\nPDF: {}\n{}",
        paper.title,
        paper.authors.join(", "),
        paper.published,
        paper.abstract_text,
        paper.pdf_url,
        "-".repeat(100)
    )
}

pub fn format_listing(papers: &[Paper]) -> String {
    papers.iter().map(format_paper).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use warp::http::StatusCode;
    use warp::{Filter, Reply};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <entry>
    <id>http://arxiv.org/abs/2401.01234v2</id>
    <updated>2024-01-20T10:00:00Z</updated>
    <published>2024-01-15T12:00:00Z</published>
    <title>Attention Is Not
      All You Need &amp; Other Stories</title>
    <summary>  We revisit attention
      for medical imaging.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name><arxiv:affiliation>Bletchley</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/2401.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.01234v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CV" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.09999v1</id>
    <published>2024-01-10T08:00:00Z</published>
    <title>No PDF link here</title>
    <summary>Short.</summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>"#;

    struct FixedSource(Vec<ArxivEntry>);

    #[async_trait]
    impl PaperSource for FixedSource {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<ArxivEntry>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PaperSource for FailingSource {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<ArxivEntry>> {
            Err(Error::Feed("connection reset".into()))
        }
    }

    fn entry(title: &str, summary: &str) -> ArxivEntry {
        ArxivEntry {
            id: format!("http://arxiv.org/abs/{}", title.len()),
            title: title.to_string(),
            authors: vec!["A. Author".into(), "B. Author".into()],
            published: "2024-02-02T00:00:00Z".into(),
            summary: summary.to_string(),
            pdf_url: "http://arxiv.org/pdf/0000".into(),
        }
    }

    #[test]
    fn parses_arxiv_feed() {
        let entries = parse_feed(SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.id, "http://arxiv.org/abs/2401.01234v2");
        assert_eq!(first.title, "Attention Is Not All You Need & Other Stories");
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.published, "2024-01-15T12:00:00Z");
        assert_eq!(first.summary, "We revisit attention for medical imaging.");
        assert_eq!(first.pdf_url, "http://arxiv.org/pdf/2401.01234v2");

        assert_eq!(entries[1].pdf_url, "http://arxiv.org/pdf/2401.09999v1");
    }

    #[test]
    fn arxiv_error_entry_is_an_error() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(err.to_string().contains("incorrect id format"));
    }

    #[test]
    fn empty_feed_has_no_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>nothing</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn truncation_marks_the_cut() {
        assert_eq!(truncate_abstract("abcdef", 3), "abc...");
        assert_eq!(truncate_abstract("abc", 3), "abc");
        assert_eq!(truncate_abstract("ééééé", 2), "éé...");
    }

    #[tokio::test]
    async fn duplicate_titles_produce_one_block() {
        let tool = SearchTool::new(Arc::new(FixedSource(vec![
            entry("Federated learning for EHR", "first"),
            entry("Federated learning for EHR", "second"),
            entry("Graph networks for drug discovery", "third"),
        ])));

        let retrieval = tool.search("federated").await;
        assert_eq!(retrieval.papers.len(), 2);
        assert_eq!(
            retrieval.listing.matches("Title: Federated learning for EHR").count(),
            1
        );
        assert_eq!(retrieval.papers[0].abstract_text, "first");
    }

    #[tokio::test]
    async fn long_abstracts_are_truncated_in_listing() {
        let long = "x".repeat(DEFAULT_ABSTRACT_CHARS + 50);
        let tool = SearchTool::new(Arc::new(FixedSource(vec![entry("Long one", &long)])));

        let retrieval = tool.search("q").await;
        let expected = format!("Abstract: {}...\n", "x".repeat(DEFAULT_ABSTRACT_CHARS));
        assert!(retrieval.listing.contains(&expected));
        assert!(!retrieval.listing.contains(&"x".repeat(DEFAULT_ABSTRACT_CHARS + 1)));
    }

    #[tokio::test]
    async fn result_cap_applies_before_dedup() {
        let entries = (0..10).map(|i| entry(&format!("Paper {i}"), "s")).collect();
        let tool = SearchTool::new(Arc::new(FixedSource(entries))).with_limits(4, 700);
        assert_eq!(tool.search("q").await.papers.len(), 4);
    }

    #[tokio::test]
    async fn search_errors_become_text() {
        let tool = SearchTool::new(Arc::new(FailingSource));
        let retrieval = tool.search("q").await;
        assert!(retrieval.papers.is_empty());
        assert_eq!(
            retrieval.listing,
            "An error occurred while searching on ArXiv: feed parse error: connection reset"
        );
    }

    #[test]
    fn block_layout() {
        let paper = Paper {
            title: "T".into(),
            authors: vec!["A".into(), "B".into()],
            published: "2024-01-01T00:00:00Z".into(),
            abstract_text: "Abs".into(),
            pdf_url: "http://x/pdf".into(),
        };
        let block = format_paper(&paper);
        assert!(block.starts_with(
            "Title: T\nAuthors: A, B\nPublished: 2024-01-01T00:00:00Z\nAbstract: Abs\nPDF: http://x/pdf\n"
        ));
        assert!(block.ends_with(&"-".repeat(100)));
    }

    #[tokio::test]
    async fn client_asks_for_newest_first_and_parses_the_feed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let routes = warp::get()
            .and(warp::path!("api" / "query"))
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::header::optional::<String>("accept"))
            .map(move |params: HashMap<String, String>, accept: Option<String>| {
                captured.lock().unwrap().push((params, accept));
                warp::reply::with_header(SAMPLE, "content-type", "application/atom+xml")
                    .into_response()
            })
            .boxed();
        let base = serve(routes).await;

        let client =
            ArxivClient::new(&format!("{base}/api/query/"), Duration::from_secs(5)).unwrap();
        let entries = client.search("all:ecg AND all:transformer", 30).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pdf_url, "http://arxiv.org/pdf/2401.01234v2");

        let seen = seen.lock().unwrap();
        let (params, accept) = &seen[0];
        assert_eq!(params["search_query"], "all:ecg AND all:transformer");
        assert_eq!(params["start"], "0");
        assert_eq!(params["max_results"], "30");
        assert_eq!(params["sortBy"], "submittedDate");
        assert_eq!(params["sortOrder"], "descending");
        assert!(accept.as_deref().unwrap_or_default().contains("atom+xml"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_upstream_error() {
        let routes = warp::any()
            .map(|| {
                warp::reply::with_status("Rate exceeded.", StatusCode::SERVICE_UNAVAILABLE)
                    .into_response()
            })
            .boxed();
        let base = serve(routes).await;

        let client = ArxivClient::new(&base, Duration::from_secs(5)).unwrap();
        match client.search("q", 5).await.unwrap_err() {
            Error::Upstream {
                service,
                status,
                body,
            } => {
                assert_eq!(service, "arXiv");
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "Rate exceeded.");
            }
            other => panic!("unexpected error: {other}"),
        }

        let tool = SearchTool::new(Arc::new(client));
        let retrieval = tool.search("q").await;
        assert!(retrieval.papers.is_empty());
        assert!(retrieval
            .listing
            .starts_with("An error occurred while searching on ArXiv: arXiv returned status 503"));
    }
}
