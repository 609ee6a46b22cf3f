use std::fs;
use std::sync::Arc;

use arxiv_curator::arxiv::{ArxivEntry, PaperSource, SearchTool};
use arxiv_curator::llm::LanguageModel;
use arxiv_curator::pipeline::Pipeline;
use arxiv_curator::report::{parse_report, strip_code_fences};
use arxiv_curator::selection::MAX_SELECTED;
use arxiv_curator::{Error, Result};
use async_trait::async_trait;

/// Answers the query stage with a fixed query and the moderator stage by
/// passing through every paper that appears in the listing it was shown.
struct PassThroughModel;

#[async_trait]
impl LanguageModel for PassThroughModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        if system.contains("Query Engineer") {
            return Ok("```\n(\"wearable\" AND \"arrhythmia\") OR ECG\n```".to_string());
        }

        let picks: Vec<serde_json::Value> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("Title: "))
            .map(|title| {
                serde_json::json!({
                    "title": title,
                    "explanation": format!("{title} helps screen patients remotely."),
                })
            })
            .collect();
        Ok(format!("```json\n{}\n```", serde_json::Value::Array(picks)))
    }

    fn describe(&self) -> String {
        "pass-through".into()
    }
}

struct MockArxiv {
    entries: Vec<ArxivEntry>,
    fail: bool,
}

#[async_trait]
impl PaperSource for MockArxiv {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<ArxivEntry>> {
        if self.fail {
            return Err(Error::Feed("arXiv is down".into()));
        }
        Ok(self.entries.clone())
    }
}

fn entry(n: usize) -> ArxivEntry {
    ArxivEntry {
        id: format!("http://arxiv.org/abs/2405.0000{n}v1"),
        title: format!("Wearable ECG study {n}"),
        authors: vec![format!("Author {n}"), "Grace Hopper".into()],
        published: format!("2024-05-0{}T09:00:00Z", n + 1),
        summary: format!("Summary number {n} about arrhythmia detection."),
        pdf_url: format!("http://arxiv.org/pdf/2405.0000{n}v1"),
    }
}

fn pipeline(entries: Vec<ArxivEntry>, fail: bool, output: &std::path::Path) -> Pipeline {
    let model = Arc::new(PassThroughModel);
    let tool = SearchTool::new(Arc::new(MockArxiv { entries, fail }));
    Pipeline::new(model, tool, output)
}

#[tokio::test]
async fn three_papers_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("selected_papers.json");
    let p = pipeline((0..3).map(entry).collect(), false, &output);

    let summary = p.kickoff("Detecting arrhythmia with wearables").await.unwrap();
    assert_eq!(summary.query, "(\"wearable\" AND \"arrhythmia\") OR ECG");

    let raw = fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(&raw)).unwrap();
    let papers = value["papers"].as_array().unwrap();
    assert_eq!(papers.len(), 3);

    for paper in papers {
        for field in ["title", "abstract", "published", "PDF", "explanation"] {
            assert!(
                !paper[field].as_str().unwrap_or_default().is_empty(),
                "{field} missing in {paper}"
            );
        }
        assert!(!paper["authors"].as_array().unwrap().is_empty());
    }
    assert_eq!(papers[0]["published"], "2024-05-01");
    assert_eq!(papers[2]["PDF"], "http://arxiv.org/pdf/2405.00002v1");

    assert_eq!(parse_report(&raw).unwrap(), summary.report);
}

#[tokio::test]
async fn many_candidates_are_cut_to_ten() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("selected_papers.json");
    let entries = (0..25)
        .map(|n| ArxivEntry {
            title: format!("Candidate {n}"),
            ..entry(1)
        })
        .collect();
    let p = pipeline(entries, false, &output);

    let summary = p.kickoff("anything").await.unwrap();
    assert_eq!(summary.candidates, 25);
    assert_eq!(summary.report.papers.len(), MAX_SELECTED);
}

#[tokio::test]
async fn search_failure_yields_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("selected_papers.json");
    let p = pipeline(Vec::new(), true, &output);

    let summary = p.kickoff("anything").await.unwrap();
    assert_eq!(summary.candidates, 0);
    assert!(summary.report.papers.is_empty());

    let raw = fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({ "papers": [] }));
}
