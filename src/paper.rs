use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// One paper as returned by the retrieval step, abstract already truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(rename = "PDF")]
    pub pdf_url: String,
}

/// A paper picked by the moderator, with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectedPaper {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", alias = "summary", default)]
    pub abstract_text: String,
    #[serde(default, deserialize_with = "authors_from_list_or_text")]
    pub authors: Vec<String>,
    #[serde(default, alias = "date")]
    pub published: String,
    #[serde(rename = "PDF", alias = "pdf", alias = "pdf_url", alias = "url", default)]
    pub pdf_url: String,
    #[serde(default, alias = "reason", alias = "why_selected")]
    pub explanation: String,
}

impl SelectedPaper {
    #[cfg(test)]
    pub(crate) fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.abstract_text.trim().is_empty()
            && !self.authors.is_empty()
            && !self.published.trim().is_empty()
            && !self.pdf_url.trim().is_empty()
            && !self.explanation.trim().is_empty()
    }
}

/// The on-disk report: `{"papers": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaperReport {
    pub papers: Vec<SelectedPaper>,
}

/// Models sometimes answer `"authors": "A, B"` instead of a list.
fn authors_from_list_or_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Authors {
        List(Vec<String>),
        Text(String),
        Missing(()),
    }

    Ok(match Authors::deserialize(deserializer)? {
        Authors::List(list) => list
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        Authors::Text(text) => text
            .split(|c| c == ',' || c == ';')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        Authors::Missing(_) => Vec::new(),
    })
}

/// Title key used for deduplication and for matching selections to candidates.
pub fn title_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduces arXiv timestamps (`2024-03-01T17:59:59Z`) and similar to `YYYY-MM-DD`.
/// Anything unrecognised is returned trimmed but otherwise untouched.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_uses_upper_case_pdf_key() {
        let report = PaperReport {
            papers: vec![SelectedPaper {
                title: "T".into(),
                abstract_text: "A".into(),
                authors: vec!["X".into()],
                published: "2024-01-02".into(),
                pdf_url: "http://arxiv.org/pdf/1".into(),
                explanation: "E".into(),
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        let paper = &value["papers"][0];
        assert_eq!(paper["PDF"], "http://arxiv.org/pdf/1");
        assert_eq!(paper["abstract"], "A");
        assert!(paper.get("pdf_url").is_none());
    }

    #[test]
    fn selection_accepts_aliases_and_author_text() {
        let json = r#"{
            "title": "Sparse attention for CT",
            "summary": "We...",
            "authors": "Ada Lovelace, Alan Turing",
            "pdf": "http://arxiv.org/pdf/2",
            "reason": "Relevant"
        }"#;
        let paper: SelectedPaper = serde_json::from_str(json).unwrap();
        assert_eq!(paper.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(paper.abstract_text, "We...");
        assert_eq!(paper.pdf_url, "http://arxiv.org/pdf/2");
        assert_eq!(paper.explanation, "Relevant");
        assert!(paper.published.is_empty());
        assert!(!paper.is_complete());
    }

    #[test]
    fn null_authors_become_empty() {
        let paper: SelectedPaper =
            serde_json::from_str(r#"{"title": "T", "authors": null}"#).unwrap();
        assert!(paper.authors.is_empty());
    }

    #[test]
    fn dates_are_normalized() {
        assert_eq!(normalize_date("2024-03-01T17:59:59Z"), "2024-03-01");
        assert_eq!(normalize_date("2024-03-01 17:59:59+00:00"), "2024-03-01");
        assert_eq!(normalize_date(" 2023-12-31 "), "2023-12-31");
        assert_eq!(normalize_date("March 2024"), "March 2024");
    }

    #[test]
    fn title_key_collapses_whitespace() {
        assert_eq!(title_key("  Deep\n  Learning for   MRI "), "Deep Learning for MRI");
    }
}
