use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources_used: usize,
}

/// One ranked passage from a vector store search. Every field the service
/// may omit is defaulted here so downstream formatting never has to probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_hit_defaults_missing_fields() {
        let hit: SearchHit = serde_json::from_str("{}").unwrap();
        assert_eq!(hit.file_id, "");
        assert_eq!(hit.filename, "");
        assert!(hit.score.is_none());
        assert!(hit.content.is_empty());
    }

    #[test]
    fn search_hit_parses_full_record() {
        let hit: SearchHit = serde_json::from_str(
            r#"{
                "file_id": "file-abc",
                "filename": "IRS 2024.pdf",
                "score": 0.87,
                "content": [{"type": "text", "text": "audit backlog"}]
            }"#,
        )
        .unwrap();
        assert_eq!(hit.file_id, "file-abc");
        assert_eq!(hit.filename, "IRS 2024.pdf");
        assert_eq!(hit.score, Some(0.87));
        assert_eq!(hit.content[0].text, "audit backlog");
    }

    #[test]
    fn content_part_tolerates_missing_text() {
        let part: ContentPart = serde_json::from_str(r#"{"type": "text"}"#).unwrap();
        assert_eq!(part.text, "");
    }
}
