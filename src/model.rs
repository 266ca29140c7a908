use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::markdown::Metadata;

/// Server-assigned article identity. Numeric ids and opaque string ids both occur.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleId::Number(n) => write!(f, "{}", n),
            ArticleId::Text(s) => f.write_str(s),
        }
    }
}

/// Transient client copy of a remote article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub ctime: String,
}

/// Request body for `/api/save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub body: String,
}

/// Request body for `/api/login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub body: String,
}

/// Display metadata for one article: front-matter first, article fields second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: String,
    pub date: String,
}

impl ArticleMetadata {
    pub fn resolve(front_matter: &Metadata, article: &Article) -> Self {
        let pick = |value: &Option<String>, fallback: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            title: pick(&front_matter.title, &article.title),
            date: pick(&front_matter.date, &article.ctime),
        }
    }
}

/// Persisted credential. Treated as absent once `expires_at` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.to_string(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Parses an event payload into articles; anything but an array yields nothing.
/// Entries that are not articles are skipped.
pub fn articles_from_payload(payload: &serde_json::Value) -> Vec<Article> {
    match payload.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_article_accepts_numeric_and_string_ids() {
        let a: Article =
            serde_json::from_value(json!({"id": 1, "title": "t", "body": "# hi", "ctime": "2024-01-01"}))
                .unwrap();
        assert_eq!(a.id, ArticleId::Number(1));

        let b: Article = serde_json::from_value(json!({"id": "5a1f", "body": "x"})).unwrap();
        assert_eq!(b.id.to_string(), "5a1f");
        assert_eq!(b.title, "");
    }

    #[test]
    fn test_metadata_falls_back_to_article_fields() {
        let article = Article {
            id: ArticleId::Number(1),
            title: "t".into(),
            body: "# hi".into(),
            ctime: "2024-01-01".into(),
        };
        let resolved = ArticleMetadata::resolve(&Metadata::default(), &article);
        assert_eq!(resolved.title, "t");
        assert_eq!(resolved.date, "2024-01-01");

        let front = Metadata {
            title: Some("From front matter".into()),
            date: None,
            ..Default::default()
        };
        let resolved = ArticleMetadata::resolve(&front, &article);
        assert_eq!(resolved.title, "From front matter");
        assert_eq!(resolved.date, "2024-01-01");
    }

    #[test]
    fn test_session_token_expiry_is_inclusive() {
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let token = SessionToken::new("abc", at);
        assert!(!token.is_expired(at - chrono::Duration::seconds(1)));
        assert!(token.is_expired(at));
    }

    #[test]
    fn test_session_token_wire_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let value = serde_json::to_value(SessionToken::new("abc", at)).unwrap();
        assert_eq!(value["token"], "abc");
        assert!(value.get("expiresAt").is_some());
    }

    #[test]
    fn test_payload_parsing_skips_non_articles() {
        let payload = json!([{"id": 1, "body": "a"}, "junk", {"no_id": true}]);
        assert_eq!(articles_from_payload(&payload).len(), 1);
        assert!(articles_from_payload(&json!({"error": "Nothing"})).is_empty());
        assert!(articles_from_payload(&serde_json::Value::Null).is_empty());
    }
}
