use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-issued identifier of an asynchronous recommendation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display data for one recommended card. Backends disagree on key names, so
/// every field is optional and several spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendedCard {
    #[serde(default, alias = "cardName", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(
        default,
        alias = "bankName",
        alias = "issuer",
        deserialize_with = "lenient_string"
    )]
    pub bank: String,
    #[serde(
        default,
        rename = "cardType",
        alias = "card_type",
        alias = "network",
        deserialize_with = "lenient_string"
    )]
    pub card_type: String,
    #[serde(
        default,
        rename = "annualFee",
        alias = "annual_fee",
        alias = "fee",
        deserialize_with = "lenient_string"
    )]
    pub annual_fee: String,
    #[serde(
        default,
        alias = "rewardSummary",
        alias = "reward_summary",
        deserialize_with = "lenient_string"
    )]
    pub rewards: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, alias = "highlights", deserialize_with = "lenient_list")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cons: Vec<String>,
    #[serde(
        default,
        rename = "imageUrl",
        alias = "image_url",
        alias = "image",
        deserialize_with = "lenient_string"
    )]
    pub image_url: String,
    #[serde(
        default,
        rename = "applyUrl",
        alias = "apply_url",
        alias = "applyLink",
        deserialize_with = "lenient_string"
    )]
    pub apply_url: String,
}

/// Result of a settled recommendation job. `raw` is the backend's `data`
/// object exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationPayload {
    pub cards: Vec<RecommendedCard>,
    pub filters: Option<Value>,
    pub summary: Option<String>,
    pub count: usize,
    pub raw: Value,
}

/// One row of `/recommendations/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "_id", alias = "recommendationId", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        default,
        alias = "createdAt",
        alias = "created_at",
        deserialize_with = "lenient_string"
    )]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cards: Option<u64>,
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).unwrap_or_default())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => value_to_string(other)
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect(),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_accepts_alternate_key_spellings() {
        let card: RecommendedCard = serde_json::from_value(json!({
            "name": "Chase Sapphire Preferred",
            "issuer": "Chase",
            "cardType": "VISA",
            "annualFee": 95,
            "highlights": ["5x travel", "", "3x dining"],
            "applyLink": "https://example.com/apply",
            "image": null,
        }))
        .unwrap();

        assert_eq!(card.bank, "Chase");
        assert_eq!(card.annual_fee, "95");
        assert_eq!(card.pros, vec!["5x travel", "3x dining"]);
        assert_eq!(card.apply_url, "https://example.com/apply");
        assert_eq!(card.image_url, "");
        assert!(card.cons.is_empty());
    }

    #[test]
    fn history_entry_accepts_numeric_ids_and_card_lists() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "id": 4,
            "createdAt": "2024-01-15",
            "title": "Travel & Dining Focus",
            "cards": [{"name": "a"}, {"name": "b"}, {"name": "c"}],
        }))
        .unwrap();

        assert_eq!(entry.id, "4");
        assert_eq!(entry.date, "2024-01-15");
        assert_eq!(entry.cards, Some(3));
        assert_eq!(entry.summary, "");
    }
}
