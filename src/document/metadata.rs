use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::slug::generate_slug;
use crate::types::identifiers::{ConversationId, Source};

/// Hugo-compatible frontmatter with conversation extensions.
///
/// Field order here is the key order of the rendered YAML block. Empty values
/// are left out when rendering, except `title`, `date` and `source`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: String,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "is_false")]
    pub draft: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub weight: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    // Stored as free text so documents written by other tools still parse;
    // the closed set is enforced when saving.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub message_count: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub tokens: u64,
}

impl Frontmatter {
    /// Header for a brand new conversation.
    pub fn new(title: &str, source: Source, now: DateTime<Utc>, id: ConversationId) -> Self {
        Frontmatter {
            title: title.to_string(),
            date: now,
            lastmod: Some(now),
            draft: false,
            author: source.as_str().to_string(),
            slug: generate_slug(title),
            source: source.as_str().to_string(),
            conversation_id: Some(id),
            ..Default::default()
        }
    }

    /// Record one more message: bumps `message_count` and `lastmod`.
    pub fn touch(&mut self, now: DateTime<Utc>) -> u64 {
        self.lastmod = Some(now);
        self.message_count = self.message_count.saturating_add(1);
        self.message_count
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// RFC 3339 timestamps on write. Reading also takes the other YAML timestamp
/// forms: space-separated date and time (UTC unless an offset follows) and
/// bare `YYYY-MM-DD` dates.
mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    const WITH_OFFSET: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f %:z",
        "%Y-%m-%dt%H:%M:%S%.f%:z",
    ];
    const WITHOUT_OFFSET: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        for format in WITH_OFFSET {
            if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
                return Ok(parsed.with_timezone(&Utc));
            }
        }
        for format in WITHOUT_OFFSET {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(parsed.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("invalid timestamp: {raw}"))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
