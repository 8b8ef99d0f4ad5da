//! Lenient accessors over raw post records and the snapshot type carried by links.

use crate::error::RecordError;
use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::BufReader;
use std::path::Path;

pub const DELETED_AUTHOR: &str = "[deleted]";

/// The fields of a post that the network keeps around.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: String,
    pub subreddit: String,
    pub author: String,
    pub title: String,
    pub score: i64,
    pub created_utc: i64,
    pub subreddit_subscribers: i64,
}

impl PostSnapshot {
    /// Parse a post payload (the `data` object, or a `crosspost_parent_list` entry).
    /// `id` and `subreddit` are required; everything else falls back to a default.
    pub fn from_value(v: &Value) -> Result<Self, RecordError> {
        let id = str_field(v, "id").ok_or(RecordError::MissingField("id"))?;
        let subreddit = str_field(v, "subreddit").ok_or(RecordError::MissingField("subreddit"))?;
        Ok(Self {
            id: id.to_string(),
            subreddit: subreddit.to_string(),
            author: str_field(v, "author").unwrap_or(DELETED_AUTHOR).to_string(),
            title: str_field(v, "title").unwrap_or_default().to_string(),
            score: int_field(v, "score"),
            created_utc: int_field(v, "created_utc"),
            subreddit_subscribers: int_field(v, "subreddit_subscribers"),
        })
    }
}

/// Non-empty string field.
pub fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|x| x.as_str()).filter(|s| !s.is_empty())
}

/// Integer field; dumps sometimes carry floats (`created_utc: 1.6e9`), so those are truncated.
pub fn int_field(v: &Value, key: &str) -> i64 {
    match v.get(key) {
        Some(x) => x.as_i64().or_else(|| x.as_f64().map(|f| f as i64)).unwrap_or(0),
        None => 0,
    }
}

/// The nested `data` payload of a listing record.
pub fn record_data(record: &Value) -> Option<&Value> {
    record.get("data").filter(|d| d.is_object())
}

/// `"t3_abc"` -> `"abc"`. The id is whatever follows the first `_`.
pub fn parse_parent_token(token: &str) -> Option<&str> {
    let (_, id) = token.split_once('_')?;
    let id = id.trim();
    if id.is_empty() { None } else { Some(id) }
}

/// Load the input dump: a single JSON array of `{ "kind": .., "data": {..} }` records.
pub fn load_posts(path: &Path) -> Result<Vec<Value>> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let v: Value = serde_json::from_reader(BufReader::with_capacity(256 * 1024, f))
        .with_context(|| format!("parse {}", path.display()))?;
    match v {
        Value::Array(items) => Ok(items),
        _ => anyhow::bail!("{}: expected a JSON array of post records", path.display()),
    }
}
