//! Resolved crosspost links and the subreddit-pair aggregation over them.

use crate::post::PostSnapshot;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Joins parent and child ids in an event id. Resolved ids never contain it.
pub const EVENT_ID_SEP: char = '_';

/// Where a link's parent snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentOrigin {
    /// The parent post is present in the same dataset.
    Indexed,
    /// Taken from the child's embedded `crosspost_parent_list`; the parent may not exist in the dataset.
    EmbeddedList,
    /// Demo data, not backed by any record.
    Synthetic,
}

/// One parent -> child crosspost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrosspostLink {
    pub post_id: String,
    pub parent_id: String,
    pub source_subreddit: String,
    pub dest_subreddit: String,
    pub post: PostSnapshot,
    pub parent: PostSnapshot,
    pub parent_origin: ParentOrigin,
}

impl CrosspostLink {
    pub fn new(parent_id: &str, parent: PostSnapshot, post: PostSnapshot, parent_origin: ParentOrigin) -> Self {
        Self {
            post_id: post.id.clone(),
            parent_id: parent_id.to_string(),
            source_subreddit: parent.subreddit.clone(),
            dest_subreddit: post.subreddit.clone(),
            post,
            parent,
            parent_origin,
        }
    }

    /// `{parent_id}_{post_id}`, the crosspost-event identifier.
    pub fn event_id(&self) -> String {
        format!("{}{EVENT_ID_SEP}{}", self.parent_id, self.post_id)
    }

    #[inline]
    pub fn is_self_link(&self) -> bool {
        self.source_subreddit == self.dest_subreddit
    }
}

/// Weighted source -> destination subreddit relationship.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregatedEdge {
    pub source: String,
    pub dest: String,
    pub count: u64,
}

/// Group links by (source, dest), dropping self-pairs.
/// Ordered by count descending; equal counts keep first-seen order.
pub fn aggregate_edges<'a>(links: impl IntoIterator<Item = &'a CrosspostLink>) -> Vec<AggregatedEdge> {
    let mut slot: AHashMap<(&str, &str), usize> = AHashMap::new();
    let mut edges: Vec<AggregatedEdge> = Vec::new();
    for l in links.into_iter().filter(|l| !l.is_self_link()) {
        let key = (l.source_subreddit.as_str(), l.dest_subreddit.as_str());
        match slot.get(&key) {
            Some(&i) => edges[i].count += 1,
            None => {
                slot.insert(key, edges.len());
                edges.push(AggregatedEdge { source: key.0.to_string(), dest: key.1.to_string(), count: 1 });
            }
        }
    }
    // stable sort keeps insertion order among ties
    edges.sort_by(|a, b| b.count.cmp(&a.count));
    edges
}
