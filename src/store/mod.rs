//! The graph store seam. The builder writes through it, the exporter and analyzer read through it.

mod memory;
mod neo4j;

pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;

use crate::graph::GraphPlan;
use anyhow::Result;
use serde::Serialize;

/// A subreddit as read back from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubredditRow {
    pub name: String,
    pub subscribers: i64,
    pub source_count: u64,
    pub dest_count: u64,
}

/// A crosspost event joined with its two subreddits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrosspostRow {
    pub id: String,
    pub title: String,
    pub author: String,
    pub source_subreddit: String,
    pub dest_subreddit: String,
}

/// A post ranked by how often it was crossposted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopPostRow {
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub crosspost_count: u64,
    pub original_subreddit: Option<String>,
    /// Distinct destination subreddits, first-seen order.
    pub crossposted_to: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubredditCount {
    pub name: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PathRow {
    pub source: String,
    pub dest: String,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub subreddits: u64,
    pub crossposts: u64,
    /// Distinct (source, dest) pairs with source != dest.
    pub unique_connections: u64,
}

/// Synchronous graph store. Calls block until the store answers; nothing here retries.
pub trait GraphStore {
    /// Short name for logs.
    fn backend(&self) -> &'static str;

    /// Drop everything and write `plan`, all nodes before any relationship.
    /// Either the whole plan becomes visible or the previous graph is left untouched.
    fn replace_all(&mut self, plan: &GraphPlan) -> Result<()>;

    /// All subreddits with their stored counts. Missing properties read as zero.
    fn subreddit_rows(&self) -> Result<Vec<SubredditRow>>;

    /// All crosspost events, self-referential ones included.
    fn crosspost_rows(&self) -> Result<Vec<CrosspostRow>>;

    /// Posts with the most incoming CROSSPOST_OF relationships.
    fn top_posts(&self, limit: usize) -> Result<Vec<TopPostRow>>;

    /// Subreddits with the most outgoing crosspost events.
    fn top_sources(&self, limit: usize) -> Result<Vec<SubredditCount>>;

    /// Busiest source -> dest pairs, source != dest.
    fn top_paths(&self, limit: usize) -> Result<Vec<PathRow>>;

    /// Sample crosspost events with source != dest, in store order.
    fn examples(&self, limit: usize) -> Result<Vec<CrosspostRow>>;

    fn summary_counts(&self) -> Result<SummaryCounts>;
}
