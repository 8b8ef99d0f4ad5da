//! Console analysis of a populated store.

use crate::store::{CrosspostRow, GraphStore, PathRow, SubredditCount, SummaryCounts, TopPostRow};
use anyhow::{Context, Result};
use std::fmt::Write;

pub const TOP_POSTS: usize = 10;
pub const TOP_SOURCES: usize = 10;
pub const TOP_PATHS: usize = 15;
pub const EXAMPLES: usize = 10;
/// Destinations listed per top post before "and N more".
const DESTINATIONS_SHOWN: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub top_posts: Vec<TopPostRow>,
    pub top_sources: Vec<SubredditCount>,
    pub top_paths: Vec<PathRow>,
    pub examples: Vec<CrosspostRow>,
    pub counts: SummaryCounts,
}

impl AnalysisReport {
    /// Run the fixed read-only queries. Ties keep the order the store returned.
    pub fn collect(store: &dyn GraphStore) -> Result<Self> {
        Ok(Self {
            top_posts: store.top_posts(TOP_POSTS).context("query top posts")?,
            top_sources: store.top_sources(TOP_SOURCES).context("query top sources")?,
            top_paths: store.top_paths(TOP_PATHS).context("query top paths")?,
            examples: store.examples(EXAMPLES).context("query example crossposts")?,
            counts: store.summary_counts().context("query summary counts")?,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "=== SUBREDDIT CROSSPOST ANALYSIS ===")?;

        writeln!(out, "\nTop posts by crosspost count (across all subreddits):")?;
        for p in &self.top_posts {
            let shown = &p.crossposted_to[..p.crossposted_to.len().min(DESTINATIONS_SHOWN)];
            let more = p.crossposted_to.len() - shown.len();
            writeln!(out, "\n  Post: {} - {} crossposts", p.post_id, p.crosspost_count)?;
            writeln!(out, "  From: r/{}", p.original_subreddit.as_deref().unwrap_or("unknown"))?;
            writeln!(out, "  Title: '{}'", p.title)?;
            writeln!(out, "  Author: {} (Score: {})", p.author, p.score)?;
            write!(out, "  Crossposted to: r/{}", shown.join(", r/"))?;
            if more > 0 {
                write!(out, " and {more} more subreddits")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "\nSubreddits with most crossposted content (sources):")?;
        for s in &self.top_sources {
            writeln!(out, "  r/{}: {} crossposts from this subreddit", s.name, s.count)?;
        }

        writeln!(out, "\nMost active crosspost paths between subreddits:")?;
        for p in &self.top_paths {
            writeln!(out, "  r/{} → r/{}: {} crossposts", p.source, p.dest, p.count)?;
        }

        writeln!(out, "\nExamples of individual crossposts:")?;
        for c in &self.examples {
            writeln!(out, "  '{}' by u/{}", c.title, c.author)?;
            writeln!(out, "    From r/{} to r/{}", c.source_subreddit, c.dest_subreddit)?;
        }

        writeln!(out, "\nSummary statistics:")?;
        writeln!(out, "  Total subreddits: {}", self.counts.subreddits)?;
        writeln!(out, "  Total crosspost relationships: {}", self.counts.crossposts)?;
        writeln!(out, "  Unique subreddit connections: {}", self.counts.unique_connections)?;
        Ok(())
    }
}
