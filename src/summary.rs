//! The summary document read by the stats endpoints of the web front end.

use crate::graph::{distinct_events, GraphPlan};
use crate::link::{aggregate_edges, CrosspostLink};
use crate::util::write_atomic;
use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryNode {
    pub name: String,
    pub subscribers: i64,
    pub source_count: u64,
    pub dest_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryPost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub created_utc: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryCrosspost {
    pub id: String,
    pub source_subreddit: String,
    pub dest_subreddit: String,
    pub original: SummaryPost,
    pub crosspost: SummaryPost,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub total_crossposts: u64,
    pub unique_connections: u64,
    pub total_subreddits: u64,
    pub top_source_subreddits: Vec<NamedCount>,
    pub top_destination_subreddits: Vec<NamedCount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub nodes: Vec<SummaryNode>,
    pub crossposts: Vec<SummaryCrosspost>,
    pub stats: SummaryStats,
}

fn top_by<'a>(names: impl Iterator<Item = &'a str>, n: usize) -> Vec<NamedCount> {
    let mut slot: AHashMap<&str, usize> = AHashMap::new();
    let mut out: Vec<NamedCount> = Vec::new();
    for name in names {
        match slot.get(name) {
            Some(&i) => out[i].count += 1,
            None => {
                slot.insert(name, out.len());
                out.push(NamedCount { name: name.to_string(), count: 1 });
            }
        }
    }
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(n);
    out
}

fn summary_post(p: &crate::post::PostSnapshot) -> SummaryPost {
    SummaryPost {
        id: p.id.clone(),
        subreddit: p.subreddit.clone(),
        title: p.title.clone(),
        author: p.author.clone(),
        score: p.score,
        created_utc: p.created_utc,
    }
}

impl NetworkSummary {
    /// Totals include self-referential crossposts; `unique_connections` does not.
    /// Links whose event id is already taken are left out, as they are from the store.
    pub fn from_links(links: &[CrosspostLink], top_n: usize) -> Self {
        let plan = GraphPlan::from_links(links);
        let (links, _) = distinct_events(links);
        let nodes = plan
            .subreddits
            .iter()
            .map(|s| SummaryNode {
                name: s.name.clone(),
                subscribers: s.subscribers,
                source_count: s.source_count,
                dest_count: s.dest_count,
            })
            .collect();
        let crossposts = links
            .iter()
            .map(|l| SummaryCrosspost {
                id: l.event_id(),
                source_subreddit: l.source_subreddit.clone(),
                dest_subreddit: l.dest_subreddit.clone(),
                original: summary_post(&l.parent),
                crosspost: summary_post(&l.post),
            })
            .collect();
        let stats = SummaryStats {
            total_crossposts: links.len() as u64,
            unique_connections: aggregate_edges(links.iter().copied()).len() as u64,
            total_subreddits: plan.subreddits.len() as u64,
            top_source_subreddits: top_by(links.iter().map(|l| l.source_subreddit.as_str()), top_n),
            top_destination_subreddits: top_by(links.iter().map(|l| l.dest_subreddit.as_str()), top_n),
        };
        Self { nodes, crossposts, stats }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(&mut *w, self)?;
            Ok(())
        })
        .with_context(|| format!("write summary {}", path.display()))?;
        tracing::info!(path = %path.display(), total = self.stats.total_crossposts, "Summary written");
        Ok(())
    }
}
