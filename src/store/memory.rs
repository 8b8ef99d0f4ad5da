use super::{CrosspostRow, GraphStore, PathRow, SubredditCount, SubredditRow, SummaryCounts, TopPostRow};
use crate::graph::{CrosspostNode, GraphPlan};
use ahash::AHashMap;
use anyhow::Result;

/// In-process store. A write builds the complete new graph before swapping it in,
/// so a rejected plan leaves the previous graph as it was.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    graph: GraphPlan,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful `replace_all` calls so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn graph(&self) -> &GraphPlan {
        &self.graph
    }
}

/// Count keys in first-seen order, then sort by count (stable, so ties keep that order).
fn ranked<K: Clone + Eq + std::hash::Hash>(keys: impl Iterator<Item = K>) -> Vec<(K, u64)> {
    let mut slot: AHashMap<K, usize> = AHashMap::new();
    let mut out: Vec<(K, u64)> = Vec::new();
    for k in keys {
        match slot.get(&k) {
            Some(&i) => out[i].1 += 1,
            None => {
                slot.insert(k.clone(), out.len());
                out.push((k, 1));
            }
        }
    }
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

fn crosspost_row(c: &CrosspostNode) -> CrosspostRow {
    CrosspostRow {
        id: c.id.clone(),
        title: c.title.clone(),
        author: c.author.clone(),
        source_subreddit: c.source.clone(),
        dest_subreddit: c.dest.clone(),
    }
}

impl GraphStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn replace_all(&mut self, plan: &GraphPlan) -> Result<()> {
        plan.check_references()?;
        self.graph = plan.clone();
        self.writes += 1;
        Ok(())
    }

    fn subreddit_rows(&self) -> Result<Vec<SubredditRow>> {
        Ok(self
            .graph
            .subreddits
            .iter()
            .map(|s| SubredditRow {
                name: s.name.clone(),
                subscribers: s.subscribers,
                source_count: s.source_count,
                dest_count: s.dest_count,
            })
            .collect())
    }

    fn crosspost_rows(&self) -> Result<Vec<CrosspostRow>> {
        Ok(self.graph.crossposts.iter().map(crosspost_row).collect())
    }

    fn top_posts(&self, limit: usize) -> Result<Vec<TopPostRow>> {
        let g = &self.graph;
        let mut posted_in: AHashMap<&str, Vec<&str>> = AHashMap::new();
        for r in &g.posted_in {
            posted_in.entry(r.post_id.as_str()).or_default().push(r.subreddit.as_str());
        }
        let posts: AHashMap<&str, _> = g.posts.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut rows = Vec::new();
        for (parent_id, count) in ranked(g.crosspost_of.iter().map(|r| r.parent_id.as_str())).into_iter().take(limit) {
            let mut dests: Vec<String> = Vec::new();
            for r in g.crosspost_of.iter().filter(|r| r.parent_id == parent_id) {
                for &sub in posted_in.get(r.child_id.as_str()).into_iter().flatten() {
                    if !dests.iter().any(|d| d == sub) {
                        dests.push(sub.to_string());
                    }
                }
            }
            let post = posts.get(parent_id);
            rows.push(TopPostRow {
                post_id: parent_id.to_string(),
                title: post.map(|p| p.title.clone()).unwrap_or_default(),
                author: post.map(|p| p.author.clone()).unwrap_or_default(),
                score: post.map(|p| p.score).unwrap_or(0),
                crosspost_count: count,
                original_subreddit: posted_in.get(parent_id).and_then(|s| s.first()).map(|s| s.to_string()),
                crossposted_to: dests,
            });
        }
        Ok(rows)
    }

    fn top_sources(&self, limit: usize) -> Result<Vec<SubredditCount>> {
        Ok(ranked(self.graph.crossposts.iter().map(|c| c.source.as_str()))
            .into_iter()
            .take(limit)
            .map(|(name, count)| SubredditCount { name: name.to_string(), count })
            .collect())
    }

    fn top_paths(&self, limit: usize) -> Result<Vec<PathRow>> {
        let pairs = self
            .graph
            .crossposts
            .iter()
            .filter(|c| c.source != c.dest)
            .map(|c| (c.source.as_str(), c.dest.as_str()));
        Ok(ranked(pairs)
            .into_iter()
            .take(limit)
            .map(|((source, dest), count)| PathRow { source: source.to_string(), dest: dest.to_string(), count })
            .collect())
    }

    fn examples(&self, limit: usize) -> Result<Vec<CrosspostRow>> {
        Ok(self
            .graph
            .crossposts
            .iter()
            .filter(|c| c.source != c.dest)
            .take(limit)
            .map(crosspost_row)
            .collect())
    }

    fn summary_counts(&self) -> Result<SummaryCounts> {
        let g = &self.graph;
        let pairs = ranked(g.crossposts.iter().filter(|c| c.source != c.dest).map(|c| (c.source.as_str(), c.dest.as_str())));
        Ok(SummaryCounts {
            subreddits: g.subreddits.len() as u64,
            crossposts: g.crossposts.len() as u64,
            unique_connections: pairs.len() as u64,
        })
    }
}
