//! Graph materialization: turn resolved links into the node/relationship set written to the store.
//!
//! `GraphPlan::from_links` is pure; `GraphBuilder` hands the plan to a [`GraphStore`] which
//! clears the previous graph and writes the plan in one transaction, nodes first and
//! relationships second.

use crate::link::{aggregate_edges, AggregatedEdge, CrosspostLink};
use crate::progress::ProgressScope;
use crate::store::GraphStore;
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use serde::Serialize;

pub const REL_FROM_SUBREDDIT: &str = "FROM_SUBREDDIT";
pub const REL_TO_SUBREDDIT: &str = "TO_SUBREDDIT";
pub const REL_ORIGINAL_POST: &str = "ORIGINAL_POST";
pub const REL_REPOSTED_AS: &str = "REPOSTED_AS";
pub const REL_CROSSPOST_OF: &str = "CROSSPOST_OF";
pub const REL_POSTED_IN: &str = "POSTED_IN";
pub const REL_CROSSPOST_FROM: &str = "CROSSPOST_FROM";

/// A subreddit, merged by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubredditNode {
    pub name: String,
    pub subscribers: i64,
    /// Crosspost events whose parent lives here.
    pub source_count: u64,
    /// Crosspost events that landed here.
    pub dest_count: u64,
}

/// A post (parent or child), merged by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostNode {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
}

/// One crosspost event. Carries the endpoints its relationships point at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrosspostNode {
    pub id: String,
    pub post_id: String,
    pub parent_id: String,
    pub source: String,
    pub dest: String,
    pub title: String,
    pub parent_title: String,
    pub author: String,
    pub parent_author: String,
    pub score: i64,
    pub parent_score: i64,
    pub created_utc: i64,
}

/// `(post)-[:POSTED_IN]->(subreddit)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PostedIn {
    pub post_id: String,
    pub subreddit: String,
}

/// `(child)-[:CROSSPOST_OF]->(parent)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CrosspostOf {
    pub child_id: String,
    pub parent_id: String,
}

/// Everything one run writes, in write order: node sets first, then relationship sets.
/// Each crosspost node also implies FROM_SUBREDDIT, TO_SUBREDDIT, ORIGINAL_POST and REPOSTED_AS.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphPlan {
    pub subreddits: Vec<SubredditNode>,
    pub posts: Vec<PostNode>,
    pub crossposts: Vec<CrosspostNode>,
    pub posted_in: Vec<PostedIn>,
    pub crosspost_of: Vec<CrosspostOf>,
    /// Written as `(dest)-[:CROSSPOST_FROM {weight}]->(source)`.
    pub edges: Vec<AggregatedEdge>,
    /// Links dropped because their event id was already taken (duplicates and collisions).
    #[serde(skip)]
    pub duplicates_skipped: usize,
}

struct Merge<T> {
    slot: AHashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Merge<T> {
    fn new() -> Self {
        Self { slot: AHashMap::new(), items: Vec::new() }
    }

    /// Existing item for `key`, or a fresh one from `make`. First-seen order is kept.
    fn entry(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let i = match self.slot.get(key) {
            Some(&i) => i,
            None => {
                self.slot.insert(key.to_string(), self.items.len());
                self.items.push(make());
                self.items.len() - 1
            }
        };
        &mut self.items[i]
    }
}

/// Links whose event id is not yet taken, first occurrence kept, plus how many were dropped.
/// Both the store write and the summary document are built from this set.
pub fn distinct_events(links: &[CrosspostLink]) -> (Vec<&CrosspostLink>, usize) {
    let mut owner: AHashMap<String, (&str, &str)> = AHashMap::with_capacity(links.len());
    let mut kept = Vec::with_capacity(links.len());
    let mut skipped = 0;
    for link in links {
        let id = link.event_id();
        match owner.get(&id) {
            None => {
                owner.insert(id, (link.parent_id.as_str(), link.post_id.as_str()));
                kept.push(link);
            }
            Some(&(parent_id, post_id)) => {
                skipped += 1;
                if (parent_id, post_id) == (link.parent_id.as_str(), link.post_id.as_str()) {
                    tracing::warn!(crosspost_id = %id, "duplicate crosspost event; skipping");
                } else {
                    tracing::error!(
                        crosspost_id = %id,
                        kept_parent = parent_id,
                        kept_post = post_id,
                        parent_id = %link.parent_id,
                        post_id = %link.post_id,
                        "event id collision between different crossposts; skipping the later one"
                    );
                }
            }
        }
    }
    (kept, skipped)
}

impl GraphPlan {
    pub fn from_links(links: &[CrosspostLink]) -> Self {
        let mut subs: Merge<SubredditNode> = Merge::new();
        let mut posts: Merge<PostNode> = Merge::new();
        let mut posted_seen: AHashSet<PostedIn> = AHashSet::new();

        let (kept, duplicates_skipped) = distinct_events(links);
        let mut plan = GraphPlan { duplicates_skipped, ..Default::default() };

        for &link in &kept {
            let id = link.event_id();

            // last write wins, but an absent (zero) subscriber count is not a write
            for (name, subscribers, is_source) in [
                (&link.source_subreddit, link.parent.subreddit_subscribers, true),
                (&link.dest_subreddit, link.post.subreddit_subscribers, false),
            ] {
                let n = subs.entry(name, || SubredditNode {
                    name: name.clone(),
                    subscribers: 0,
                    source_count: 0,
                    dest_count: 0,
                });
                if subscribers > 0 {
                    n.subscribers = subscribers;
                }
                if is_source {
                    n.source_count += 1;
                } else {
                    n.dest_count += 1;
                }
            }

            for (pid, snap) in [(&link.parent_id, &link.parent), (&link.post_id, &link.post)] {
                let node = PostNode {
                    id: pid.clone(),
                    title: snap.title.clone(),
                    author: snap.author.clone(),
                    score: snap.score,
                };
                let slot = posts.entry(pid, || node.clone());
                *slot = node;
            }

            for rel in [
                PostedIn { post_id: link.parent_id.clone(), subreddit: link.source_subreddit.clone() },
                PostedIn { post_id: link.post_id.clone(), subreddit: link.dest_subreddit.clone() },
            ] {
                if posted_seen.insert(rel.clone()) {
                    plan.posted_in.push(rel);
                }
            }
            plan.crosspost_of.push(CrosspostOf { child_id: link.post_id.clone(), parent_id: link.parent_id.clone() });

            plan.crossposts.push(CrosspostNode {
                id,
                post_id: link.post_id.clone(),
                parent_id: link.parent_id.clone(),
                source: link.source_subreddit.clone(),
                dest: link.dest_subreddit.clone(),
                title: link.post.title.clone(),
                parent_title: link.parent.title.clone(),
                author: link.post.author.clone(),
                parent_author: link.parent.author.clone(),
                score: link.post.score,
                parent_score: link.parent.score,
                created_utc: link.post.created_utc,
            });
        }

        plan.subreddits = subs.items;
        plan.posts = posts.items;
        plan.edges = aggregate_edges(kept.iter().copied());
        plan
    }

    /// Every relationship endpoint must name a node in the same plan.
    pub fn check_references(&self) -> Result<()> {
        let subs: AHashSet<&str> = self.subreddits.iter().map(|s| s.name.as_str()).collect();
        let posts: AHashSet<&str> = self.posts.iter().map(|p| p.id.as_str()).collect();
        let need_sub = |name: &str, what: &str| -> Result<()> {
            if !subs.contains(name) { bail!("{what} references unknown subreddit {name:?}"); }
            Ok(())
        };
        let need_post = |id: &str, what: &str| -> Result<()> {
            if !posts.contains(id) { bail!("{what} references unknown post {id:?}"); }
            Ok(())
        };
        for c in &self.crossposts {
            need_sub(&c.source, REL_FROM_SUBREDDIT)?;
            need_sub(&c.dest, REL_TO_SUBREDDIT)?;
            need_post(&c.parent_id, REL_ORIGINAL_POST)?;
            need_post(&c.post_id, REL_REPOSTED_AS)?;
        }
        for r in &self.posted_in {
            need_post(&r.post_id, REL_POSTED_IN)?;
            need_sub(&r.subreddit, REL_POSTED_IN)?;
        }
        for r in &self.crosspost_of {
            need_post(&r.child_id, REL_CROSSPOST_OF)?;
            need_post(&r.parent_id, REL_CROSSPOST_OF)?;
        }
        for e in &self.edges {
            need_sub(&e.source, REL_CROSSPOST_FROM)?;
            need_sub(&e.dest, REL_CROSSPOST_FROM)?;
        }
        Ok(())
    }
}

/// What a build wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub subreddits: usize,
    pub posts: usize,
    pub crossposts: usize,
    pub aggregated_edges: usize,
    pub duplicates_skipped: usize,
}

pub struct GraphBuilder {
    progress: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self { progress: true }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Replace the store's graph with the one described by `links`.
    pub fn build(&self, store: &mut dyn GraphStore, links: &[CrosspostLink]) -> Result<BuildStats> {
        let plan = GraphPlan::from_links(links);
        plan.check_references()?;
        tracing::info!(
            subreddits = plan.subreddits.len(),
            posts = plan.posts.len(),
            crossposts = plan.crossposts.len(),
            edges = plan.edges.len(),
            "Writing crosspost graph to {}",
            store.backend()
        );

        let spinner = ProgressScope::spinner(self.progress, format!("Writing graph ({})", store.backend()));
        let res = store.replace_all(&plan).with_context(|| format!("write graph to {}", store.backend()));
        spinner.finish(if res.is_ok() { "Graph written" } else { "Graph write failed; rolled back" });
        res?;

        let counts = store.summary_counts()?;
        tracing::info!(
            subreddits = counts.subreddits,
            crossposts = counts.crossposts,
            connections = counts.unique_connections,
            "Graph creation complete"
        );

        Ok(BuildStats {
            subreddits: plan.subreddits.len(),
            posts: plan.posts.len(),
            crossposts: plan.crossposts.len(),
            aggregated_edges: plan.edges.len(),
            duplicates_skipped: plan.duplicates_skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ParentOrigin;
    use crate::post::PostSnapshot;

    fn snap(id: &str, sub: &str, subscribers: i64) -> PostSnapshot {
        PostSnapshot {
            id: id.into(),
            subreddit: sub.into(),
            author: format!("u_{id}"),
            title: format!("title {id}"),
            score: 1,
            created_utc: 0,
            subreddit_subscribers: subscribers,
        }
    }

    fn link(parent: (&str, &str, i64), post: (&str, &str, i64)) -> CrosspostLink {
        CrosspostLink::new(
            parent.0,
            snap(parent.0, parent.1, parent.2),
            snap(post.0, post.1, post.2),
            ParentOrigin::Indexed,
        )
    }

    #[test]
    fn fan_out_merges_parent_post_and_subreddits() {
        let links = vec![
            link(("p", "x", 100), ("c1", "y", 5)),
            link(("p", "x", 0), ("c2", "z", 7)),
            link(("p", "x", 120), ("c3", "y", 0)),
        ];
        let plan = GraphPlan::from_links(&links);

        assert_eq!(plan.crossposts.len(), 3);
        assert_eq!(plan.posts.len(), 4);
        let names: Vec<&str> = plan.subreddits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);

        let x = &plan.subreddits[0];
        assert_eq!((x.subscribers, x.source_count, x.dest_count), (120, 3, 0));
        let y = &plan.subreddits[1];
        assert_eq!((y.subscribers, y.source_count, y.dest_count), (5, 0, 2));

        // parent posted once in x, children once each
        assert_eq!(plan.posted_in.len(), 4);
        assert_eq!(plan.crosspost_of.len(), 3);
        assert_eq!(plan.edges.len(), 2);
        assert_eq!(plan.edges[0].count, 2);
        plan.check_references().unwrap();
    }

    #[test]
    fn duplicate_event_ids_are_dropped_everywhere() {
        let links = vec![link(("p", "x", 0), ("c", "y", 0)), link(("p", "x", 0), ("c", "y", 0))];
        let plan = GraphPlan::from_links(&links);
        assert_eq!(plan.duplicates_skipped, 1);
        assert_eq!(plan.crossposts.len(), 1);
        assert_eq!(plan.edges[0].count, 1);
        assert_eq!(plan.subreddits[0].source_count, 1);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let mut plan = GraphPlan::from_links(&[link(("p", "x", 0), ("c", "y", 0))]);
        plan.edges.push(AggregatedEdge { source: "x".into(), dest: "nowhere".into(), count: 1 });
        assert!(plan.check_references().is_err());
    }
}
