//! Neo4j backend over Bolt (`neo4rs`). The driver is async; this store owns a
//! current-thread runtime and blocks on every call, so the rest of the crate stays synchronous.

use super::{CrosspostRow, GraphStore, PathRow, SubredditCount, SubredditRow, SummaryCounts, TopPostRow};
use crate::config::StoreConfig;
use crate::graph::GraphPlan;
use anyhow::{Context, Result};
use neo4rs::{query, BoltMap, BoltType, ConfigBuilder, Graph, Query, Row};
use tokio::runtime::Runtime;

/// Rows per UNWIND statement.
const WRITE_BATCH: usize = 1000;

const INDEXES: [&str; 3] = [
    "CREATE INDEX post_id_index IF NOT EXISTS FOR (p:Post) ON (p.id)",
    "CREATE INDEX subreddit_name_index IF NOT EXISTS FOR (s:Subreddit) ON (s.name)",
    "CREATE INDEX crosspost_id_index IF NOT EXISTS FOR (c:Crosspost) ON (c.id)",
];

const CLEAR: &str = "MATCH (n) DETACH DELETE n";

const MERGE_SUBREDDITS: &str = "UNWIND $rows AS row
     MERGE (s:Subreddit {name: row.name})
     SET s.subscribers = row.subscribers,
         s.source_count = row.source_count,
         s.dest_count = row.dest_count";

const MERGE_POSTS: &str = "UNWIND $rows AS row
     MERGE (p:Post {id: row.id})
     SET p.title = row.title, p.author = row.author, p.score = row.score";

const CREATE_CROSSPOSTS: &str = "UNWIND $rows AS row
     CREATE (:Crosspost {id: row.id, title: row.title, parent_title: row.parent_title,
                         author: row.author, parent_author: row.parent_author,
                         score: row.score, parent_score: row.parent_score,
                         created_utc: row.created_utc})";

const LINK_CROSSPOSTS: &str = "UNWIND $rows AS row
     MATCH (c:Crosspost {id: row.id})
     MATCH (src:Subreddit {name: row.source})
     MATCH (dst:Subreddit {name: row.dest})
     MATCH (parent:Post {id: row.parent_id})
     MATCH (child:Post {id: row.post_id})
     CREATE (c)-[:FROM_SUBREDDIT]->(src),
            (c)-[:TO_SUBREDDIT]->(dst),
            (c)-[:ORIGINAL_POST]->(parent),
            (c)-[:REPOSTED_AS]->(child)";

const LINK_POSTED_IN: &str = "UNWIND $rows AS row
     MATCH (p:Post {id: row.post_id})
     MATCH (s:Subreddit {name: row.subreddit})
     CREATE (p)-[:POSTED_IN]->(s)";

const LINK_CROSSPOST_OF: &str = "UNWIND $rows AS row
     MATCH (child:Post {id: row.child_id})
     MATCH (parent:Post {id: row.parent_id})
     CREATE (child)-[:CROSSPOST_OF]->(parent)";

const LINK_AGGREGATED: &str = "UNWIND $rows AS row
     MATCH (dst:Subreddit {name: row.dest})
     MATCH (src:Subreddit {name: row.source})
     CREATE (dst)-[:CROSSPOST_FROM {weight: row.weight}]->(src)";

const READ_SUBREDDITS: &str = "MATCH (s:Subreddit)
     RETURN s.name AS name, s.subscribers AS subscribers,
            s.source_count AS source_count, s.dest_count AS dest_count";

const READ_CROSSPOSTS: &str = "MATCH (c:Crosspost)
     MATCH (c)-[:FROM_SUBREDDIT]->(source:Subreddit)
     MATCH (c)-[:TO_SUBREDDIT]->(dest:Subreddit)
     RETURN c.id AS id, c.title AS title, c.author AS author,
            source.name AS source_subreddit, dest.name AS dest_subreddit";

const TOP_POSTS: &str = "MATCH (p:Post)<-[r:CROSSPOST_OF]-()
     WITH p, COUNT(r) AS crosspost_count
     ORDER BY crosspost_count DESC
     LIMIT $limit
     RETURN p.id AS post_id, p.title AS title, p.author AS author,
            p.score AS score, crosspost_count,
            [(p)-[:POSTED_IN]->(s) | s.name][0] AS original_subreddit,
            [(p)<-[:CROSSPOST_OF]-(repost)-[:POSTED_IN]->(dest) | dest.name] AS crossposted_to";

const TOP_SOURCES: &str = "MATCH (source:Subreddit)<-[:FROM_SUBREDDIT]-(c:Crosspost)
     WITH source, COUNT(c) AS crosspost_count
     ORDER BY crosspost_count DESC
     LIMIT $limit
     RETURN source.name AS subreddit, crosspost_count";

const TOP_PATHS: &str = "MATCH (source:Subreddit)<-[:FROM_SUBREDDIT]-(c:Crosspost)-[:TO_SUBREDDIT]->(dest:Subreddit)
     WHERE source.name <> dest.name
     WITH source.name AS source_subreddit, dest.name AS dest_subreddit, COUNT(c) AS crosspost_count
     ORDER BY crosspost_count DESC
     LIMIT $limit
     RETURN source_subreddit, dest_subreddit, crosspost_count";

const EXAMPLES: &str = "MATCH (c:Crosspost)
     MATCH (c)-[:FROM_SUBREDDIT]->(source:Subreddit)
     MATCH (c)-[:TO_SUBREDDIT]->(dest:Subreddit)
     WHERE source.name <> dest.name
     RETURN c.id AS id, c.title AS title, c.author AS author,
            source.name AS source_subreddit, dest.name AS dest_subreddit
     LIMIT $limit";

const COUNT_SUBREDDITS: &str = "MATCH (s:Subreddit) RETURN COUNT(s) AS count";
const COUNT_CROSSPOSTS: &str = "MATCH (c:Crosspost) RETURN COUNT(c) AS count";
const COUNT_CONNECTIONS: &str = "MATCH (source:Subreddit)<-[:FROM_SUBREDDIT]-(c:Crosspost)-[:TO_SUBREDDIT]->(dest:Subreddit)
     WHERE source.name <> dest.name
     RETURN COUNT(DISTINCT [source.name, dest.name]) AS count";

pub struct Neo4jStore {
    rt: Runtime,
    graph: Graph,
    uri: String,
}

impl Neo4jStore {
    /// Connect once and verify the server answers. Any failure here is fatal for the run.
    pub fn connect(cfg: &StoreConfig) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("start runtime for graph store")?;
        let config = ConfigBuilder::default()
            .uri(cfg.uri.as_str())
            .user(cfg.user.as_str())
            .password(cfg.password.as_str())
            .fetch_size(500)
            .max_connections(2)
            .build()
            .with_context(|| format!("neo4j config for {}", cfg.uri))?;
        let graph = rt
            .block_on(Graph::connect(config))
            .with_context(|| format!("connect to {}", cfg.uri))?;

        let store = Self { rt, graph, uri: cfg.uri.clone() };
        store.scalar("RETURN 1 AS count").with_context(|| format!("ping {}", cfg.uri))?;
        tracing::info!(uri = %store.uri, "Connected to Neo4j");
        Ok(store)
    }

    /// Schema statements cannot share a transaction with data writes, so they run on their own.
    fn ensure_indexes(&self) -> Result<()> {
        self.rt.block_on(async {
            for stmt in INDEXES {
                self.graph.run(query(stmt)).await?;
            }
            Ok::<_, neo4rs::Error>(())
        })?;
        Ok(())
    }

    fn fetch(&self, q: Query) -> Result<Vec<Row>> {
        let rows = self.rt.block_on(async {
            let mut stream = self.graph.execute(q).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(row);
            }
            Ok::<_, neo4rs::Error>(rows)
        })?;
        Ok(rows)
    }

    fn scalar(&self, cypher: &str) -> Result<u64> {
        let rows = self.fetch(query(cypher))?;
        Ok(rows.first().and_then(|r| r.get::<i64>("count").ok()).unwrap_or(0).max(0) as u64)
    }
}

fn crosspost_row(row: &Row) -> CrosspostRow {
    CrosspostRow {
        id: row.get("id").unwrap_or_default(),
        title: row.get("title").unwrap_or_default(),
        author: row.get("author").unwrap_or_default(),
        source_subreddit: row.get("source_subreddit").unwrap_or_default(),
        dest_subreddit: row.get("dest_subreddit").unwrap_or_default(),
    }
}

fn bolt_row<const N: usize>(pairs: [(&str, BoltType); N]) -> BoltType {
    let mut m = BoltMap::new();
    for (k, v) in pairs {
        m.put(k.into(), v);
    }
    BoltType::Map(m)
}

fn s(v: &str) -> BoltType {
    BoltType::from(v.to_string())
}

fn n(v: i64) -> BoltType {
    BoltType::from(v)
}

/// One UNWIND query per batch of rows.
fn batched(cypher: &'static str, rows: Vec<BoltType>) -> Vec<Query> {
    rows.chunks(WRITE_BATCH)
        .map(|chunk| query(cypher).param("rows", chunk.to_vec()))
        .collect()
}

/// The whole write, in order: clear, node sets, then relationship sets.
fn write_queries(plan: &GraphPlan) -> Vec<(&'static str, Vec<Query>)> {
    let subreddits = plan
        .subreddits
        .iter()
        .map(|x| {
            bolt_row([
                ("name", s(&x.name)),
                ("subscribers", n(x.subscribers)),
                ("source_count", n(x.source_count as i64)),
                ("dest_count", n(x.dest_count as i64)),
            ])
        })
        .collect();
    let posts = plan
        .posts
        .iter()
        .map(|p| bolt_row([("id", s(&p.id)), ("title", s(&p.title)), ("author", s(&p.author)), ("score", n(p.score))]))
        .collect();
    let crossposts: Vec<BoltType> = plan
        .crossposts
        .iter()
        .map(|c| {
            bolt_row([
                ("id", s(&c.id)),
                ("post_id", s(&c.post_id)),
                ("parent_id", s(&c.parent_id)),
                ("source", s(&c.source)),
                ("dest", s(&c.dest)),
                ("title", s(&c.title)),
                ("parent_title", s(&c.parent_title)),
                ("author", s(&c.author)),
                ("parent_author", s(&c.parent_author)),
                ("score", n(c.score)),
                ("parent_score", n(c.parent_score)),
                ("created_utc", n(c.created_utc)),
            ])
        })
        .collect();
    let posted_in = plan
        .posted_in
        .iter()
        .map(|r| bolt_row([("post_id", s(&r.post_id)), ("subreddit", s(&r.subreddit))]))
        .collect();
    let crosspost_of = plan
        .crosspost_of
        .iter()
        .map(|r| bolt_row([("child_id", s(&r.child_id)), ("parent_id", s(&r.parent_id))]))
        .collect();
    let edges = plan
        .edges
        .iter()
        .map(|e| bolt_row([("source", s(&e.source)), ("dest", s(&e.dest)), ("weight", n(e.count as i64))]))
        .collect();

    vec![
        ("clear", vec![query(CLEAR)]),
        ("subreddits", batched(MERGE_SUBREDDITS, subreddits)),
        ("posts", batched(MERGE_POSTS, posts)),
        ("crossposts", batched(CREATE_CROSSPOSTS, crossposts.clone())),
        ("crosspost relationships", batched(LINK_CROSSPOSTS, crossposts)),
        ("posted_in", batched(LINK_POSTED_IN, posted_in)),
        ("crosspost_of", batched(LINK_CROSSPOST_OF, crosspost_of)),
        ("aggregated edges", batched(LINK_AGGREGATED, edges)),
    ]
}

impl GraphStore for Neo4jStore {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    fn replace_all(&mut self, plan: &GraphPlan) -> Result<()> {
        self.ensure_indexes()?;
        let steps = write_queries(plan);
        self.rt.block_on(async {
            let mut txn = self.graph.start_txn().await.context("begin transaction")?;
            for (step, queries) in steps {
                tracing::debug!(step, statements = queries.len(), "writing");
                for q in queries {
                    if let Err(e) = txn.run(q).await {
                        // nothing from this run is visible until commit
                        if let Err(rb) = txn.rollback().await {
                            tracing::warn!("rollback failed: {rb}");
                        }
                        return Err(anyhow::Error::new(e).context(format!("write {step}")));
                    }
                }
            }
            txn.commit().await.context("commit transaction")?;
            Ok::<(), anyhow::Error>(())
        })
    }

    fn subreddit_rows(&self) -> Result<Vec<SubredditRow>> {
        Ok(self
            .fetch(query(READ_SUBREDDITS))?
            .iter()
            .map(|row| SubredditRow {
                name: row.get("name").unwrap_or_default(),
                subscribers: row.get::<i64>("subscribers").unwrap_or(0),
                source_count: row.get::<i64>("source_count").unwrap_or(0).max(0) as u64,
                dest_count: row.get::<i64>("dest_count").unwrap_or(0).max(0) as u64,
            })
            .collect())
    }

    fn crosspost_rows(&self) -> Result<Vec<CrosspostRow>> {
        Ok(self.fetch(query(READ_CROSSPOSTS))?.iter().map(crosspost_row).collect())
    }

    fn top_posts(&self, limit: usize) -> Result<Vec<TopPostRow>> {
        let q = query(TOP_POSTS).param("limit", limit as i64);
        Ok(self
            .fetch(q)?
            .iter()
            .map(|row| {
                let mut dests: Vec<String> = Vec::new();
                for d in row.get::<Vec<String>>("crossposted_to").unwrap_or_default() {
                    if !dests.contains(&d) {
                        dests.push(d);
                    }
                }
                TopPostRow {
                    post_id: row.get("post_id").unwrap_or_default(),
                    title: row.get("title").unwrap_or_default(),
                    author: row.get("author").unwrap_or_default(),
                    score: row.get::<i64>("score").unwrap_or(0),
                    crosspost_count: row.get::<i64>("crosspost_count").unwrap_or(0).max(0) as u64,
                    original_subreddit: row.get::<String>("original_subreddit").ok(),
                    crossposted_to: dests,
                }
            })
            .collect())
    }

    fn top_sources(&self, limit: usize) -> Result<Vec<SubredditCount>> {
        let q = query(TOP_SOURCES).param("limit", limit as i64);
        Ok(self
            .fetch(q)?
            .iter()
            .map(|row| SubredditCount {
                name: row.get("subreddit").unwrap_or_default(),
                count: row.get::<i64>("crosspost_count").unwrap_or(0).max(0) as u64,
            })
            .collect())
    }

    fn top_paths(&self, limit: usize) -> Result<Vec<PathRow>> {
        let q = query(TOP_PATHS).param("limit", limit as i64);
        Ok(self
            .fetch(q)?
            .iter()
            .map(|row| PathRow {
                source: row.get("source_subreddit").unwrap_or_default(),
                dest: row.get("dest_subreddit").unwrap_or_default(),
                count: row.get::<i64>("crosspost_count").unwrap_or(0).max(0) as u64,
            })
            .collect())
    }

    fn examples(&self, limit: usize) -> Result<Vec<CrosspostRow>> {
        let q = query(EXAMPLES).param("limit", limit as i64);
        Ok(self.fetch(q)?.iter().map(crosspost_row).collect())
    }

    fn summary_counts(&self) -> Result<SummaryCounts> {
        Ok(SummaryCounts {
            subreddits: self.scalar(COUNT_SUBREDDITS)?,
            crossposts: self.scalar(COUNT_CROSSPOSTS)?,
            unique_connections: self.scalar(COUNT_CONNECTIONS)?,
        })
    }
}
