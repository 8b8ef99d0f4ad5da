//! Crosspost resolution: match every crosspost in the dump to its parent post.
//!
//! Parents are looked up in an id index built once over the whole dump. When the
//! parent is not in the dump, the first entry of the child's embedded
//! `crosspost_parent_list` stands in for it. Bad records are logged and skipped;
//! resolution itself never fails.

use crate::error::RecordError;
use crate::link::{CrosspostLink, ParentOrigin, EVENT_ID_SEP};
use crate::post::{parse_parent_token, record_data, str_field, PostSnapshot};
use crate::progress::ProgressScope;
use ahash::{AHashMap, AHashSet};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

/// Records inspected when collecting subreddits for demo links.
const DEMO_SCAN_RECORDS: usize = 100;
/// Distinct subreddits demo links are drawn from.
const DEMO_MAX_SUBREDDITS: usize = 10;
/// Upper bound on demo draws.
const DEMO_MAX_LINKS: usize = 20;

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// Synthesize sample links when the dump has no crossposts at all. Never on by default.
    pub demo_mode: bool,
    pub progress: bool,
}

/// Resolver output plus the counters it logs.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub links: Vec<CrosspostLink>,
    pub scanned: usize,
    pub crossposts_seen: usize,
    pub resolved_by_index: usize,
    pub resolved_by_list: usize,
    pub unresolved: usize,
    pub skipped_malformed: usize,
    pub synthetic: usize,
}

/// id -> `data` payload, first occurrence wins.
fn build_index(posts: &[Value]) -> AHashMap<&str, &Value> {
    let mut idx = AHashMap::with_capacity(posts.len());
    for rec in posts {
        if let Some(data) = record_data(rec) {
            if let Some(id) = str_field(data, "id") {
                idx.entry(id).or_insert(data);
            }
        }
    }
    idx
}

enum Outcome {
    NotCrosspost,
    Linked(CrosspostLink),
    Unresolved { post_id: String, parent_id: String },
}

fn resolve_one(rec: &Value, index: &AHashMap<&str, &Value>) -> Result<Outcome, RecordError> {
    let data = record_data(rec).ok_or(RecordError::MissingData)?;
    let token = match str_field(data, "crosspost_parent") {
        Some(t) => t,
        None => return Ok(Outcome::NotCrosspost),
    };
    let post = PostSnapshot::from_value(data)?;
    let parent_id = parse_parent_token(token).ok_or_else(|| RecordError::BadParentToken(token.to_string()))?;
    // `{parent}_{child}` must identify exactly one event
    for id in [post.id.as_str(), parent_id] {
        if id.contains(EVENT_ID_SEP) {
            return Err(RecordError::AmbiguousId(id.to_string()));
        }
    }

    if let Some(parent_data) = index.get(parent_id) {
        let parent = PostSnapshot::from_value(parent_data)?;
        return Ok(Outcome::Linked(CrosspostLink::new(parent_id, parent, post, ParentOrigin::Indexed)));
    }

    let embedded = data
        .get("crosspost_parent_list")
        .and_then(|l| l.as_array())
        .and_then(|l| l.first());
    match embedded {
        Some(entry) => {
            let parent = PostSnapshot::from_value(entry).map_err(|e| RecordError::BadParentEntry(Box::new(e)))?;
            Ok(Outcome::Linked(CrosspostLink::new(parent_id, parent, post, ParentOrigin::EmbeddedList)))
        }
        None => Ok(Outcome::Unresolved { post_id: post.id, parent_id: parent_id.to_string() }),
    }
}

/// Resolve all crossposts in `posts`. Demo links (if enabled) use the thread RNG.
pub fn resolve_crossposts(posts: &[Value], opts: &ResolveOptions) -> Resolution {
    resolve_crossposts_with_rng(posts, opts, &mut rand::thread_rng())
}

pub fn resolve_crossposts_with_rng<R: Rng + ?Sized>(
    posts: &[Value],
    opts: &ResolveOptions,
    rng: &mut R,
) -> Resolution {
    let index = build_index(posts);
    tracing::debug!(indexed = index.len(), "built post id index");

    let pb = ProgressScope::count(opts.progress, "Scanning posts", posts.len() as u64);

    let mut out = Resolution { scanned: posts.len(), ..Default::default() };
    let mut children: AHashSet<String> = AHashSet::new();

    for (i, rec) in posts.iter().enumerate() {
        pb.inc(1);
        match resolve_one(rec, &index) {
            Ok(Outcome::NotCrosspost) => {}
            Ok(Outcome::Linked(link)) => {
                out.crossposts_seen += 1;
                // a post has exactly one parent; a repeated record would double-count it
                if !children.insert(link.post_id.clone()) {
                    tracing::warn!(post_id = %link.post_id, "duplicate crosspost record; keeping the first");
                    out.skipped_malformed += 1;
                    continue;
                }
                match link.parent_origin {
                    ParentOrigin::Indexed => out.resolved_by_index += 1,
                    _ => out.resolved_by_list += 1,
                }
                out.links.push(link);
            }
            Ok(Outcome::Unresolved { post_id, parent_id }) => {
                out.crossposts_seen += 1;
                out.unresolved += 1;
                tracing::debug!(%post_id, %parent_id, "parent not found and no crosspost_parent_list; skipping");
            }
            Err(e) => {
                out.skipped_malformed += 1;
                let id = record_data(rec).and_then(|d| str_field(d, "id")).unwrap_or("unknown");
                tracing::warn!(record = i, post_id = id, "skipping post: {e}");
            }
        }
    }

    pb.finish("Scanning posts: done");

    tracing::info!(
        links = out.links.len(),
        by_index = out.resolved_by_index,
        by_list = out.resolved_by_list,
        unresolved = out.unresolved,
        skipped = out.skipped_malformed,
        "Found {} crossposts",
        out.links.len()
    );

    if out.links.is_empty() {
        if opts.demo_mode {
            out.links = synthesize_demo_links(posts, rng);
            out.synthetic = out.links.len();
            tracing::warn!(synthetic = out.synthetic, "no crossposts found; demo mode created sample links");
        } else {
            tracing::warn!("no crossposts found in input; enable demo mode to synthesize sample links");
        }
    }

    out
}

/// Random subreddit-pair links over the subreddits seen at the head of the dump.
/// Self-pairs are drawn but dropped, so fewer than the bound may come back.
pub fn synthesize_demo_links<R: Rng + ?Sized>(posts: &[Value], rng: &mut R) -> Vec<CrosspostLink> {
    let mut subs: Vec<&str> = Vec::new();
    for rec in posts.iter().take(DEMO_SCAN_RECORDS) {
        if let Some(s) = record_data(rec).and_then(|d| str_field(d, "subreddit")) {
            if !subs.contains(&s) {
                subs.push(s);
            }
        }
    }
    subs.truncate(DEMO_MAX_SUBREDDITS);
    if subs.len() < 2 {
        return Vec::new();
    }

    let sample = |id: String, sub: &str, title: &str| PostSnapshot {
        id,
        subreddit: sub.to_string(),
        author: "sample_user".to_string(),
        title: title.to_string(),
        score: 0,
        created_utc: 0,
        subreddit_subscribers: 0,
    };

    let mut links = Vec::new();
    for i in 0..DEMO_MAX_LINKS.min(subs.len() * 2) {
        let (Some(&source), Some(&dest)) = (subs.choose(&mut *rng), subs.choose(&mut *rng)) else { continue };
        if source == dest {
            continue;
        }
        let parent_id = format!("parent_{i}");
        let parent = sample(parent_id.clone(), source, "Sample Parent");
        let post = sample(format!("sample_{i}"), dest, "Sample Post");
        links.push(CrosspostLink::new(&parent_id, parent, post, ParentOrigin::Synthetic));
    }
    links
}
