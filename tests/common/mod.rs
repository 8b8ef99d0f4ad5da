#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use xpost::{resolve_crossposts, CrosspostLink, ResolveOptions};

/// A listing record for a plain (non-crosspost) submission.
pub fn post(id: &str, subreddit: &str) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id, "subreddit": subreddit, "author": format!("u_{id}"),
            "title": format!("Post {id} in r/{subreddit}"), "score": 10,
            "created_utc": 1_700_000_000, "subreddit_subscribers": 1000
        }
    })
}

/// A crosspost of `parent_id` (token `t3_{parent_id}`) into `subreddit`.
pub fn crosspost(id: &str, subreddit: &str, parent_id: &str) -> Value {
    let mut v = post(id, subreddit);
    v["data"]["crosspost_parent"] = json!(format!("t3_{parent_id}"));
    v
}

/// Same as `crosspost`, with an embedded parent snapshot living in `parent_subreddit`.
pub fn crosspost_with_list(id: &str, subreddit: &str, parent_id: &str, parent_subreddit: &str) -> Value {
    let mut v = crosspost(id, subreddit, parent_id);
    v["data"]["crosspost_parent_list"] = json!([{
        "id": parent_id, "subreddit": parent_subreddit, "author": "op",
        "title": "Embedded parent", "score": 99, "subreddit_subscribers": 5000
    }]);
    v
}

/// Small dump:
/// - a (r/pics), crossposted by b (r/funny) and c (r/aww)
/// - d (r/pics) crossposted by e (r/funny)
/// - f (r/funny) crossposts a parent `zz` missing from the dump, via its embedded list (r/gifs)
/// - g (r/pics) crossposts a missing parent with no list (dropped)
/// - h (r/pics) crossposts a within r/pics (self-referential)
/// - one record with no `data` at all
pub fn make_dump() -> Vec<Value> {
    vec![
        post("a", "pics"),
        crosspost("b", "funny", "a"),
        crosspost("c", "aww", "a"),
        post("d", "pics"),
        crosspost("e", "funny", "d"),
        crosspost_with_list("f", "funny", "zz", "gifs"),
        crosspost("g", "pics", "missing"),
        crosspost("h", "pics", "a"),
        json!({"kind": "t3"}),
    ]
}

pub fn links_for(posts: &[Value]) -> Vec<CrosspostLink> {
    resolve_crossposts(posts, &ResolveOptions::default()).links
}

/// Write `posts` as the JSON array input file under `dir`.
pub fn write_input(dir: &Path, posts: &[Value]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let p = dir.join("input.json");
    fs::write(&p, serde_json::to_vec(posts).unwrap()).unwrap();
    p
}
