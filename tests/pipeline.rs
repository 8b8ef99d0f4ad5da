#[path = "common/mod.rs"]
mod common;

use common::*;
use serde_json::Value;
use std::fs;
use xpost::{CrosspostNetwork, GraphBuilder, GraphStore, MemoryStore, RunMode};

fn read_json(p: &std::path::Path) -> Value {
    serde_json::from_slice(&fs::read(p).unwrap()).unwrap()
}

#[test]
fn full_run_writes_store_summary_and_exports() {
    let td = tempfile::tempdir().unwrap();
    let input = write_input(td.path(), &make_dump());
    let out = td.path().join("out");

    let net = CrosspostNetwork::new().input(&input).output_dir(&out).progress(false);
    let mut store = MemoryStore::new();
    let outcome = net.run(&mut store).unwrap();

    let res = outcome.resolution.as_ref().unwrap();
    assert_eq!(res.links.len(), 5);
    assert_eq!(outcome.build.as_ref().unwrap().crossposts, 5);
    assert_eq!(store.writes(), 1);

    let opts = net.options();
    for p in [opts.summary_path(), opts.graphml_path(), opts.node_link_path()] {
        assert!(p.exists(), "missing {}", p.display());
        assert!(outcome.written.contains(&p));
    }

    let summary = read_json(&opts.summary_path());
    let stats = &summary["stats"];
    // h (pics -> pics) counts as a crosspost but not as a connection
    assert_eq!(stats["total_crossposts"], 5);
    assert_eq!(stats["unique_connections"], 3);
    assert_eq!(stats["total_subreddits"], 4);
    assert_eq!(stats["top_source_subreddits"][0]["name"], "pics");
    assert_eq!(stats["top_source_subreddits"][0]["count"], 4);
    assert_eq!(stats["top_destination_subreddits"][0]["name"], "funny");
    assert_eq!(stats["top_destination_subreddits"][0]["count"], 3);
    assert_eq!(summary["crossposts"].as_array().unwrap().len(), 5);
    assert_eq!(summary["crossposts"][0]["original"]["id"], "a");
    assert_eq!(summary["crossposts"][0]["crosspost"]["subreddit"], "funny");

    let export = outcome.export.unwrap();
    assert_eq!((export.subreddit_nodes, export.crosspost_nodes, export.edges), (4, 4, 8));
    assert_eq!(outcome.report.counts.crossposts, 5);
    assert_eq!(outcome.report.top_posts[0].post_id, "a");
}

#[test]
fn analysis_only_reads_store_and_writes_nothing() {
    let td = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    GraphBuilder::new().progress(false).build(&mut store, &links_for(&make_dump())).unwrap();

    let out = td.path().join("out");
    let outcome = CrosspostNetwork::new()
        .input(td.path().join("does-not-exist.json"))
        .output_dir(&out)
        .mode(RunMode::AnalysisOnly)
        .progress(false)
        .run(&mut store)
        .unwrap();

    assert!(outcome.resolution.is_none());
    assert!(outcome.export.is_none());
    assert!(outcome.written.is_empty());
    assert_eq!(outcome.report.counts.subreddits, 4);
    assert_eq!(store.writes(), 1);
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn skip_import_exports_existing_graph_without_summary() {
    let td = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    GraphBuilder::new()
        .progress(false)
        .build(&mut store, &links_for(&[post("A", "x"), crosspost("B", "y", "A")]))
        .unwrap();

    let net = CrosspostNetwork::new().output_dir(td.path()).mode(RunMode::SkipImport).progress(false);
    let outcome = net.run(&mut store).unwrap();

    assert!(outcome.build.is_none());
    assert!(!net.options().summary_path().exists());
    assert!(net.options().graphml_path().exists());
    let nl = read_json(&net.options().node_link_path());
    assert_eq!(nl["nodes"].as_array().unwrap().len(), 3);
}

#[test]
fn demo_mode_fills_an_empty_dump() {
    let td = tempfile::tempdir().unwrap();
    // ten subreddits, twenty draws: all-self-pair draws are practically impossible
    let posts: Vec<Value> = (0..10).map(|i| post(&format!("p{i}"), &format!("sub{i}"))).collect();
    let input = write_input(td.path(), &posts);

    let mut store = MemoryStore::new();
    let outcome = CrosspostNetwork::new()
        .input(&input)
        .output_dir(td.path())
        .demo_mode(true)
        .progress(false)
        .run(&mut store)
        .unwrap();

    let res = outcome.resolution.unwrap();
    assert!(!res.links.is_empty());
    assert_eq!(res.synthetic, res.links.len());
    assert!(res.links.iter().all(|l| l.source_subreddit != l.dest_subreddit));
    assert_eq!(store.summary_counts().unwrap().crossposts as usize, res.links.len());
}

#[test]
fn empty_dump_without_demo_gives_empty_outputs() {
    let td = tempfile::tempdir().unwrap();
    let input = write_input(td.path(), &[post("a", "x")]);

    let net = CrosspostNetwork::new().input(&input).output_dir(td.path()).progress(false);
    let mut store = MemoryStore::new();
    let outcome = net.run(&mut store).unwrap();

    assert_eq!(outcome.export.unwrap().edges, 0);
    let summary = read_json(&net.options().summary_path());
    assert_eq!(summary["stats"]["total_crossposts"], 0);
    assert!(summary["nodes"].as_array().unwrap().is_empty());
}

#[test]
fn missing_input_fails_full_run_before_touching_store() {
    let td = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let err = CrosspostNetwork::new()
        .input(td.path().join("nope.json"))
        .output_dir(td.path())
        .progress(false)
        .run(&mut store);
    assert!(err.is_err());
    assert_eq!(store.writes(), 0);
}

#[test]
fn summary_top_lists_follow_top_n() {
    let td = tempfile::tempdir().unwrap();
    let input = write_input(td.path(), &make_dump());

    for (n, expected) in [(1usize, 1usize), (0, 0), (10, 3)] {
        let out = td.path().join(format!("top{n}"));
        let net = CrosspostNetwork::new().input(&input).output_dir(&out).top_n(n).progress(false);
        net.run(&mut MemoryStore::new()).unwrap();

        let summary = read_json(&net.options().summary_path());
        let stats = &summary["stats"];
        // destinations: funny, aww, pics
        assert_eq!(stats["top_destination_subreddits"].as_array().unwrap().len(), expected, "top_n={n}");
        assert!(stats["top_source_subreddits"].as_array().unwrap().len() <= n);
        // totals are never cut
        assert_eq!(stats["total_crossposts"], 5);
    }
}
