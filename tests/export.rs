#[path = "common/mod.rs"]
mod common;

use anyhow::Result;
use common::*;
use serde_json::json;
use xpost::{
    aggregate_edges, AggregatedEdge, CrosspostRow, EdgeKind, ExportNode, GraphBuilder, GraphPlan, GraphStore, MemoryStore,
    NetworkGraph, NodeKind, PathRow, SubredditCount, SubredditRow, SummaryCounts, TopPostRow,
};

fn exported(posts: &[serde_json::Value]) -> NetworkGraph {
    let links = links_for(posts);
    let mut store = MemoryStore::new();
    GraphBuilder::new().progress(false).build(&mut store, &links).unwrap();
    NetworkGraph::from_store(&store).unwrap()
}

/// Two posts, one crosspost: one x -> y edge of weight 1, then 2 subreddit nodes,
/// 1 crosspost node and 2 edges in the export.
#[test]
fn minimal_network_shape() {
    let posts = [post("A", "x"), crosspost("B", "y", "A")];
    assert_eq!(
        aggregate_edges(&links_for(&posts)),
        vec![AggregatedEdge { source: "x".into(), dest: "y".into(), count: 1 }]
    );
    let net = exported(&posts);

    let stats = net.stats();
    assert_eq!(stats.subreddit_nodes, 2);
    assert_eq!(stats.crosspost_nodes, 1);
    assert_eq!(stats.edges, 2);

    let mut edges = net.edges();
    edges.sort_by_key(|(_, to, _)| to.to_string());
    assert_eq!(edges, vec![("cp_A_B", "sub_x", EdgeKind::FromSubreddit), ("cp_A_B", "sub_y", EdgeKind::ToSubreddit)]);

    match net.node("sub_x").unwrap() {
        ExportNode::Subreddit { label, source_count, dest_count, subscribers, size, .. } => {
            assert_eq!(label, "r/x");
            assert_eq!((*source_count, *dest_count, *subscribers, *size), (1, 0, 1000, 11));
        }
        other => panic!("unexpected node {other:?}"),
    }
}

/// Crosspost nodes exported == links with source != dest.
#[test]
fn self_referential_crossposts_are_not_exported() {
    let posts = make_dump();
    let links = links_for(&posts);
    let net = exported(&posts);

    let expected = links.iter().filter(|l| !l.is_self_link()).count();
    assert_eq!(net.count_kind(NodeKind::Crosspost), expected);
    assert!(net.node("cp_a_h").is_none());
    assert_eq!(net.stats().edges, expected * 2);
    // subreddit counts come from the store, so r/pics still counts h
    match net.node("sub_pics").unwrap() {
        ExportNode::Subreddit { source_count, dest_count, .. } => assert_eq!((*source_count, *dest_count), (4, 1)),
        other => panic!("unexpected node {other:?}"),
    }
}

/// Long titles are cut to 20 characters plus an ellipsis; the full title is kept alongside.
#[test]
fn crosspost_labels_are_truncated() {
    let mut child = crosspost("B", "y", "A");
    child["data"]["title"] = json!("An unusually long crosspost title");
    let net = exported(&[post("A", "x"), child]);

    match net.node("cp_A_B").unwrap() {
        ExportNode::Crosspost { label, title, author, size, .. } => {
            assert_eq!(label, "An unusually long cr...");
            assert_eq!(title, "An unusually long crosspost title");
            assert_eq!(author, "u_B");
            assert_eq!(*size, 5);
        }
        other => panic!("unexpected node {other:?}"),
    }
}

/// GraphML output declares typed keys and escapes text.
#[test]
fn graphml_document_is_well_formed() {
    let mut child = crosspost("B", "y", "A");
    child["data"]["title"] = json!("Tom & Jerry <3");
    let net = exported(&[post("A", "x"), child]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net.graphml");
    net.write_graphml(&path).unwrap();
    let xml = std::fs::read_to_string(&path).unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains(r#"<graph edgedefault="directed">"#));
    assert!(xml.contains(r#"attr.name="source_count" attr.type="long""#));
    assert!(xml.contains(r#"<node id="sub_x">"#));
    assert!(xml.contains(r#"<data key="d_type">crosspost</data>"#));
    assert!(xml.contains("Tom &amp; Jerry &lt;3"));
    assert!(xml.contains(r#"<edge source="cp_A_B" target="sub_y">"#));
    assert!(xml.contains(r#"<data key="e_type">to_subreddit</data>"#));
    assert_eq!(xml.matches("<node ").count(), 3);
    assert_eq!(xml.matches("<edge ").count(), 2);
    assert!(xml.trim_end().ends_with("</graphml>"));
}

/// Node-link JSON mirrors the same node and edge sets.
#[test]
fn node_link_json_mirrors_graph() {
    let net = exported(&make_dump());
    let doc = net.to_node_link_json();

    assert_eq!(doc["directed"], json!(true));
    let nodes = doc["nodes"].as_array().unwrap();
    let links = doc["links"].as_array().unwrap();
    assert_eq!(nodes.len(), net.graph().node_count());
    assert_eq!(links.len(), net.graph().edge_count());
    assert!(nodes.iter().any(|n| n["id"] == "sub_gifs" && n["type"] == "subreddit" && n["subscribers"] == 5000));
    assert!(links.iter().all(|l| l["type"] == "from_subreddit" || l["type"] == "to_subreddit"));
}

/// Exporting twice from the same store state gives the same node and edge sets.
#[test]
fn export_is_stable_for_same_store() {
    let links = links_for(&make_dump());
    let mut store = MemoryStore::new();
    GraphBuilder::new().progress(false).build(&mut store, &links).unwrap();

    let a = NetworkGraph::from_store(&store).unwrap();
    let b = NetworkGraph::from_store(&store).unwrap();
    let sorted = |n: &NetworkGraph| {
        let mut e: Vec<(String, String)> = n.edges().into_iter().map(|(f, t, _)| (f.to_string(), t.to_string())).collect();
        e.sort();
        e
    };
    assert_eq!(sorted(&a), sorted(&b));
    assert_eq!(a.stats(), b.stats());
}

/// Store that holds crosspost events but no subreddit rows, as a partially written
/// or hand-edited database can.
struct EventsOnly(Vec<CrosspostRow>);

impl GraphStore for EventsOnly {
    fn backend(&self) -> &'static str {
        "events-only"
    }
    fn replace_all(&mut self, _plan: &GraphPlan) -> Result<()> {
        anyhow::bail!("read-only")
    }
    fn subreddit_rows(&self) -> Result<Vec<SubredditRow>> {
        Ok(Vec::new())
    }
    fn crosspost_rows(&self) -> Result<Vec<CrosspostRow>> {
        Ok(self.0.clone())
    }
    fn top_posts(&self, _limit: usize) -> Result<Vec<TopPostRow>> {
        Ok(Vec::new())
    }
    fn top_sources(&self, _limit: usize) -> Result<Vec<SubredditCount>> {
        Ok(Vec::new())
    }
    fn top_paths(&self, _limit: usize) -> Result<Vec<PathRow>> {
        Ok(Vec::new())
    }
    fn examples(&self, _limit: usize) -> Result<Vec<CrosspostRow>> {
        Ok(Vec::new())
    }
    fn summary_counts(&self) -> Result<SummaryCounts> {
        Ok(SummaryCounts::default())
    }
}

/// Subreddits an event points at but the store has no row for are exported with zeroed attributes.
#[test]
fn missing_subreddit_rows_export_as_zeroed_nodes() {
    let store = EventsOnly(vec![CrosspostRow {
        id: "p_c".into(),
        title: "t".into(),
        author: "u".into(),
        source_subreddit: "x".into(),
        dest_subreddit: "y".into(),
    }]);
    let net = NetworkGraph::from_store(&store).unwrap();

    let stats = net.stats();
    assert_eq!((stats.subreddit_nodes, stats.crosspost_nodes, stats.edges), (2, 1, 2));
    for key in ["sub_x", "sub_y"] {
        match net.node(key).unwrap() {
            ExportNode::Subreddit { source_count, dest_count, subscribers, size, .. } => {
                assert_eq!((*source_count, *dest_count, *subscribers, *size), (0, 0, 0, 10));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }
    let mut edges = net.edges();
    edges.sort_by_key(|(_, to, _)| to.to_string());
    assert_eq!(edges, vec![("cp_p_c", "sub_x", EdgeKind::FromSubreddit), ("cp_p_c", "sub_y", EdgeKind::ToSubreddit)]);
}
