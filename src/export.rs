//! Network export: project the stored graph into a `petgraph` digraph and write it out
//! as GraphML (Gephi, yEd, networkx) or node-link JSON (d3-style web views).
//!
//! The projection only reads from the store.

use crate::store::GraphStore;
use crate::util::{truncate_label, write_atomic};
use ahash::AHashMap;
use anyhow::{Context, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;

/// Crosspost labels are cut to this many characters.
pub const LABEL_MAX_CHARS: usize = 20;
const SUBREDDIT_BASE_SIZE: i64 = 10;
const CROSSPOST_SIZE: i64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Subreddit,
    Crosspost,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Subreddit => "subreddit",
            NodeKind::Crosspost => "crosspost",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportNode {
    Subreddit {
        key: String,
        label: String,
        source_count: i64,
        dest_count: i64,
        subscribers: i64,
        size: i64,
    },
    Crosspost {
        key: String,
        label: String,
        title: String,
        author: String,
        size: i64,
    },
}

impl ExportNode {
    pub fn key(&self) -> &str {
        match self {
            ExportNode::Subreddit { key, .. } | ExportNode::Crosspost { key, .. } => key,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ExportNode::Subreddit { .. } => NodeKind::Subreddit,
            ExportNode::Crosspost { .. } => NodeKind::Crosspost,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ExportNode::Subreddit { label, .. } | ExportNode::Crosspost { label, .. } => label,
        }
    }

    fn attributes(&self) -> Vec<(&'static str, Attr<'_>)> {
        let mut out = vec![("type", Attr::Str(self.kind().as_str())), ("label", Attr::Str(self.label()))];
        match self {
            ExportNode::Subreddit { source_count, dest_count, subscribers, size, .. } => {
                out.push(("source_count", Attr::Long(*source_count)));
                out.push(("dest_count", Attr::Long(*dest_count)));
                out.push(("subscribers", Attr::Long(*subscribers)));
                out.push(("size", Attr::Long(*size)));
            }
            ExportNode::Crosspost { title, author, size, .. } => {
                out.push(("title", Attr::Str(title)));
                out.push(("author", Attr::Str(author)));
                out.push(("size", Attr::Long(*size)));
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    FromSubreddit,
    ToSubreddit,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::FromSubreddit => "from_subreddit",
            EdgeKind::ToSubreddit => "to_subreddit",
        }
    }
}

enum Attr<'a> {
    Str(&'a str),
    Long(i64),
}

/// GraphML key declarations: (id, domain, attr.name, attr.type).
const GRAPHML_KEYS: [(&str, &str, &str, &str); 9] = [
    ("d_type", "node", "type", "string"),
    ("d_label", "node", "label", "string"),
    ("d_source_count", "node", "source_count", "long"),
    ("d_dest_count", "node", "dest_count", "long"),
    ("d_subscribers", "node", "subscribers", "long"),
    ("d_size", "node", "size", "long"),
    ("d_title", "node", "title", "string"),
    ("d_author", "node", "author", "string"),
    ("e_type", "edge", "type", "string"),
];

/// Counts logged and returned after an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub subreddit_nodes: usize,
    pub crosspost_nodes: usize,
    pub edges: usize,
}

/// Directed crosspost network: crosspost nodes point at their source and destination subreddits.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
    graph: DiGraph<ExportNode, EdgeKind>,
    by_key: AHashMap<String, NodeIndex>,
}

impl NetworkGraph {
    /// Read subreddits and crosspost events back from the store.
    pub fn from_store(store: &dyn GraphStore) -> Result<Self> {
        let mut net = NetworkGraph::default();

        for row in store.subreddit_rows().context("read subreddits")? {
            let src = row.source_count as i64;
            let dst = row.dest_count as i64;
            net.add_node(ExportNode::Subreddit {
                key: subreddit_key(&row.name),
                label: format!("r/{}", row.name),
                source_count: src,
                dest_count: dst,
                subscribers: row.subscribers,
                size: SUBREDDIT_BASE_SIZE + src + dst,
            });
        }

        for row in store.crosspost_rows().context("read crossposts")? {
            if row.source_subreddit == row.dest_subreddit {
                continue;
            }
            let key = format!("cp_{}", row.id);
            if net.by_key.contains_key(&key) {
                tracing::warn!(crosspost_id = %row.id, "crosspost read back twice; keeping one");
                continue;
            }
            let cp = net.add_node(ExportNode::Crosspost {
                key,
                label: truncate_label(&row.title, LABEL_MAX_CHARS),
                title: row.title.clone(),
                author: row.author.clone(),
                size: CROSSPOST_SIZE,
            });
            let src = net.subreddit_or_default(&row.source_subreddit);
            let dst = net.subreddit_or_default(&row.dest_subreddit);
            net.graph.add_edge(cp, src, EdgeKind::FromSubreddit);
            net.graph.add_edge(cp, dst, EdgeKind::ToSubreddit);
        }

        let stats = net.stats();
        tracing::info!(
            subreddits = stats.subreddit_nodes,
            crossposts = stats.crosspost_nodes,
            edges = stats.edges,
            "Exported network"
        );
        Ok(net)
    }

    fn add_node(&mut self, node: ExportNode) -> NodeIndex {
        let key = node.key().to_string();
        let idx = self.graph.add_node(node);
        self.by_key.insert(key, idx);
        idx
    }

    /// A subreddit an event points at but that was not read back gets zeroed attributes.
    fn subreddit_or_default(&mut self, name: &str) -> NodeIndex {
        let key = subreddit_key(name);
        if let Some(&idx) = self.by_key.get(&key) {
            return idx;
        }
        tracing::warn!(subreddit = name, "crosspost references a subreddit with no stored node");
        self.add_node(ExportNode::Subreddit {
            key,
            label: format!("r/{name}"),
            source_count: 0,
            dest_count: 0,
            subscribers: 0,
            size: SUBREDDIT_BASE_SIZE,
        })
    }

    pub fn graph(&self) -> &DiGraph<ExportNode, EdgeKind> {
        &self.graph
    }

    pub fn node(&self, key: &str) -> Option<&ExportNode> {
        self.by_key.get(key).map(|&i| &self.graph[i])
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.graph.node_weights().filter(|n| n.kind() == kind).count()
    }

    pub fn stats(&self) -> ExportStats {
        ExportStats {
            subreddit_nodes: self.count_kind(NodeKind::Subreddit),
            crosspost_nodes: self.count_kind(NodeKind::Crosspost),
            edges: self.graph.edge_count(),
        }
    }

    /// `(from_key, to_key, kind)` for every edge.
    pub fn edges(&self) -> Vec<(&str, &str, EdgeKind)> {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()].key(), self.graph[e.target()].key(), *e.weight()))
            .collect()
    }

    pub fn write_graphml(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| {
            self.render_graphml(w)?;
            Ok(())
        })
        .with_context(|| format!("write GraphML {}", path.display()))?;
        tracing::info!(path = %path.display(), "Network saved for Gephi or other GraphML tools");
        Ok(())
    }

    pub fn render_graphml<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            w,
            r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#
        )?;
        for (id, domain, name, ty) in GRAPHML_KEYS {
            writeln!(w, r#"  <key id="{id}" for="{domain}" attr.name="{name}" attr.type="{ty}"/>"#)?;
        }
        writeln!(w, r#"  <graph edgedefault="directed">"#)?;
        for node in self.graph.node_weights() {
            writeln!(w, r#"    <node id="{}">"#, xml_escape(node.key()))?;
            for (name, value) in node.attributes() {
                match value {
                    Attr::Str(s) => writeln!(w, r#"      <data key="d_{name}">{}</data>"#, xml_escape(s))?,
                    Attr::Long(v) => writeln!(w, r#"      <data key="d_{name}">{v}</data>"#)?,
                }
            }
            writeln!(w, "    </node>")?;
        }
        for (from, to, kind) in self.edges() {
            writeln!(w, r#"    <edge source="{}" target="{}">"#, xml_escape(from), xml_escape(to))?;
            writeln!(w, r#"      <data key="e_type">{}</data>"#, kind.as_str())?;
            writeln!(w, "    </edge>")?;
        }
        writeln!(w, "  </graph>")?;
        writeln!(w, "</graphml>")?;
        Ok(())
    }

    /// networkx-compatible node-link document.
    pub fn to_node_link_json(&self) -> Value {
        let nodes: Vec<Value> = self
            .graph
            .node_weights()
            .map(|n| {
                let mut obj = serde_json::Map::new();
                obj.insert("id".to_string(), json!(n.key()));
                for (name, value) in n.attributes() {
                    let v = match value {
                        Attr::Str(s) => json!(s),
                        Attr::Long(v) => json!(v),
                    };
                    obj.insert(name.to_string(), v);
                }
                Value::Object(obj)
            })
            .collect();
        let links: Vec<Value> = self
            .edges()
            .into_iter()
            .map(|(from, to, kind)| json!({"source": from, "target": to, "type": kind.as_str()}))
            .collect();
        json!({"directed": true, "multigraph": false, "graph": {}, "nodes": nodes, "links": links})
    }

    pub fn write_node_link_json(&self, path: &Path) -> Result<()> {
        let doc = self.to_node_link_json();
        write_atomic(path, |w| {
            serde_json::to_writer(&mut *w, &doc)?;
            Ok(())
        })
        .with_context(|| format!("write node-link JSON {}", path.display()))
    }
}

fn subreddit_key(name: &str) -> String {
    format!("sub_{name}")
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 forbids most control characters even when escaped
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}
