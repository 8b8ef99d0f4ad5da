mod config;
mod error;
mod util;
mod progress;

mod post;
mod link;
mod resolve;
mod graph;
mod store;

mod export;
mod summary;
mod analyze;
mod pipeline;

pub use crate::config::{NetworkOptions, RunMode, StoreConfig};
pub use crate::error::{ConfigError, RecordError};
pub use crate::pipeline::{CrosspostNetwork, RunOutcome};

pub use crate::post::{load_posts, parse_parent_token, PostSnapshot};
pub use crate::link::{aggregate_edges, AggregatedEdge, CrosspostLink, ParentOrigin, EVENT_ID_SEP};
pub use crate::resolve::{resolve_crossposts, resolve_crossposts_with_rng, synthesize_demo_links, Resolution, ResolveOptions};

// graph plan + builder, and the store seam it writes through
pub use crate::graph::{
    distinct_events, BuildStats, CrosspostNode, CrosspostOf, GraphBuilder, GraphPlan, PostNode, PostedIn, SubredditNode,
};
pub use crate::store::{
    CrosspostRow, GraphStore, MemoryStore, Neo4jStore, PathRow, SubredditCount, SubredditRow, SummaryCounts, TopPostRow,
};

// outputs
pub use crate::export::{EdgeKind, ExportNode, ExportStats, NetworkGraph, NodeKind, LABEL_MAX_CHARS};
pub use crate::summary::{NamedCount, NetworkSummary};
pub use crate::analyze::AnalysisReport;

pub use crate::util::init_tracing_once;
