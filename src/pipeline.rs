use crate::analyze::AnalysisReport;
use crate::config::{NetworkOptions, RunMode};
use crate::export::{ExportStats, NetworkGraph};
use crate::graph::{BuildStats, GraphBuilder};
use crate::post::load_posts;
use crate::resolve::{resolve_crossposts, Resolution, ResolveOptions};
use crate::store::GraphStore;
use crate::summary::NetworkSummary;
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// End-to-end crosspost network run: resolve -> write store -> analyze -> export.
#[derive(Clone, Debug)]
pub struct CrosspostNetwork {
    pub(crate) opts: NetworkOptions,
}

/// What a run produced.
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub resolution: Option<Resolution>,
    pub build: Option<BuildStats>,
    pub report: AnalysisReport,
    pub export: Option<ExportStats>,
    pub written: Vec<PathBuf>,
}

impl Default for CrosspostNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosspostNetwork {
    pub fn new() -> Self {
        Self { opts: NetworkOptions::default() }
    }

    // -------- Builder methods --------
    pub fn input(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input(path); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn mode(mut self, mode: RunMode) -> Self { self.opts = self.opts.with_mode(mode); self }
    pub fn demo_mode(mut self, yes: bool) -> Self { self.opts = self.opts.with_demo_mode(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn top_n(mut self, n: usize) -> Self { self.opts = self.opts.with_top_n(n); self }

    pub fn options(&self) -> &NetworkOptions {
        &self.opts
    }

    /// Load the dump and resolve crossposts. Touches no store.
    pub fn resolve(&self) -> Result<Resolution> {
        let posts = load_posts(&self.opts.input)?;
        tracing::info!(posts = posts.len(), input = %self.opts.input.display(), "Loaded posts");
        let ropts = ResolveOptions { demo_mode: self.opts.demo_mode, progress: self.opts.progress };
        Ok(resolve_crossposts(&posts, &ropts))
    }

    /// Run the configured stages against `store`. The store must already be connected.
    pub fn run(&self, store: &mut dyn GraphStore) -> Result<RunOutcome> {
        init_tracing_once();
        let started = Instant::now();
        let mut outcome = RunOutcome::default();

        fs::create_dir_all(&self.opts.output_dir)
            .with_context(|| format!("create output dir {}", self.opts.output_dir.display()))?;

        if self.opts.mode == RunMode::Full {
            let resolution = self.resolve()?;
            let build = GraphBuilder::new()
                .progress(self.opts.progress)
                .build(store, &resolution.links)?;

            let summary_path = self.opts.summary_path();
            NetworkSummary::from_links(&resolution.links, self.opts.top_n).write(&summary_path)?;
            outcome.written.push(summary_path);

            outcome.build = Some(build);
            outcome.resolution = Some(resolution);
        } else {
            tracing::info!(backend = store.backend(), "Using existing graph store contents");
        }

        outcome.report = AnalysisReport::collect(store)?;
        println!("\n{}", outcome.report.render());

        if self.opts.mode != RunMode::AnalysisOnly {
            let net = NetworkGraph::from_store(store)?;

            let graphml = self.opts.graphml_path();
            net.write_graphml(&graphml)?;
            outcome.written.push(graphml);

            let node_link = self.opts.node_link_path();
            net.write_node_link_json(&node_link)?;
            outcome.written.push(node_link);

            outcome.export = Some(net.stats());
        }

        tracing::info!(elapsed_secs = started.elapsed().as_secs_f64(), "Run complete");
        Ok(outcome)
    }
}
