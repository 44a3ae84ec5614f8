//! Edit scripts replayed against a tracked pair of documents.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use linetrack_diff::{ComparisonPolicy, SimilarComparator};
use linetrack_document::{Document, MemoryDocument};
use linetrack_tracker::{DocumentTracker, TrackerHandler};
use linetrack_types::{Block, LineRange, Side};

/// One edit: replace `remove` bytes at `offset` on `side` with `insert`.
/// Consecutive `frozen` steps run with both sides frozen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditStep {
    pub side: Side,
    pub offset: usize,
    #[serde(default)]
    pub remove: usize,
    #[serde(default)]
    pub insert: String,
    #[serde(default)]
    pub frozen: bool,
}

pub fn load_script(path: &Path) -> anyhow::Result<Vec<EditStep>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))
}

/// Counts the notifications a tracker raises.
#[derive(Debug, Default)]
pub struct CountingHandler {
    changed: AtomicUsize,
    shifted: AtomicUsize,
    refreshed: AtomicUsize,
    merged: AtomicUsize,
}

impl CountingHandler {
    pub fn total(&self) -> usize {
        [&self.changed, &self.shifted, &self.refreshed, &self.merged]
            .iter()
            .map(|counter| counter.load(Ordering::Relaxed))
            .sum()
    }
}

impl TrackerHandler for CountingHandler {
    fn on_range_refreshed(&self, _before: &Block, _after: &mut [Block]) {
        self.refreshed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_ranges_changed(&self, _before: &[Block], _after: &mut Block) {
        self.changed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_range_shifted(&self, _before: &Block, _after: &mut Block) {
        self.shifted.fetch_add(1, Ordering::Relaxed);
    }

    fn on_ranges_merged(&self, _first: &Block, _second: &Block, _merged: &mut Block) -> bool {
        self.merged.fetch_add(1, Ordering::Relaxed);
        true
    }
}

/// A block as reported by the CLI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    #[serde(flatten)]
    pub range: LineRange,
    pub too_big: bool,
}

impl From<&Block> for BlockReport {
    fn from(block: &Block) -> Self {
        Self {
            range: block.range(),
            too_big: block.is_too_big(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub blocks: Vec<BlockReport>,
    pub left: String,
    pub right: String,
    pub notifications: usize,
}

/// Track `left` against `right` under `policy`, returning the documents and tracker.
pub fn track(
    left: &str,
    right: &str,
    policy: ComparisonPolicy,
    handler: Arc<dyn TrackerHandler>,
) -> (Arc<MemoryDocument>, Arc<MemoryDocument>, Arc<DocumentTracker>) {
    let d1 = Arc::new(MemoryDocument::new(left));
    let d2 = Arc::new(MemoryDocument::new(right));
    let tracker = DocumentTracker::with_comparator(
        d1.clone(),
        d2.clone(),
        handler,
        Arc::new(SimilarComparator::new(policy)),
    );
    (d1, d2, tracker)
}

/// Apply `steps` in order and return the refreshed result.
pub fn replay(
    left: &str,
    right: &str,
    steps: &[EditStep],
    policy: ComparisonPolicy,
) -> anyhow::Result<ReplayOutcome> {
    let handler = Arc::new(CountingHandler::default());
    let (d1, d2, tracker) = track(left, right, policy, handler.clone());
    let document = |side: Side| side.select(&d1, &d2);

    let mut index = 0;
    while index < steps.len() {
        let frozen = steps[index].frozen;
        let run = steps[index..]
            .iter()
            .take_while(|step| step.frozen == frozen)
            .count();
        let group = &steps[index..index + run];
        let apply = || -> anyhow::Result<()> {
            for (offset, step) in group.iter().enumerate() {
                apply_step(document(step.side), step)
                    .with_context(|| format!("step {}", index + offset + 1))?;
            }
            Ok(())
        };
        if frozen {
            debug!(steps = run, "replaying frozen group");
            tracker.do_frozen_both(apply)?;
        } else {
            apply()?;
        }
        index += run;
    }

    tracker.refresh_dirty(false, false);
    let outcome = ReplayOutcome {
        blocks: tracker.blocks().iter().map(BlockReport::from).collect(),
        left: d1.text().to_string(),
        right: d2.text().to_string(),
        notifications: handler.total(),
    };
    tracker.dispose();
    Ok(outcome)
}

fn apply_step(document: &MemoryDocument, step: &EditStep) -> anyhow::Result<()> {
    let Some(end) = step.offset.checked_add(step.remove) else {
        bail!("range overflows at offset {}", step.offset);
    };
    document.replace(step.offset..end, &step.insert)?;
    Ok(())
}
