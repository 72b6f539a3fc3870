//! Background jobs: cross-side via matching and auto-trace pathfinding
//!
//! Jobs run on spawned threads with owned copies of their inputs and never
//! see the store. Results come back over an mpsc channel tagged with the
//! store generation they were computed against; `JobQueue::drain` applies
//! only those whose generation is still current.

use crate::config::EngineConfig;
use crate::edit::confirm_via_pair;
use crate::endpoint::Endpoint;
use crate::features::{format_trace_id, FeatureStore, Trace, TraceSource, Via};
use crate::geometry::{simplify, Point, Side};
use crate::netlist::{ConsolidationOutcome, NetConsolidator};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A front via paired with a back via
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViaPair {
    pub front_id: String,
    pub back_id: String,
    pub error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub pairs: Vec<ViaPair>,
    pub matched_count: usize,
    pub avg_error: f64,
}

pub trait SideMatcher: Send + Sync {
    fn match_across_sides(&self, front: &[Via], back: &[Via], tolerance_px: f64) -> MatchResult;
}

/// Finds a copper path between two points on one layer. `Ok(None)` means no
/// path exists within the search radius.
pub trait CopperPathfinder: Send + Sync {
    fn find_path(
        &self,
        layer: Side,
        start: Point,
        end: Point,
        search_radius: f64,
    ) -> anyhow::Result<Option<Vec<Point>>>;
}

/// Pairs each front via with the nearest unclaimed back via within tolerance.
///
/// Candidates are gathered in parallel against an R-tree of back vias, then
/// accepted greedily in order of increasing distance so the pairing is
/// one-to-one and deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestNeighborMatcher;

impl SideMatcher for NearestNeighborMatcher {
    fn match_across_sides(&self, front: &[Via], back: &[Via], tolerance_px: f64) -> MatchResult {
        let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
            back.iter()
                .enumerate()
                .map(|(i, v)| GeomWithData::new(v.center.to_array(), i))
                .collect(),
        );
        let tolerance_2 = tolerance_px * tolerance_px;

        let mut candidates: Vec<(f64, usize, usize)> = front
            .par_iter()
            .enumerate()
            .flat_map_iter(|(fi, f)| {
                tree.locate_within_distance(f.center.to_array(), tolerance_2)
                    .map(|entry| (f.center.distance(back[entry.data].center), fi, entry.data))
                    .filter(|(d, _, _)| *d <= tolerance_px)
                    .collect::<Vec<_>>()
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| front[a.1].id.cmp(&front[b.1].id))
                .then_with(|| back[a.2].id.cmp(&back[b.2].id))
        });

        let mut front_taken = vec![false; front.len()];
        let mut back_taken = vec![false; back.len()];
        let mut pairs = Vec::new();
        for (d, fi, bi) in candidates {
            if front_taken[fi] || back_taken[bi] {
                continue;
            }
            front_taken[fi] = true;
            back_taken[bi] = true;
            pairs.push(ViaPair {
                front_id: front[fi].id.clone(),
                back_id: back[bi].id.clone(),
                error: d,
            });
        }

        let matched_count = pairs.len();
        let avg_error = if matched_count == 0 {
            0.0
        } else {
            pairs.iter().map(|p| p.error).sum::<f64>() / matched_count as f64
        };
        MatchResult { pairs, matched_count, avg_error }
    }
}

/// Straight segment between the two endpoints, for manual stitching when no
/// copper image is available
#[derive(Debug, Default, Clone, Copy)]
pub struct StraightLinePathfinder;

impl CopperPathfinder for StraightLinePathfinder {
    fn find_path(
        &self,
        _layer: Side,
        start: Point,
        end: Point,
        _search_radius: f64,
    ) -> anyhow::Result<Option<Vec<Point>>> {
        if start == end {
            return Ok(None);
        }
        Ok(Some(vec![start, end]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTraceRequest {
    pub layer: Side,
    pub start: Endpoint,
    pub end: Endpoint,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug)]
pub enum JobOutcome {
    SideMatch(MatchResult),
    AutoTrace { request: AutoTraceRequest, points: Vec<Point> },
    Failed { job: &'static str, message: String },
}

#[derive(Debug)]
struct FinishedJob {
    generation: u64,
    elapsed_ms: f64,
    outcome: JobOutcome,
}

/// What draining a finished job did to the store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "job")]
pub enum AppliedJob {
    SideMatch {
        confirmed_via_ids: Vec<String>,
        matched_count: usize,
        avg_error: f64,
    },
    AutoTrace {
        trace_id: String,
        net: ConsolidationOutcome,
    },
    Failed {
        name: String,
        message: String,
    },
}

pub struct JobQueue {
    tx: Sender<FinishedJob>,
    rx: Receiver<FinishedJob>,
    pending: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, pending: 0 }
    }

    /// Jobs spawned but not yet drained
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn spawn_side_match(
        &mut self,
        generation: u64,
        matcher: Arc<dyn SideMatcher>,
        front: Vec<Via>,
        back: Vec<Via>,
        tolerance_px: f64,
    ) {
        tracing::info!(
            "[Worker] Side match started: {} front, {} back, tolerance {:.1}px",
            front.len(),
            back.len(),
            tolerance_px
        );
        let tx = self.tx.clone();
        self.pending += 1;
        thread::spawn(move || {
            let start = Instant::now();
            let result = matcher.match_across_sides(&front, &back, tolerance_px);
            let _ = tx.send(FinishedJob {
                generation,
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                outcome: JobOutcome::SideMatch(result),
            });
        });
    }

    pub fn spawn_auto_trace(
        &mut self,
        generation: u64,
        pathfinder: Arc<dyn CopperPathfinder>,
        request: AutoTraceRequest,
        search_radius: f64,
        simplify_epsilon: f64,
    ) {
        tracing::info!(
            "[Worker] Auto-trace started on {}: {:?} -> {:?}",
            request.layer,
            request.start,
            request.end
        );
        let tx = self.tx.clone();
        self.pending += 1;
        thread::spawn(move || {
            let start = Instant::now();
            let outcome =
                match pathfinder.find_path(request.layer, request.from, request.to, search_radius) {
                    Ok(Some(path)) if path.len() >= 2 => {
                        let points = simplify(&path, simplify_epsilon);
                        JobOutcome::AutoTrace { request, points }
                    }
                    Ok(_) => JobOutcome::Failed {
                        job: "autoTrace",
                        message: "no copper path found".to_string(),
                    },
                    Err(e) => JobOutcome::Failed {
                        job: "autoTrace",
                        message: format!("{:#}", e),
                    },
                };
            let _ = tx.send(FinishedJob {
                generation,
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                outcome,
            });
        });
    }

    /// Applies every finished job without blocking
    pub fn drain(&mut self, store: &mut FeatureStore, config: &EngineConfig) -> Vec<AppliedJob> {
        let mut applied = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(job) => applied.extend(self.apply(store, config, job)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Waits up to `timeout` for the first finished job, then drains the rest
    pub fn drain_blocking(
        &mut self,
        store: &mut FeatureStore,
        config: &EngineConfig,
        timeout: Duration,
    ) -> Vec<AppliedJob> {
        let mut applied = Vec::new();
        match self.rx.recv_timeout(timeout) {
            Ok(job) => applied.extend(self.apply(store, config, job)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return applied,
        }
        applied.extend(self.drain(store, config));
        applied
    }

    fn apply(
        &mut self,
        store: &mut FeatureStore,
        config: &EngineConfig,
        job: FinishedJob,
    ) -> Option<AppliedJob> {
        self.pending = self.pending.saturating_sub(1);
        if job.generation != store.generation() {
            tracing::debug!(
                "[Worker] Discarding stale result (generation {} != {})",
                job.generation,
                store.generation()
            );
            return None;
        }

        match job.outcome {
            JobOutcome::SideMatch(result) => {
                let mut confirmed_via_ids = Vec::new();
                for pair in &result.pairs {
                    let still_free = [&pair.front_id, &pair.back_id]
                        .iter()
                        .all(|id| store.via(id).is_some_and(|v| v.matched_via_id.is_none()));
                    if !still_free {
                        continue;
                    }
                    match confirm_via_pair(store, &pair.front_id, &pair.back_id) {
                        Ok(id) => confirmed_via_ids.push(id),
                        Err(e) => tracing::warn!("[Worker] Could not confirm {}/{}: {}", pair.front_id, pair.back_id, e),
                    }
                }
                tracing::info!(
                    "[Worker] Side match applied: {} confirmed vias (avg error {:.2}px) in {:.2}ms",
                    confirmed_via_ids.len(),
                    result.avg_error,
                    job.elapsed_ms
                );
                Some(AppliedJob::SideMatch {
                    confirmed_via_ids,
                    matched_count: result.matched_count,
                    avg_error: result.avg_error,
                })
            }
            JobOutcome::AutoTrace { request, points } => {
                // Ordinary edits keep the generation, so the endpoints may be gone
                for endpoint in [&request.start, &request.end] {
                    if let Err(e) = endpoint.validate(store) {
                        tracing::warn!("[Worker] Dropping auto-trace: {}", e);
                        return Some(AppliedJob::Failed {
                            name: "autoTrace".to_string(),
                            message: e.to_string(),
                        });
                    }
                }

                let number = store.next_trace_number();
                let trace_id = format_trace_id(number);
                if let Err(e) = store.add_trace(Trace {
                    id: trace_id.clone(),
                    number,
                    layer: request.layer,
                    points,
                    source: TraceSource::Detected,
                }) {
                    tracing::warn!("[Worker] Auto-trace could not be added: {}", e);
                    return Some(AppliedJob::Failed {
                        name: "autoTrace".to_string(),
                        message: e.to_string(),
                    });
                }
                let junctions: Vec<String> = [&request.start, &request.end]
                    .iter()
                    .filter_map(|e| e.junction_trace_id().map(String::from))
                    .collect();
                let consolidated = NetConsolidator::new(store, config.junction_tolerance_px).consolidate(
                    &request.start,
                    &request.end,
                    &trace_id,
                    &junctions,
                );
                match consolidated {
                    Ok(net) => {
                        tracing::info!("[Worker] Auto-trace {} applied in {:.2}ms", trace_id, job.elapsed_ms);
                        Some(AppliedJob::AutoTrace { trace_id, net })
                    }
                    Err(e) => {
                        store.remove_trace(&trace_id);
                        Some(AppliedJob::Failed {
                            name: "autoTrace".to_string(),
                            message: e.to_string(),
                        })
                    }
                }
            }
            JobOutcome::Failed { job: name, message } => {
                tracing::warn!("[Worker] {} failed: {}", name, message);
                Some(AppliedJob::Failed {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::DetectionMethod;

    fn via(id: &str, side: Side, x: f64, y: f64) -> Via {
        Via {
            id: id.to_string(),
            number: 0,
            center: Point::new(x, y),
            radius: 10.0,
            side,
            pad_boundary: vec![],
            confidence: 0.9,
            method: DetectionMethod::Template,
            matched_via_id: None,
        }
    }

    #[test]
    fn test_nearest_neighbor_is_one_to_one() {
        let front = vec![
            via("via-001", Side::Front, 0.0, 0.0),
            via("via-002", Side::Front, 4.0, 0.0),
        ];
        let back = vec![
            via("via-003", Side::Back, 3.0, 0.0),
            via("via-004", Side::Back, 100.0, 0.0),
        ];
        let result = NearestNeighborMatcher.match_across_sides(&front, &back, 8.0);
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.pairs[0].front_id, "via-002");
        assert_eq!(result.pairs[0].back_id, "via-003");
        assert!((result.avg_error - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_outside_tolerance() {
        let front = vec![via("via-001", Side::Front, 0.0, 0.0)];
        let back = vec![via("via-002", Side::Back, 20.0, 0.0)];
        let result = NearestNeighborMatcher.match_across_sides(&front, &back, 8.0);
        assert_eq!(result, MatchResult::default());
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut store = FeatureStore::new();
        let config = EngineConfig::default();
        store.add_via(via("via-001", Side::Front, 0.0, 0.0)).unwrap();
        store.add_via(via("via-002", Side::Back, 1.0, 0.0)).unwrap();
        let front = store.vias_by_side(Side::Front).into_iter().cloned().collect();
        let back = store.vias_by_side(Side::Back).into_iter().cloned().collect();

        let mut queue = JobQueue::new();
        queue.spawn_side_match(store.generation(), Arc::new(NearestNeighborMatcher), front, back, 8.0);
        store.clear();

        let applied = queue.drain_blocking(&mut store, &config, Duration::from_secs(5));
        assert!(applied.is_empty());
        assert_eq!(queue.pending(), 0);
        assert_eq!(store.confirmed_via_count(), 0);
    }

    #[test]
    fn test_side_match_applies_pairs() {
        let mut store = FeatureStore::new();
        let config = EngineConfig::default();
        store.add_via(via("via-001", Side::Front, 0.0, 0.0)).unwrap();
        store.add_via(via("via-002", Side::Back, 2.0, 0.0)).unwrap();
        let front = store.vias_by_side(Side::Front).into_iter().cloned().collect();
        let back = store.vias_by_side(Side::Back).into_iter().cloned().collect();

        let mut queue = JobQueue::new();
        queue.spawn_side_match(store.generation(), Arc::new(NearestNeighborMatcher), front, back, 8.0);
        let applied = queue.drain_blocking(&mut store, &config, Duration::from_secs(5));

        assert_eq!(
            applied,
            vec![AppliedJob::SideMatch {
                confirmed_via_ids: vec!["cvia-001".to_string()],
                matched_count: 1,
                avg_error: 2.0,
            }]
        );
        assert_eq!(store.via("via-001").unwrap().matched_via_id.as_deref(), Some("via-002"));
    }

    struct NoPath;

    impl CopperPathfinder for NoPath {
        fn find_path(&self, _: Side, _: Point, _: Point, _: f64) -> anyhow::Result<Option<Vec<Point>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_failed_auto_trace_leaves_store_untouched() {
        let mut store = FeatureStore::new();
        let config = EngineConfig::default();
        let mut queue = JobQueue::new();
        queue.spawn_auto_trace(
            store.generation(),
            Arc::new(NoPath),
            AutoTraceRequest {
                layer: Side::Front,
                start: Endpoint::None,
                end: Endpoint::None,
                from: Point::new(0.0, 0.0),
                to: Point::new(50.0, 0.0),
            },
            config.path_search_radius(),
            config.simplify_epsilon_px,
        );
        let applied = queue.drain_blocking(&mut store, &config, Duration::from_secs(5));
        assert!(matches!(applied.as_slice(), [AppliedJob::Failed { .. }]));
        assert_eq!(store.trace_count(), 0);
    }

    #[test]
    fn test_auto_trace_with_deleted_endpoint_is_dropped() {
        let mut store = FeatureStore::new();
        let config = EngineConfig::default();
        let a = crate::edit::place_manual_via(&mut store, Point::new(0.0, 0.0), 8.0).unwrap();
        let b = crate::edit::place_manual_via(&mut store, Point::new(200.0, 0.0), 8.0).unwrap();

        let mut queue = JobQueue::new();
        queue.spawn_auto_trace(
            store.generation(),
            Arc::new(StraightLinePathfinder),
            AutoTraceRequest {
                layer: Side::Front,
                start: Endpoint::via(&a),
                end: Endpoint::via(&b),
                from: Point::new(0.0, 0.0),
                to: Point::new(200.0, 0.0),
            },
            config.path_search_radius(),
            config.simplify_epsilon_px,
        );
        crate::edit::delete_confirmed_via(&mut store, &b).unwrap();

        let applied = queue.drain_blocking(&mut store, &config, Duration::from_secs(5));
        assert_eq!(
            applied,
            vec![AppliedJob::Failed {
                name: "autoTrace".to_string(),
                message: format!("confirmed via not found: {}", b),
            }]
        );
        assert_eq!(store.trace_count(), 0);
        assert_eq!(store.net_count(), 0);
    }

    #[test]
    fn test_failed_job_serializes_with_tag() {
        let job = AppliedJob::Failed {
            name: "autoTrace".to_string(),
            message: "no copper path found".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            serde_json::json!({
                "job": "Failed",
                "name": "autoTrace",
                "message": "no copper path found",
            })
        );
    }
}
