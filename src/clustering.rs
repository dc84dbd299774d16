use crate::hit::TrackerHit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration of the tracker pre-clustering algorithm.
///
/// Lengths are in millimeters and times in microseconds. The host pipeline
/// usually populates this from its property files; [`ClusteringSetup::from_json_str`]
/// covers the standalone case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSetup {
    /// Drift cell diameter, used as the spatial scale of the chamber.
    pub cell_size: f64,
    /// Width of the delayed-hit time coincidence window.
    pub delayed_hit_cluster_time: f64,
    /// Enable clustering of prompt hits.
    pub processing_prompt_hits: bool,
    /// Enable clustering of delayed hits.
    pub processing_delayed_hits: bool,
    /// Cluster the two half-chambers independently instead of together.
    pub split_chamber: bool,
}

impl Default for ClusteringSetup {
    fn default() -> Self {
        ClusteringSetup {
            cell_size: 44.0,
            delayed_hit_cluster_time: 10.0,
            processing_prompt_hits: true,
            processing_delayed_hits: true,
            split_chamber: false,
        }
    }
}

impl ClusteringSetup {
    /// Validate the setup, returning a descriptive message on failure.
    pub fn check(&self) -> Result<(), String> {
        if self.cell_size.is_nan() {
            return Err("Undefined cell size".to_string());
        }
        if self.cell_size <= 0.0 {
            return Err(format!(
                "Cell size must be positive, got {}",
                self.cell_size
            ));
        }
        if self.processing_delayed_hits
            && !(self.delayed_hit_cluster_time.is_finite() && self.delayed_hit_cluster_time > 0.0)
        {
            return Err(format!(
                "Delayed hit cluster time must be a positive number, got {}",
                self.delayed_hit_cluster_time
            ));
        }
        Ok(())
    }

    /// Load and validate a setup from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let setup: ClusteringSetup = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse clustering setup: {}", e))?;
        setup.check()?;
        Ok(setup)
    }
}

/// Result of pre-clustering one event: every input hit ends up in exactly
/// one of the three collections.
#[derive(Debug, Default)]
pub struct ClusterOutput<'a> {
    /// Hits excluded from clustering (sterile, noisy, lone, out of range
    /// or belonging to a disabled category).
    pub ignored_hits: Vec<&'a TrackerHit>,
    /// At most one prompt cluster per half-chamber.
    pub prompt_clusters: Vec<Vec<&'a TrackerHit>>,
    /// Delayed time-coincidence clusters, unbounded in number.
    pub delayed_clusters: Vec<Vec<&'a TrackerHit>>,
}

impl<'a> ClusterOutput<'a> {
    /// Print a tree view of the clustering result.
    pub fn dump<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "ClusterOutput:")?;
        writeln!(out, "|-- Ignored hits : {}", self.ignored_hits.len())?;
        writeln!(out, "|-- Prompt clusters: {}", self.prompt_clusters.len())?;
        for (i, cluster) in self.prompt_clusters.iter().enumerate() {
            let prefix = if i + 1 < self.prompt_clusters.len() {
                "|   |--"
            } else {
                "|   `--"
            };
            writeln!(out, "{} Prompt cluster #{}  size : {}", prefix, i, cluster.len())?;
        }
        writeln!(out, "`-- Delayed clusters: {}", self.delayed_clusters.len())?;
        for (i, cluster) in self.delayed_clusters.iter().enumerate() {
            let prefix = if i + 1 < self.delayed_clusters.len() {
                "    |--"
            } else {
                "    `--"
            };
            writeln!(out, "{} Delayed cluster #{}  size : {}", prefix, i, cluster.len())?;
        }
        Ok(())
    }
}

/// Pre-clusterizer of tracker hits.
///
/// Groups the hits of one event into prompt and delayed clusters using
/// simple criteria:
/// - prompt hits are grouped into a single cluster per side of the source
///   foil (two clusters maximum, one when the chamber is not split);
/// - delayed hits on a side are grouped when they fall in a time
///   coincidence window of width `delayed_hit_cluster_time` opened at the
///   earliest hit of the cluster being built. The window reference does not
///   advance while the cluster stays open; it only moves when a gap forces
///   a new window to start.
#[derive(Debug, Clone)]
pub struct PreClusterizer {
    pub setup: ClusteringSetup,
}

impl PreClusterizer {
    /// Create a pre-clusterizer from a validated setup.
    pub fn new(setup: ClusteringSetup) -> Result<Self, String> {
        setup.check()?;
        Ok(PreClusterizer { setup })
    }

    /// Check the input contract on a batch of hits. The whole batch is
    /// rejected on the first violation; no partial processing happens.
    fn check_input(&self, hits: &[TrackerHit]) -> Result<(), String> {
        let mut seen_ids = HashSet::new();
        for hit in hits {
            if !seen_ids.insert(hit.hit_id) {
                return Err(format!("Hit {} referenced twice in input", hit.hit_id));
            }
            if !hit.has_cell() {
                return Err(format!("Hit {} has no cell address", hit.hit_id));
            }
            if !hit.has_xy() {
                return Err(format!("Hit {} has no xy position", hit.hit_id));
            }
            if hit.is_delayed() && !hit.has_delayed_time() {
                return Err(format!("Delayed hit {} has no delayed time", hit.hit_id));
            }
        }
        Ok(())
    }

    /// Process one event's hits into prompt and delayed clusters.
    ///
    /// Every input hit ends up in exactly one of the output collections:
    /// ignored, one prompt cluster, or one delayed cluster.
    pub fn process<'a>(&self, hits: &'a [TrackerHit]) -> Result<ClusterOutput<'a>, String> {
        self.check_input(hits)?;

        let mut output = ClusterOutput::default();

        // Per-call hit buckets, one per half-chamber.
        let mut prompt_hits: [Vec<&TrackerHit>; 2] = [Vec::new(), Vec::new()];
        let mut delayed_hits: [Vec<&TrackerHit>; 2] = [Vec::new(), Vec::new()];

        for hit in hits {
            if hit.is_sterile() || hit.is_noisy() {
                output.ignored_hits.push(hit);
                continue;
            }
            let side = hit
                .side()
                .ok_or_else(|| format!("Hit {} has no cell address", hit.hit_id))?;

            let processing = if hit.is_prompt() {
                self.setup.processing_prompt_hits
            } else {
                self.setup.processing_delayed_hits
            };
            // A side outside {0, 1} is ignored whatever the splitting flag says.
            if !processing || side > 1 {
                output.ignored_hits.push(hit);
                continue;
            }
            let effective_side = if self.setup.split_chamber {
                side as usize
            } else {
                0
            };
            if hit.is_prompt() {
                prompt_hits[effective_side].push(hit);
            } else {
                delayed_hits[effective_side].push(hit);
            }
        }

        let max_side = if self.setup.split_chamber { 2 } else { 1 };

        if self.setup.processing_prompt_hits {
            // One unique candidate cluster of prompt hits per side; a lone
            // prompt hit cannot form a cluster and is ignored.
            for side_hits in prompt_hits.iter().take(max_side) {
                if side_hits.len() == 1 {
                    output.ignored_hits.push(side_hits[0]);
                    continue;
                }
                if side_hits.is_empty() {
                    continue;
                }
                output.prompt_clusters.push(side_hits.clone());
            }
        }

        if self.setup.processing_delayed_hits {
            let window = self.setup.delayed_hit_cluster_time;
            for side_hits in delayed_hits.iter_mut().take(max_side) {
                side_hits.sort_by(|a, b| delayed_time_of(a).total_cmp(&delayed_time_of(b)));
                if side_hits.len() < 2 {
                    if side_hits.len() == 1 {
                        output.ignored_hits.push(side_hits[0]);
                    }
                    continue;
                }
                // The earliest delayed hit on this side opens the first
                // candidate window.
                let mut reference = side_hits[0];
                let mut open: Option<usize> = None;
                for &hit in &side_hits[1..] {
                    if delayed_time_of(hit) > delayed_time_of(reference) + window {
                        // Gap too large: close the window. A reference that
                        // never gathered a partner is dropped to ignored.
                        if open.is_none() {
                            output.ignored_hits.push(reference);
                        }
                        reference = hit;
                        open = None;
                        continue;
                    }
                    let cluster_index = match open {
                        Some(index) => index,
                        None => {
                            output.delayed_clusters.push(vec![reference]);
                            open = Some(output.delayed_clusters.len() - 1);
                            output.delayed_clusters.len() - 1
                        }
                    };
                    output.delayed_clusters[cluster_index].push(hit);
                }
                // Trailing reference left without a partner.
                if open.is_none() {
                    output.ignored_hits.push(reference);
                }
            }
        }

        Ok(output)
    }
}

fn delayed_time_of(hit: &TrackerHit) -> f64 {
    hit.delayed_time.unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::CellAddress;

    fn prompt_hit(id: u32, side: u32) -> TrackerHit {
        TrackerHit::prompt(id, CellAddress::new(0, side, 4, 50), 100.0, 0.0)
    }

    fn delayed_hit(id: u32, side: u32, time: f64) -> TrackerHit {
        TrackerHit::delayed(id, CellAddress::new(0, side, 4, 50), 100.0, 0.0, time)
    }

    fn split_setup() -> ClusteringSetup {
        ClusteringSetup {
            split_chamber: true,
            ..ClusteringSetup::default()
        }
    }

    #[test]
    fn test_setup_check_rejects_nan_cell_size() {
        let setup = ClusteringSetup {
            cell_size: f64::NAN,
            ..ClusteringSetup::default()
        };
        let result = setup.check();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Undefined cell size"));
    }

    #[test]
    fn test_setup_check_rejects_negative_cell_size() {
        let setup = ClusteringSetup {
            cell_size: -1.0,
            ..ClusteringSetup::default()
        };
        assert!(setup.check().is_err());
    }

    #[test]
    fn test_setup_check_rejects_bad_window_when_delayed_enabled() {
        let setup = ClusteringSetup {
            delayed_hit_cluster_time: f64::NAN,
            ..ClusteringSetup::default()
        };
        assert!(setup.check().is_err());

        // With delayed processing off the window is not used.
        let setup = ClusteringSetup {
            delayed_hit_cluster_time: f64::NAN,
            processing_delayed_hits: false,
            ..ClusteringSetup::default()
        };
        assert!(setup.check().is_ok());
    }

    #[test]
    fn test_setup_from_json() {
        let setup =
            ClusteringSetup::from_json_str(r#"{"delayed_hit_cluster_time": 20.0, "split_chamber": true}"#)
                .unwrap();
        assert_eq!(setup.delayed_hit_cluster_time, 20.0);
        assert!(setup.split_chamber);
        // Unspecified fields take defaults.
        assert_eq!(setup.cell_size, 44.0);

        assert!(ClusteringSetup::from_json_str(r#"{"cell_size": -3.0}"#).is_err());
        assert!(ClusteringSetup::from_json_str("not json").is_err());
    }

    #[test]
    fn test_input_check_rejects_duplicate_hit() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![prompt_hit(1, 0), prompt_hit(1, 0)];
        let result = clusterizer.process(&hits);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("referenced twice"));
    }

    #[test]
    fn test_input_check_rejects_missing_cell_and_xy() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();

        let mut no_cell = prompt_hit(1, 0);
        no_cell.cell = None;
        assert!(clusterizer.process(&[no_cell]).is_err());

        let mut no_xy = prompt_hit(2, 0);
        no_xy.position_xy = None;
        assert!(clusterizer.process(&[no_xy]).is_err());
    }

    #[test]
    fn test_input_check_rejects_delayed_without_time() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let mut hit = delayed_hit(1, 0, 5.0);
        hit.delayed_time = None;
        let hits = [hit];
        let result = clusterizer.process(&hits);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("delayed time"));
    }

    #[test]
    fn test_prompt_cluster_one_per_side() {
        // Three prompt hits on side 0, splitting enabled: one cluster.
        let clusterizer = PreClusterizer::new(split_setup()).unwrap();
        let hits = vec![prompt_hit(0, 0), prompt_hit(1, 0), prompt_hit(2, 0)];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.prompt_clusters.len(), 1);
        assert_eq!(output.prompt_clusters[0].len(), 3);
        assert!(output.ignored_hits.is_empty());
        assert!(output.delayed_clusters.is_empty());
    }

    #[test]
    fn test_prompt_singleton_is_ignored() {
        let clusterizer = PreClusterizer::new(split_setup()).unwrap();
        let hits = vec![prompt_hit(0, 0), prompt_hit(1, 1), prompt_hit(2, 1)];
        let output = clusterizer.process(&hits).unwrap();
        // Side 0 has a lone prompt hit: no cluster, hit ignored.
        assert_eq!(output.prompt_clusters.len(), 1);
        assert_eq!(output.prompt_clusters[0].len(), 2);
        assert_eq!(output.ignored_hits.len(), 1);
        assert_eq!(output.ignored_hits[0].hit_id, 0);
    }

    #[test]
    fn test_unsplit_chamber_merges_sides() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![prompt_hit(0, 0), prompt_hit(1, 1)];
        let output = clusterizer.process(&hits).unwrap();
        // Without splitting the two sides collapse into one cluster.
        assert_eq!(output.prompt_clusters.len(), 1);
        assert_eq!(output.prompt_clusters[0].len(), 2);
        assert!(output.ignored_hits.is_empty());
    }

    #[test]
    fn test_out_of_range_side_is_ignored() {
        // The side check does not depend on the splitting flag.
        for split in [false, true] {
            let clusterizer = PreClusterizer::new(ClusteringSetup {
                split_chamber: split,
                ..ClusteringSetup::default()
            })
            .unwrap();
            let hits = vec![prompt_hit(0, 2), delayed_hit(1, 7, 3.0)];
            let output = clusterizer.process(&hits).unwrap();
            assert_eq!(output.ignored_hits.len(), 2);
            assert!(output.prompt_clusters.is_empty());
            assert!(output.delayed_clusters.is_empty());
        }
    }

    #[test]
    fn test_sterile_and_noisy_hits_are_ignored() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let mut sterile = prompt_hit(0, 0);
        sterile.sterile = true;
        let mut noisy = prompt_hit(1, 0);
        noisy.noisy = true;
        let hits = [sterile, noisy];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.ignored_hits.len(), 2);
        assert!(output.prompt_clusters.is_empty());
    }

    #[test]
    fn test_disabled_categories_route_to_ignored() {
        let clusterizer = PreClusterizer::new(ClusteringSetup {
            processing_prompt_hits: false,
            ..ClusteringSetup::default()
        })
        .unwrap();
        let hits = vec![prompt_hit(0, 0), prompt_hit(1, 0)];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.ignored_hits.len(), 2);
        assert!(output.prompt_clusters.is_empty());

        let clusterizer = PreClusterizer::new(ClusteringSetup {
            processing_delayed_hits: false,
            ..ClusteringSetup::default()
        })
        .unwrap();
        let hits = vec![delayed_hit(0, 0, 1.0), delayed_hit(1, 0, 2.0)];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.ignored_hits.len(), 2);
        assert!(output.delayed_clusters.is_empty());
    }

    #[test]
    fn test_delayed_window_scenario() {
        // Times [0, 5, 9, 40] us, window 10 us: the late hit drops out.
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![
            delayed_hit(0, 0, 0.0),
            delayed_hit(1, 0, 5.0),
            delayed_hit(2, 0, 9.0),
            delayed_hit(3, 0, 40.0),
        ];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.delayed_clusters.len(), 1);
        let ids: Vec<u32> = output.delayed_clusters[0].iter().map(|h| h.hit_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(output.ignored_hits.len(), 1);
        assert_eq!(output.ignored_hits[0].hit_id, 3);
    }

    #[test]
    fn test_delayed_reference_does_not_advance() {
        // Times [0, 6, 12], window 10: hit at 12 is within 10 of hit 6 but
        // not of the window reference at 0, so it falls out of the cluster
        // and, lacking a later partner, is ignored.
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![
            delayed_hit(0, 0, 0.0),
            delayed_hit(1, 0, 6.0),
            delayed_hit(2, 0, 12.0),
        ];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.delayed_clusters.len(), 1);
        let ids: Vec<u32> = output.delayed_clusters[0].iter().map(|h| h.hit_id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(output.ignored_hits.len(), 1);
        assert_eq!(output.ignored_hits[0].hit_id, 2);
    }

    #[test]
    fn test_delayed_multiple_clusters() {
        // Two well separated groups plus a trailing pair: three windows.
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![
            delayed_hit(0, 0, 0.0),
            delayed_hit(1, 0, 4.0),
            delayed_hit(2, 0, 30.0),
            delayed_hit(3, 0, 33.0),
            delayed_hit(4, 0, 35.0),
            delayed_hit(5, 0, 80.0),
            delayed_hit(6, 0, 81.0),
        ];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.delayed_clusters.len(), 3);
        assert_eq!(output.delayed_clusters[0].len(), 2);
        assert_eq!(output.delayed_clusters[1].len(), 3);
        assert_eq!(output.delayed_clusters[2].len(), 2);
        assert!(output.ignored_hits.is_empty());
    }

    #[test]
    fn test_delayed_unsorted_input_is_sorted_first() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![
            delayed_hit(0, 0, 9.0),
            delayed_hit(1, 0, 0.0),
            delayed_hit(2, 0, 5.0),
        ];
        let output = clusterizer.process(&hits).unwrap();
        assert_eq!(output.delayed_clusters.len(), 1);
        let ids: Vec<u32> = output.delayed_clusters[0].iter().map(|h| h.hit_id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_lone_delayed_hit_is_ignored() {
        let clusterizer = PreClusterizer::new(split_setup()).unwrap();
        let hits = vec![delayed_hit(0, 1, 3.0)];
        let output = clusterizer.process(&hits).unwrap();
        assert!(output.delayed_clusters.is_empty());
        assert_eq!(output.ignored_hits.len(), 1);
    }

    #[test]
    fn test_partition_coverage_random_batches() {
        // Every hit ends up in exactly one output collection, whatever the
        // mix of categories, sides and times.
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for split in [false, true] {
            let clusterizer = PreClusterizer::new(ClusteringSetup {
                split_chamber: split,
                ..ClusteringSetup::default()
            })
            .unwrap();
            for _ in 0..50 {
                let n = rng.gen_range(0..40);
                let hits: Vec<TrackerHit> = (0..n)
                    .map(|id| {
                        let side = rng.gen_range(0..3);
                        let mut hit = if rng.gen_bool(0.5) {
                            delayed_hit(id, side, rng.gen_range(0.0..100.0))
                        } else {
                            prompt_hit(id, side)
                        };
                        hit.sterile = rng.gen_bool(0.1);
                        hit.noisy = rng.gen_bool(0.1);
                        hit
                    })
                    .collect();
                let output = clusterizer.process(&hits).unwrap();

                let mut seen: Vec<u32> =
                    output.ignored_hits.iter().map(|h| h.hit_id).collect();
                for cluster in output
                    .prompt_clusters
                    .iter()
                    .chain(output.delayed_clusters.iter())
                {
                    seen.extend(cluster.iter().map(|h| h.hit_id));
                }
                seen.sort_unstable();
                let expected: Vec<u32> = (0..n).collect();
                assert_eq!(seen, expected, "lost or duplicated hits (split={})", split);
            }
        }
    }

    #[test]
    fn test_output_dump() {
        let clusterizer = PreClusterizer::new(ClusteringSetup::default()).unwrap();
        let hits = vec![
            prompt_hit(0, 0),
            prompt_hit(1, 0),
            delayed_hit(2, 0, 1.0),
            delayed_hit(3, 0, 2.0),
        ];
        let output = clusterizer.process(&hits).unwrap();
        let mut buffer = Vec::new();
        output.dump(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Prompt clusters: 1"));
        assert!(text.contains("Delayed clusters: 1"));
    }
}
