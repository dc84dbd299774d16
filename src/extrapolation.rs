use crate::geometry::{BoundarySet, DetectorGeometry, SIDE_BACK, SIDE_FRONT};
use crate::hit::CellAddress;
use crate::trajectory::{Helix3, Line3, TrajectoryPattern};
use crate::vertex::{ParticleTrack, VertexCategory};
use std::cmp::Ordering;
use std::f64::consts::PI;

// Vertex extrapolation of fitted trajectories onto the detector walls.
//
// For each fitted curve the extrapolator computes the candidate
// intersections with the source foil, the main calorimeter walls, the
// x-calorimeter walls and the gamma-veto walls, then assigns to each of
// the two trajectory endpoints the nearest accepted candidate. Accepted
// candidates shorten the trajectory; rejected ones leave the endpoint at
// its fitted position, tagged as on-wire.

/// Boundary categories a given track can plausibly reach, decided from the
/// layers and rows its cluster actually fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsableSurfaces {
    pub source_foil: bool,
    pub main_calorimeter: bool,
    pub x_calorimeter: bool,
    pub gamma_veto: bool,
}

impl UsableSurfaces {
    /// All categories disabled; every extrapolation falls back to on-wire.
    pub fn none() -> Self {
        UsableSurfaces::default()
    }

    /// All categories enabled.
    pub fn all() -> Self {
        UsableSurfaces {
            source_foil: true,
            main_calorimeter: true,
            x_calorimeter: true,
            gamma_veto: true,
        }
    }

    pub fn allows(&self, category: VertexCategory) -> bool {
        match category {
            VertexCategory::SourceFoil => self.source_foil,
            VertexCategory::MainCalorimeter => self.main_calorimeter,
            VertexCategory::XCalorimeter => self.x_calorimeter,
            VertexCategory::GammaVeto => self.gamma_veto,
            VertexCategory::OnWire => true,
        }
    }
}

/// A fitted trajectory handed over by the fitting stage: the curve, the
/// half-chamber it was fitted in, and the cell addresses of the hit
/// cluster it interpolates (used for the usable-surface pre-check).
#[derive(Debug, Clone)]
pub struct FittedTrajectory {
    pub pattern: TrajectoryPattern,
    pub side: Option<u32>,
    pub cluster: Option<Vec<CellAddress>>,
}

/// Driver computing and attaching extrapolated vertices to particle tracks.
#[derive(Debug, Clone)]
pub struct VertexExtrapolator {
    pub geometry: DetectorGeometry,
}

impl VertexExtrapolator {
    pub fn new(geometry: DetectorGeometry) -> Self {
        VertexExtrapolator { geometry }
    }

    /// Decide which boundary categories are geometrically plausible from
    /// the cluster's cell occupancy: the foil needs a hit in the innermost
    /// layer, the main calorimeter a hit in the outermost layer, the
    /// x-walls a hit in the extreme rows. Gamma-veto crossings cannot be
    /// inferred from cell addresses and stay disabled here. Without a
    /// cluster every category is disabled.
    pub fn determine_usable_surfaces(&self, cluster: Option<&[CellAddress]>) -> UsableSurfaces {
        let mut usable = UsableSurfaces::none();
        let cells = match cluster {
            Some(cells) => cells,
            None => return usable,
        };
        for cell in cells {
            if cell.layer < 1 {
                usable.source_foil = true;
            }
            if cell.layer >= self.geometry.layers_per_side - 1 {
                usable.main_calorimeter = true;
            }
            if cell.row <= 1 || cell.row >= self.geometry.rows_per_side - 1 {
                usable.x_calorimeter = true;
            }
        }
        usable
    }

    /// Extrapolate one trajectory and append its vertices to the track.
    ///
    /// Returns the shortened copy of the trajectory pattern, or None if the
    /// trajectory could not be processed (missing or invalid side
    /// addressing). A failed trajectory yields no vertices but never aborts
    /// the event; the failure is only logged.
    pub fn process(
        &self,
        trajectory: &FittedTrajectory,
        track: &mut ParticleTrack,
    ) -> Option<TrajectoryPattern> {
        let side = match trajectory.side {
            Some(side) => side,
            None => {
                log::error!("Trajectory has no side address, skipping vertex extrapolation");
                return None;
            }
        };
        let bounds = match self.geometry.boundaries(side) {
            Some(bounds) => bounds,
            None => {
                log::error!(
                    "Trajectory side {} is not a valid half-chamber, skipping vertex extrapolation",
                    side
                );
                return None;
            }
        };

        let usable = self.determine_usable_surfaces(trajectory.cluster.as_deref());

        let (vertices, shortened) = match &trajectory.pattern {
            TrajectoryPattern::Line(line) => extrapolate_line(line, &bounds, &usable),
            TrajectoryPattern::Helix(helix) => extrapolate_helix(helix, &bounds, &usable),
        };

        for (category, position) in vertices {
            if (side == SIDE_BACK && position[0] > self.geometry.foil_x)
                || (side == SIDE_FRONT && position[0] < self.geometry.foil_x)
            {
                log::debug!(
                    "Vertex at {:?} lies on the opposite side of the foil from its trajectory",
                    position
                );
            }
            track.add_vertex(position, category);
        }

        Some(shortened)
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn cmp_points(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a[0].total_cmp(&b[0])
        .then(a[1].total_cmp(&b[1]))
        .then(a[2].total_cmp(&b[2]))
}

/// Line case: one candidate per boundary plane the line is not parallel
/// to, deduplicated by position, each endpoint matched to the nearest
/// candidate competing for it.
fn extrapolate_line(
    line: &Line3,
    bounds: &BoundarySet,
    usable: &UsableSurfaces,
) -> (Vec<(VertexCategory, [f64; 3])>, TrajectoryPattern) {
    let mut candidates: Vec<([f64; 3], VertexCategory)> = Vec::new();
    if let Some(p) = line.point_at_plane(0, bounds.foil_x) {
        candidates.push((p, VertexCategory::SourceFoil));
    }
    for &x in &bounds.main_wall_x {
        if let Some(p) = line.point_at_plane(0, x) {
            candidates.push((p, VertexCategory::MainCalorimeter));
        }
    }
    for &y in &bounds.xwall_y {
        if let Some(p) = line.point_at_plane(1, y) {
            candidates.push((p, VertexCategory::XCalorimeter));
        }
    }
    for &z in &bounds.gveto_z {
        if let Some(p) = line.point_at_plane(2, z) {
            candidates.push((p, VertexCategory::GammaVeto));
        }
    }

    // Sorted position keys, first insertion wins on duplicates: keeps the
    // nearest-match scan deterministic.
    candidates.sort_by(|a, b| cmp_points(&a.0, &b.0));
    candidates.dedup_by(|next, kept| next.0 == kept.0);

    // Each candidate competes only for the endpoint it is nearer to; each
    // endpoint keeps its closest competitor, first one wins on ties.
    let mut best_first: Option<usize> = None;
    let mut best_last: Option<usize> = None;
    let mut min_first = f64::INFINITY;
    let mut min_last = f64::INFINITY;
    for (index, (position, _)) in candidates.iter().enumerate() {
        let l1 = distance(&line.first, position);
        let l2 = distance(&line.last, position);
        if l1 < l2 {
            if l1 < min_first {
                min_first = l1;
                best_first = Some(index);
            }
        } else if l2 < min_last {
            min_last = l2;
            best_last = Some(index);
        }
    }

    let mut new_line = line.clone();
    let mut vertices = Vec::with_capacity(2);
    match best_first {
        Some(index) if usable.allows(candidates[index].1) => {
            new_line.first = candidates[index].0;
            vertices.push((candidates[index].1, candidates[index].0));
        }
        _ => vertices.push((VertexCategory::OnWire, line.first)),
    }
    match best_last {
        Some(index) if usable.allows(candidates[index].1) => {
            new_line.last = candidates[index].0;
            vertices.push((candidates[index].1, candidates[index].0));
        }
        _ => vertices.push((VertexCategory::OnWire, line.last)),
    }

    (vertices, TrajectoryPattern::Line(new_line))
}

/// Helix case: candidates are curve-parameter values where the helix
/// crosses a wall plane, each bound matched to the nearest candidate t,
/// with an arc-length guard rejecting implausibly long truncations.
fn extrapolate_helix(
    helix: &Helix3,
    bounds: &BoundarySet,
    usable: &UsableSurfaces,
) -> (Vec<(VertexCategory, [f64; 3])>, TrajectoryPattern) {
    let mut candidates: Vec<(f64, VertexCategory)> = Vec::new();

    // Planes at fixed x: cos(angle) = (x - xc) / r, two angle solutions.
    // |cos| = 1 is the tangent case and yields one degenerate candidate;
    // |cos| > 1 means the wall is out of reach.
    let mut add_x_plane = |x: f64, category: VertexCategory| {
        let cangle = (x - helix.center[0]) / helix.radius;
        if cangle.abs() <= 1.0 {
            let angle = cangle.acos();
            candidates.push((Helix3::angle_to_t(angle), category));
            candidates.push((Helix3::angle_to_t(-angle), category));
        }
    };
    add_x_plane(bounds.foil_x, VertexCategory::SourceFoil);
    for &x in &bounds.main_wall_x {
        add_x_plane(x, VertexCategory::MainCalorimeter);
    }

    // Planes at fixed y: sin(angle) = (y - yc) / r. The second solution is
    // the reflection about pi, folded to the branch the track occupies.
    let mean_angle = (helix.angle1() + helix.angle2()) / 2.0;
    for &y in &bounds.xwall_y {
        let sangle = (y - helix.center[1]) / helix.radius;
        if sangle.abs() <= 1.0 {
            let angle = sangle.asin();
            candidates.push((Helix3::angle_to_t(angle), VertexCategory::XCalorimeter));
            let reflected = if mean_angle < 0.0 {
                -PI - angle
            } else {
                PI - angle
            };
            candidates.push((Helix3::angle_to_t(reflected), VertexCategory::XCalorimeter));
        }
    }

    // Planes at fixed z: direct inversion, single solution. A degenerate
    // (zero-pitch) helix never reaches them.
    for &z in &bounds.gveto_z {
        let t = helix.t_from_z(z);
        if t.is_finite() {
            candidates.push((t, VertexCategory::GammaVeto));
        }
    }

    // Sorted t keys, first insertion wins on duplicates.
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
    candidates.dedup_by(|next, kept| next.0 == kept.0);

    let mut best_first: Option<(f64, VertexCategory)> = None;
    let mut best_last: Option<(f64, VertexCategory)> = None;
    let mut min_first = f64::INFINITY;
    let mut min_last = f64::INFINITY;
    for &(t, category) in &candidates {
        let delta1 = (helix.t1 - t).abs();
        let delta2 = (helix.t2 - t).abs();
        if delta1 < delta2 {
            if delta1 < min_first {
                min_first = delta1;
                best_first = Some((t, category));
            }
        } else if delta2 < min_last {
            min_last = delta2;
            best_last = Some((t, category));
        }
    }

    // Moving a bound by delta t adds turn_length * |delta t| of arc; the
    // truncation is only physical if that stays below the fitted length.
    let turn_length = helix.turn_length();
    let length = helix.length();

    let mut new_helix = helix.clone();
    let mut vertices = Vec::with_capacity(2);
    match best_first {
        Some((t, category))
            if usable.allows(category) && turn_length * (t - helix.t1).abs() < length =>
        {
            new_helix.t1 = t;
            vertices.push((category, new_helix.first()));
        }
        _ => vertices.push((VertexCategory::OnWire, helix.first())),
    }
    match best_last {
        Some((t, category))
            if usable.allows(category) && turn_length * (t - helix.t2).abs() < length =>
        {
            new_helix.t2 = t;
            vertices.push((category, new_helix.last()));
        }
        _ => vertices.push((VertexCategory::OnWire, helix.last())),
    }

    (vertices, TrajectoryPattern::Helix(new_helix))
}
