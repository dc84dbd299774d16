// Detector boundary geometry consumed by the vertex extrapolator.
//
// The detector is a box split by the source foil plane at a fixed x.
// Each half-chamber faces a main calorimeter wall (fixed x), two
// x-calorimeter walls closing the tracker ends (fixed y) and two
// gamma-veto walls above and below (fixed z). Wall positions come from
// the host geometry service; this struct is the read-only snapshot of
// the coordinates the extrapolation needs.

/// Half-chamber on the negative-x side of the foil.
pub const SIDE_BACK: u32 = 0;
/// Half-chamber on the positive-x side of the foil.
pub const SIDE_FRONT: u32 = 1;

#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    /// x position of the source foil plane.
    pub foil_x: f64,
    /// x position of the main calorimeter wall, per side.
    pub main_wall_x: [f64; 2],
    /// y positions of the two x-calorimeter walls, per side.
    pub xwall_y: [[f64; 2]; 2],
    /// z positions of the two gamma-veto walls, per side.
    pub gveto_z: [[f64; 2]; 2],
    /// Number of instrumented drift-cell layers per side.
    pub layers_per_side: u32,
    /// Number of instrumented drift-cell rows per side.
    pub rows_per_side: u32,
}

impl DetectorGeometry {
    /// Create a geometry with consistency checks on the wall ordering.
    pub fn new(
        foil_x: f64,
        main_wall_x: [f64; 2],
        xwall_y: [[f64; 2]; 2],
        gveto_z: [[f64; 2]; 2],
        layers_per_side: u32,
        rows_per_side: u32,
    ) -> Result<Self, String> {
        if !(main_wall_x[0] < foil_x && foil_x < main_wall_x[1]) {
            return Err(format!(
                "Main calorimeter walls ({}, {}) must bracket the source foil at x = {}",
                main_wall_x[0], main_wall_x[1], foil_x
            ));
        }
        for side in 0..2 {
            if xwall_y[side][0] >= xwall_y[side][1] {
                return Err(format!(
                    "X-wall positions on side {} are not ordered: ({}, {})",
                    side, xwall_y[side][0], xwall_y[side][1]
                ));
            }
            if gveto_z[side][0] >= gveto_z[side][1] {
                return Err(format!(
                    "Gamma-veto positions on side {} are not ordered: ({}, {})",
                    side, gveto_z[side][0], gveto_z[side][1]
                ));
            }
        }
        if layers_per_side == 0 || rows_per_side == 0 {
            return Err("Chamber must have at least one layer and one row".to_string());
        }
        Ok(DetectorGeometry {
            foil_x,
            main_wall_x,
            xwall_y,
            gveto_z,
            layers_per_side,
            rows_per_side,
        })
    }

    /// Nominal demonstrator dimensions, in millimeters: 9 drift-cell layers
    /// and 113 rows per side, main walls at |x| = 435 mm, x-walls at
    /// |y| = 2580 mm, gamma-veto walls at |z| = 1625 mm.
    pub fn demonstrator() -> Self {
        DetectorGeometry {
            foil_x: 0.0,
            main_wall_x: [-435.0, 435.0],
            xwall_y: [[-2580.0, 2580.0], [-2580.0, 2580.0]],
            gveto_z: [[-1625.0, 1625.0], [-1625.0, 1625.0]],
            layers_per_side: 9,
            rows_per_side: 113,
        }
    }

    /// Resolve the boundary coordinates relevant to a trajectory on the
    /// given side. Both main calorimeter walls are candidates whatever the
    /// side; x-wall and gamma-veto walls are those of the track's own
    /// half-chamber. Returns None for a side outside {0, 1}.
    pub fn boundaries(&self, side: u32) -> Option<BoundarySet> {
        if side > 1 {
            return None;
        }
        let s = side as usize;
        Some(BoundarySet {
            foil_x: self.foil_x,
            main_wall_x: self.main_wall_x,
            xwall_y: self.xwall_y[s],
            gveto_z: self.gveto_z[s],
        })
    }
}

/// Fixed wall coordinates against which one trajectory is extrapolated.
#[derive(Debug, Clone, Copy)]
pub struct BoundarySet {
    pub foil_x: f64,
    pub main_wall_x: [f64; 2],
    pub xwall_y: [f64; 2],
    pub gveto_z: [f64; 2],
}
