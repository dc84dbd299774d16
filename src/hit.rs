// Calibrated drift-cell (Geiger) hit data model consumed by the
// pre-clusterizer and, through cluster membership, by the vertex
// extrapolation pre-check.

/// Address of a drift cell in the tracking chamber.
///
/// `side` selects one of the two half-chambers split by the source foil
/// (0 = back, 1 = front), `layer` counts outward from the foil and `row`
/// runs along the foil. Values outside the instrumented ranges are carried
/// as-is; consumers decide how to treat them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    pub module: u32,
    pub side: u32,
    pub layer: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(module: u32, side: u32, layer: u32, row: u32) -> Self {
        CellAddress {
            module,
            side,
            layer,
            row,
        }
    }
}

/// A single calibrated tracker hit.
///
/// A usable hit carries a cell address and a transverse (x, y) position.
/// It is exactly one of: sterile/noisy (to be ignored), prompt, or delayed;
/// a delayed hit must also carry a delayed time. The pre-clusterizer checks
/// these invariants up front and rejects the whole batch on violation.
#[derive(Debug, Clone)]
pub struct TrackerHit {
    pub hit_id: u32,
    pub cell: Option<CellAddress>,
    /// Transverse position of the anode wire, if reconstructed.
    pub position_xy: Option<[f64; 2]>,
    /// True for a delayed hit, false for a prompt hit.
    pub delayed: bool,
    /// Delayed drift time; only meaningful when `delayed` is set.
    pub delayed_time: Option<f64>,
    pub sterile: bool,
    pub noisy: bool,
}

impl TrackerHit {
    /// Create a prompt hit at the given cell and transverse position.
    pub fn prompt(hit_id: u32, cell: CellAddress, x: f64, y: f64) -> Self {
        TrackerHit {
            hit_id,
            cell: Some(cell),
            position_xy: Some([x, y]),
            delayed: false,
            delayed_time: None,
            sterile: false,
            noisy: false,
        }
    }

    /// Create a delayed hit with its delayed drift time.
    pub fn delayed(hit_id: u32, cell: CellAddress, x: f64, y: f64, delayed_time: f64) -> Self {
        TrackerHit {
            hit_id,
            cell: Some(cell),
            position_xy: Some([x, y]),
            delayed: true,
            delayed_time: Some(delayed_time),
            sterile: false,
            noisy: false,
        }
    }

    pub fn is_prompt(&self) -> bool {
        !self.delayed
    }

    pub fn is_delayed(&self) -> bool {
        self.delayed
    }

    pub fn is_sterile(&self) -> bool {
        self.sterile
    }

    pub fn is_noisy(&self) -> bool {
        self.noisy
    }

    pub fn has_cell(&self) -> bool {
        self.cell.is_some()
    }

    pub fn has_xy(&self) -> bool {
        self.position_xy.is_some()
    }

    pub fn has_delayed_time(&self) -> bool {
        matches!(self.delayed_time, Some(t) if t.is_finite())
    }

    /// Chamber side read from the cell address, if any.
    pub fn side(&self) -> Option<u32> {
        self.cell.map(|c| c.side)
    }
}
