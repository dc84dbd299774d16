// Reconstructed track vertices and the particle-track sink they attach to.

/// Boundary surface a vertex is associated with.
///
/// `OnWire` is the fallback when no boundary intersection was accepted:
/// the trajectory endpoint stays where the fit left it, inside the
/// drift-cell volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexCategory {
    SourceFoil,
    MainCalorimeter,
    XCalorimeter,
    GammaVeto,
    OnWire,
}

impl VertexCategory {
    /// Stable label stored in the output data model.
    pub fn label(&self) -> &'static str {
        match self {
            VertexCategory::SourceFoil => "foil",
            VertexCategory::MainCalorimeter => "calo",
            VertexCategory::XCalorimeter => "xcalo",
            VertexCategory::GammaVeto => "gveto",
            VertexCategory::OnWire => "wire",
        }
    }
}

/// A reconstructed 3D vertex tagged with its boundary category.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Sequential id within the owning track's vertex collection.
    pub vertex_id: u32,
    pub position: [f64; 3],
    pub category: VertexCategory,
}

/// A particle track record: an append-only, ordered vertex collection.
///
/// The extrapolator appends at most two vertices per trajectory; unrelated
/// logic (gamma pairing) may have prepended others.
#[derive(Debug, Clone, Default)]
pub struct ParticleTrack {
    pub vertices: Vec<Vertex>,
}

impl ParticleTrack {
    pub fn new() -> Self {
        ParticleTrack::default()
    }

    /// Append a vertex, assigning the next sequential id.
    pub fn add_vertex(&mut self, position: [f64; 3], category: VertexCategory) {
        let vertex_id = self.vertices.len() as u32;
        self.vertices.push(Vertex {
            vertex_id,
            position,
            category,
        });
    }
}
