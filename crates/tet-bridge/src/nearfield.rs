use tracing::info;

use prism_types::{Point3d, Transform, Vec3};
use wall_mesh::graph::ellipsoid_encloses;
use wall_mesh::primitives::{icosphere, icosphere_triangle_count};
use wall_mesh::TriMesh;

use crate::error::TetError;
use crate::NEARFIELD_TAG;

/// Nearfield refinement region configuration.
#[derive(Debug, Clone)]
pub struct NearfieldSpec {
    /// Target edge length inside the region. 0 disables the nearfield;
    /// negative asks for auto-sizing from the envelope edge statistics.
    pub edge_length: f64,
    /// Bounding-box multiplier used when no explicit geometry is given.
    pub size_factor: f64,
    pub center: Option<Point3d>,
    pub semi_axes: Option<Vec3>,
}

impl Default for NearfieldSpec {
    fn default() -> Self {
        Self {
            edge_length: 0.0,
            size_factor: 3.5,
            center: None,
            semi_axes: None,
        }
    }
}

/// Resolved nearfield: the boundary ellipsoid plus the effective edge
/// length (after auto-sizing).
pub struct Nearfield {
    pub mesh: TriMesh,
    pub edge_length: f64,
}

/// Build the nearfield ellipsoid boundary, or `None` when disabled.
///
/// The triangulation level is chosen so the boundary triangle area comes
/// out near `sqrt(3)/4 * e^2` for the target edge length `e`, using the
/// Knud Thomsen approximation (p = 1.6075) for the ellipsoid surface area.
pub fn build_nearfield(spec: &NearfieldSpec, envelope: &TriMesh) -> Result<Option<Nearfield>, TetError> {
    if spec.edge_length == 0.0 {
        return Ok(None);
    }

    let edge_length = if spec.edge_length < 0.0 {
        let (mean, max) = envelope.edge_stats();
        let suggested = (2.0 * max).max(8.0 * mean);
        info!(suggested, "auto-sized nearfield edge length");
        suggested
    } else {
        spec.edge_length
    };

    let (center, semi_axes) = match (spec.center, spec.semi_axes) {
        (Some(c), Some(a)) => (c, a),
        _ => {
            let bb = envelope.bounding_box();
            let half = bb.extent() * (0.5 * spec.size_factor);
            (bb.center(), half)
        }
    };
    info!(?semi_axes, "nearfield region semi-axes");

    if !ellipsoid_encloses(envelope, center, semi_axes) {
        return Err(TetError::InvalidPlc {
            reason: "nearfield ellipsoid does not enclose the envelope mesh".into(),
        });
    }

    let level = refinement_level(semi_axes, edge_length);
    info!(level, "nearfield boundary refinement level");

    let mut mesh = icosphere(Point3d::ORIGIN, 1.0, level);
    let tfm = Transform::ellipsoid(center, semi_axes);
    tfm.apply_points(mesh.vertices_mut());
    mesh.set_tag_all(NEARFIELD_TAG);

    Ok(Some(Nearfield { mesh, edge_length }))
}

/// Subdivision level whose triangle count best covers the ellipsoid
/// surface with triangles of the target edge length, clamped to [3, 5].
fn refinement_level(semi_axes: Vec3, edge_length: f64) -> u32 {
    const P: f64 = 1.6075;
    let a = semi_axes.x.abs().powf(P);
    let b = semi_axes.y.abs().powf(P);
    let c = semi_axes.z.abs().powf(P);
    let area = 4.0 * std::f64::consts::PI * ((a * b + a * c + b * c) / 3.0).powf(1.0 / P);
    let tri_area = 0.25 * 3.0f64.sqrt() * edge_length * edge_length;
    let target = (area / tri_area).ceil() as usize;

    let mut level = 3u32;
    while level < 5 && icosphere_triangle_count(level) < target {
        level += 1;
    }
    level
}
