use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use prism_types::Point3d;
use wall_mesh::{SymmetrySpec, TriMesh, WallGraph};

use crate::error::TetError;
use crate::{ENVELOPE_TAG_BASE, NEARFIELD_TAG};

/// Assemble the boundary complex and write it as a `.smesh` file.
///
/// Facet markers: envelope facets carry `ENVELOPE_TAG_BASE + wall tag`,
/// the far-field and nearfield meshes carry their reserved tags already.
/// The envelope is checked for watertightness first; handing the mesher an
/// open complex produces undiagnosable failures much later.
pub fn write_smesh(
    path: &Path,
    envelope: &TriMesh,
    farfield: &TriMesh,
    nearfield: Option<&TriMesh>,
    holes: &[Point3d],
    symmetry: Option<SymmetrySpec>,
) -> Result<(), TetError> {
    if envelope.max_tag() >= ENVELOPE_TAG_BASE {
        return Err(TetError::InvalidPlc {
            reason: format!(
                "wall tags must stay below the reserved range starting at {}",
                ENVELOPE_TAG_BASE
            ),
        });
    }
    WallGraph::build(envelope, symmetry).map_err(|e| TetError::InvalidPlc {
        reason: format!("envelope is not a valid boundary: {}", e),
    })?;

    // combined complex; coincident seam nodes (envelope rim / symmetry
    // cap) are merged so the complex is watertight
    let mut plc = TriMesh::new();
    // retag the envelope into the reserved range
    let tags: Vec<i32> = envelope.tags().iter().map(|t| ENVELOPE_TAG_BASE + t).collect();
    let env_tagged = TriMesh::from_parts(
        envelope.vertices().to_vec(),
        envelope.triangles().to_vec(),
        tags,
    );
    plc.append(&env_tagged);
    plc.append(farfield);
    if let Some(nf) = nearfield {
        plc.append(nf);
    }
    let seam_tol = 1e-9 * plc.bounding_box().diagonal().max(1.0);
    plc.cleanup(seam_tol);

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    // node list: count, dimension, attributes, boundary markers
    writeln!(w, "# generated boundary complex")?;
    writeln!(w, "{} 3 0 0", plc.nvertices())?;
    for (i, p) in plc.vertices().iter().enumerate() {
        writeln!(w, "{} {:.16e} {:.16e} {:.16e}", i + 1, p.x, p.y, p.z)?;
    }

    // facet list with boundary markers
    writeln!(w, "{} 1", plc.ntriangles())?;
    for i in 0..plc.ntriangles() {
        let [a, b, c] = plc.triangle(i);
        writeln!(w, "3 {} {} {} {}", a + 1, b + 1, c + 1, plc.tag(i))?;
    }

    // hole list: one marker point per enclosed void
    writeln!(w, "{}", holes.len())?;
    for (i, h) in holes.iter().enumerate() {
        writeln!(w, "{} {:.16e} {:.16e} {:.16e}", i + 1, h.x, h.y, h.z)?;
    }

    // region list (unused)
    writeln!(w, "0")?;
    w.flush()?;

    info!(
        path = %path.display(),
        nodes = plc.nvertices(),
        facets = plc.ntriangles(),
        holes = holes.len(),
        "wrote boundary complex"
    );
    Ok(())
}

/// True for facet markers in the nearfield/farfield reserved band rather
/// than the envelope band.
pub fn is_outer_marker(marker: i32) -> bool {
    marker >= NEARFIELD_TAG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farfield::build_farfield;
    use crate::is_envelope_marker;
    use std::fs;
    use wall_mesh::primitives::icosphere;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("plc-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn smesh_round_trips_counts_and_markers() {
        let envelope = icosphere(Point3d::ORIGIN, 1.0, 1);
        let farfield = build_farfield(Point3d::ORIGIN, 10.0, 1);
        let path = tmp_path("basic.smesh");
        write_smesh(&path, &envelope, &farfield, None, &[Point3d::ORIGIN], None).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines().filter(|l| !l.starts_with('#'));
        let header = lines.next().unwrap();
        let nnodes: usize = header.split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(nnodes, envelope.nvertices() + farfield.nvertices());

        // skip node lines, read facet header
        let facet_header = lines.nth(nnodes).unwrap();
        let nfacets: usize = facet_header.split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(nfacets, envelope.ntriangles() + farfield.ntriangles());

        // all envelope facets in the reserved band
        let mut env_count = 0;
        for line in lines.by_ref().take(nfacets) {
            let marker: i32 = line.split_whitespace().last().unwrap().parse().unwrap();
            if is_envelope_marker(marker) {
                env_count += 1;
            }
        }
        assert_eq!(env_count, envelope.ntriangles());

        let hole_header = lines.next().unwrap();
        assert_eq!(hole_header.trim(), "1");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn open_envelope_is_rejected() {
        let mut envelope = TriMesh::new();
        let a = envelope.add_vertex(Point3d::new(0.0, 0.0, 0.0));
        let b = envelope.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let c = envelope.add_vertex(Point3d::new(0.0, 1.0, 0.0));
        envelope.add_triangle(a, b, c);
        let farfield = build_farfield(Point3d::ORIGIN, 10.0, 1);
        let path = tmp_path("open.smesh");
        let result = write_smesh(&path, &envelope, &farfield, None, &[], None);
        assert!(matches!(result, Err(TetError::InvalidPlc { .. })));
        assert!(!path.exists());
    }
}
