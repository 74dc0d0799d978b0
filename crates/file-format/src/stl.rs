use std::fs::{File, OpenOptions};
use std::path::Path;

use prism_types::Point3d;
use wall_mesh::TriMesh;

use crate::errors::{ExportError, LoadError};

/// Read an STL file (binary or ASCII) into a triangle mesh.
///
/// STL stores triangle soup; coincident corner vertices are merged by the
/// reader's indexing, and a cleanup pass afterwards closes the remaining
/// tolerance gaps so the manifold test can succeed.
pub fn read_stl(path: &Path) -> Result<TriMesh, LoadError> {
    let mut file = File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let indexed = stl_io::read_stl(&mut file).map_err(|e| LoadError::ParseError(e.to_string()))?;

    let mut mesh = TriMesh::new();
    for v in &indexed.vertices {
        mesh.add_vertex(Point3d::new(v[0] as f64, v[1] as f64, v[2] as f64));
    }
    for face in &indexed.faces {
        mesh.add_triangle(
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        );
    }
    let tol = 1e-7 * mesh.bounding_box().diagonal().max(1.0);
    mesh.cleanup(tol);
    Ok(mesh)
}

/// Write a triangle mesh as binary STL.
pub fn write_stl(path: &Path, mesh: &TriMesh) -> Result<(), ExportError> {
    let io_err = |e: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let triangles: Vec<stl_io::Triangle> = (0..mesh.ntriangles())
        .map(|i| {
            let [a, b, c] = mesh.triangle(i);
            let n = mesh.face_normal(i);
            let v = |idx: u32| -> stl_io::Vertex {
                let p = mesh.vertex(idx);
                [p.x as f32, p.y as f32, p.z as f32]
            };
            stl_io::Triangle {
                normal: [n.x as f32, n.y as f32, n.z as f32],
                vertices: [v(a), v(b), v(c)],
            }
        })
        .collect();

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(io_err)?;
    stl_io::write_stl(&mut file, triangles.iter()).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wall_mesh::primitives::icosphere;

    #[test]
    fn stl_round_trip_preserves_topology() {
        let mesh = icosphere(Point3d::ORIGIN, 1.0, 1);
        let path = std::env::temp_dir().join(format!("stl-rt-{}.stl", std::process::id()));
        write_stl(&path, &mesh).unwrap();
        let back = read_stl(&path).unwrap();
        assert_eq!(back.ntriangles(), mesh.ntriangles());
        assert_eq!(back.nvertices(), mesh.nvertices());
        // still closed after the round trip
        assert!(back.edge_use_counts().values().all(|&c| c == 2));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = read_stl(Path::new("/nonexistent/wall.stl")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
