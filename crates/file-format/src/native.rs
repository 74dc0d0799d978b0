use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hybrid_mesh::HybridMesh;
use prism_types::Point3d;
use wall_mesh::TriMesh;

use crate::errors::{ExportError, LoadError};

/// Current native file format version.
pub const FORMAT_VERSION: u32 = 1;

const FORMAT_ID: &str = "prismgen";

/// Metadata stamped into every native file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshMetadata {
    /// Unique id of this mesh instance.
    pub mesh_id: Uuid,
    /// When the file was written.
    pub created: DateTime<Utc>,
    /// Human-readable generator string.
    pub generator: String,
}

impl MeshMetadata {
    pub fn new() -> Self {
        Self {
            mesh_id: Uuid::new_v4(),
            created: Utc::now(),
            generator: format!("prismgen {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for MeshMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// The top-level native hybrid-mesh file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeFile {
    format: String,
    version: u32,
    metadata: MeshMetadata,
    mesh: HybridMesh,
}

/// Serialize the hybrid mesh to the native JSON format.
pub fn save_hybrid(path: &Path, mesh: &HybridMesh) -> Result<(), ExportError> {
    let file = NativeFile {
        format: FORMAT_ID.to_string(),
        version: FORMAT_VERSION,
        metadata: MeshMetadata::new(),
        mesh: mesh.clone(),
    };
    let json = serde_json::to_string(&file).map_err(|e| ExportError::Serialize(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load a native hybrid mesh, validating the format identifier and
/// version. Older versions pass through the migration hook; future
/// versions are rejected.
pub fn load_hybrid(path: &Path) -> Result<(HybridMesh, MeshMetadata), LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let raw: NativeFile =
        serde_json::from_str(&text).map_err(|e| LoadError::ParseError(e.to_string()))?;

    if raw.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }
    let mesh = migrate(raw.mesh, raw.version)?;
    Ok((mesh, raw.metadata))
}

/// Version migration hook. Version 1 is current; the arm for future
/// upgrades keeps the load path honest about what it can read.
fn migrate(mesh: HybridMesh, from: u32) -> Result<HybridMesh, LoadError> {
    match from {
        FORMAT_VERSION => Ok(mesh),
        older => Err(LoadError::MigrationFailed {
            from: older,
            to: FORMAT_VERSION,
            reason: "no migration path defined".to_string(),
        }),
    }
}

/// Native wall triangulation file: the surface handed to the generator,
/// also used for the intermediate shell dumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeTriangulation {
    format: String,
    version: u32,
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[u32; 3]>,
    #[serde(default)]
    tags: Vec<i32>,
}

pub fn save_triangulation(path: &Path, mesh: &TriMesh) -> Result<(), ExportError> {
    let file = NativeTriangulation {
        format: FORMAT_ID.to_string(),
        version: FORMAT_VERSION,
        vertices: mesh.vertices().iter().map(|p| p.to_array()).collect(),
        triangles: mesh.triangles().to_vec(),
        tags: mesh.tags().to_vec(),
    };
    let json = serde_json::to_string(&file).map_err(|e| ExportError::Serialize(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn load_triangulation(path: &Path) -> Result<TriMesh, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let raw: NativeTriangulation =
        serde_json::from_str(&text).map_err(|e| LoadError::ParseError(e.to_string()))?;
    if raw.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(raw.format));
    }
    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let vertices: Vec<Point3d> = raw.vertices.iter().map(|&a| Point3d::from_array(a)).collect();
    let tags = if raw.tags.len() == raw.triangles.len() {
        raw.tags
    } else {
        vec![0; raw.triangles.len()]
    };
    let mesh = TriMesh::from_parts(vertices, raw.triangles, tags);
    mesh.validate_indices()
        .map_err(|e| LoadError::ParseError(e.to_string()))?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybrid_mesh::{ElementKind, Section};
    use wall_mesh::primitives::icosphere;

    fn tmp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("native-{}-{}", std::process::id(), name))
    }

    #[test]
    fn hybrid_round_trip() {
        let mut mesh = HybridMesh::new();
        mesh.nodes = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 1.0),
        ];
        let mut tets = Section::new("tetregion", ElementKind::Tet4, 0);
        tets.push_element(&[0, 1, 2, 3]);
        mesh.add_section(tets);
        mesh.flags.tangled_elements = 2;

        let path = tmp("hybrid.json");
        save_hybrid(&path, &mesh).unwrap();
        let (back, meta) = load_hybrid(&path).unwrap();
        assert_eq!(back.nnodes(), 4);
        assert_eq!(back.nelements(), 1);
        assert_eq!(back.flags.tangled_elements, 2);
        assert!(!meta.generator.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn future_version_is_rejected() {
        let path = tmp("future.json");
        let json = format!(
            "{{\"format\":\"prismgen\",\"version\":{},\"metadata\":{{\"mesh_id\":\"00000000-0000-0000-0000-000000000000\",\"created\":\"2024-01-01T00:00:00Z\",\"generator\":\"x\"}},\"mesh\":{{\"nodes\":[],\"sections\":[],\"fields\":{{}},\"flags\":{{\"envelope_infeasible\":0,\"optimizer_failed\":false,\"tangled_elements\":0}}}}}}",
            FORMAT_VERSION + 1
        );
        std::fs::write(&path, json).unwrap();
        assert!(matches!(
            load_hybrid(&path),
            Err(LoadError::FutureVersion { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn triangulation_round_trip() {
        let mesh = icosphere(Point3d::ORIGIN, 2.0, 1);
        let path = tmp("tri.json");
        save_triangulation(&path, &mesh).unwrap();
        let back = load_triangulation(&path).unwrap();
        assert_eq!(back.ntriangles(), mesh.ntriangles());
        assert_eq!(back.triangles(), mesh.triangles());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn wrong_format_id_is_rejected() {
        let path = tmp("alien.json");
        std::fs::write(
            &path,
            "{\"format\":\"alien\",\"version\":1,\"vertices\":[],\"triangles\":[]}",
        )
        .unwrap();
        assert!(matches!(
            load_triangulation(&path),
            Err(LoadError::UnknownFormat(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
