use tracing::info;

use wall_mesh::PointGrid;

use crate::mesh::HybridMesh;

/// Merge nodes closer than `tol`, remapping every section, and drop the
/// unreferenced duplicates. Typical duplicates are the wall/envelope seam
/// copies created during assembly. Returns the number of merged pairs.
///
/// Merging to the lowest index makes the operation idempotent: a second
/// call with the same tolerance finds nothing left to merge.
pub fn merge_nodes(mesh: &mut HybridMesh, tol: f64) -> usize {
    if mesh.nodes.is_empty() {
        return 0;
    }

    let grid = PointGrid::build(&mesh.nodes, tol.max(1e-300));
    let mut remap: Vec<u32> = (0..mesh.nodes.len() as u32).collect();
    let mut merged = 0usize;
    for i in 0..mesh.nodes.len() {
        if remap[i] != i as u32 {
            continue;
        }
        for j in grid.query_sphere(&mesh.nodes[i], tol) {
            if j as usize > i && remap[j as usize] == j {
                remap[j as usize] = i as u32;
                merged += 1;
            }
        }
    }
    if merged == 0 {
        return 0;
    }

    // compact the node array
    let mut new_index = vec![u32::MAX; mesh.nodes.len()];
    let mut kept = Vec::with_capacity(mesh.nodes.len() - merged);
    for i in 0..mesh.nodes.len() {
        if remap[i] == i as u32 {
            new_index[i] = kept.len() as u32;
            kept.push(mesh.nodes[i]);
        }
    }
    for i in 0..mesh.nodes.len() {
        if remap[i] != i as u32 {
            new_index[i] = new_index[remap[i] as usize];
        }
    }
    mesh.nodes = kept;

    for section in &mut mesh.sections {
        for v in section.elements.iter_mut() {
            *v = new_index[*v as usize];
        }
    }

    // per-node fields shrink with the node array
    for values in mesh.fields.values_mut() {
        let mut compacted = Vec::with_capacity(mesh.nodes.len());
        for (i, &ni) in new_index.iter().enumerate() {
            if remap[i] == i as u32 {
                debug_assert_eq!(ni as usize, compacted.len());
                compacted.push(values[i]);
            }
        }
        *values = compacted;
    }

    info!(merged, nodes = mesh.nodes.len(), "merged duplicate nodes");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ElementKind, Section};
    use prism_types::Point3d;

    fn mesh_with_seam() -> HybridMesh {
        let mut m = HybridMesh::new();
        m.nodes = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            // duplicates of the first two
            Point3d::new(0.0, 0.0, 1e-12),
            Point3d::new(1.0, 0.0, -1e-12),
            Point3d::new(0.5, 0.5, 1.0),
        ];
        let mut tris = Section::new("wall0", ElementKind::Tri3, 0);
        tris.push_element(&[0, 1, 2]);
        tris.push_element(&[3, 4, 5]);
        m.add_section(tris);
        m.append_field("h", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        m
    }

    #[test]
    fn seam_duplicates_are_merged_and_remapped() {
        let mut m = mesh_with_seam();
        let merged = merge_nodes(&mut m, 1e-9);
        assert_eq!(merged, 2);
        assert_eq!(m.nnodes(), 4);
        let s = m.section("wall0").unwrap();
        assert_eq!(s.element(1), &[0, 1, 3]);
        assert_eq!(m.fields["h"], vec![0.0, 1.0, 2.0, 5.0]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut m = mesh_with_seam();
        let first = merge_nodes(&mut m, 1e-9);
        let nodes_after = m.nnodes();
        let elements_after = m.nelements();
        let second = merge_nodes(&mut m, 1e-9);
        assert!(first > 0);
        assert_eq!(second, 0);
        assert_eq!(m.nnodes(), nodes_after);
        assert_eq!(m.nelements(), elements_after);
    }
}
