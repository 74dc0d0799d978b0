use std::collections::BTreeMap;

use tracing::info;

use prism_types::Vec3;
use shell_gen::Shell;
use tet_bridge::plc::is_outer_marker;
use tet_bridge::{TetMesh, NEARFIELD_TAG};
use wall_mesh::TriMesh;

use crate::columns::{layer_fractions, spline_column, straight_column};
use crate::mesh::{ElementKind, HybridMesh, Section};
use crate::reconcile::WallMatch;

/// Prism extrusion options.
#[derive(Debug, Clone, Default)]
pub struct PrismParams {
    /// Bend the columns along a cubic between wall normal and extrusion
    /// direction instead of a straight line.
    pub spline_normals: bool,
}

/// Builds the final hybrid mesh from the tet region and the reconciled
/// wall/envelope pair.
pub struct PrismAssembler<'a> {
    wall: &'a TriMesh,
    wall_normals: &'a [Vec3],
    shell: &'a Shell,
    tet: &'a TetMesh,
    wall_match: &'a WallMatch,
    params: PrismParams,
}

impl<'a> PrismAssembler<'a> {
    pub fn new(
        wall: &'a TriMesh,
        wall_normals: &'a [Vec3],
        shell: &'a Shell,
        tet: &'a TetMesh,
        wall_match: &'a WallMatch,
        params: PrismParams,
    ) -> Self {
        Self {
            wall,
            wall_normals,
            shell,
            tet,
            wall_match,
            params,
        }
    }

    /// Assemble nodes and element sections.
    ///
    /// Node layout: the tet mesh nodes come first (so tet connectivity is
    /// reused verbatim), then one wall copy per wall node, then the
    /// interior column copies. The envelope copy of each column is the tet
    /// mesh node itself.
    pub fn assemble(&self) -> HybridMesh {
        let nwall = self.wall.nvertices();
        let layers = self.shell.num_layers;
        let fractions = layer_fractions(self.shell.growth_ratio, layers);

        let mut mesh = HybridMesh::new();
        mesh.nodes = self.tet.nodes.clone();

        let wall_base = mesh.nodes.len() as u32;
        for i in 0..nwall {
            mesh.nodes.push(self.wall.vertex(i as u32));
        }

        // interior column nodes
        let interior_base = mesh.nodes.len() as u32;
        for i in 0..nwall {
            let wall_p = self.wall.vertex(i as u32);
            let top = self.tet.nodes[self.wall_match.envelope_node[i] as usize];
            let column = if self.params.spline_normals {
                spline_column(
                    wall_p,
                    top,
                    self.wall_normals[i],
                    self.shell.directions[i],
                    &fractions,
                )
            } else {
                straight_column(wall_p, top, &fractions)
            };
            // skip the wall copy (k = 0) and the envelope copy (k = L)
            for q in &column[1..layers] {
                mesh.nodes.push(*q);
            }
        }

        let column_node = |i: usize, k: usize| -> u32 {
            if k == 0 {
                wall_base + i as u32
            } else if k == layers {
                self.wall_match.envelope_node[i]
            } else {
                interior_base + (i * (layers - 1) + k - 1) as u32
            }
        };

        // tet region
        let mut tets = Section::new("tetregion", ElementKind::Tet4, 0);
        for t in &self.tet.tets {
            tets.push_element(t);
        }
        mesh.add_section(tets);

        // prisms, bottom-up layer by layer
        let mut prisms = Section::new("prisms", ElementKind::Penta6, 0);
        for ti in 0..self.wall.ntriangles() {
            let [a, b, c] = self.wall.triangle(ti);
            for k in 0..layers {
                prisms.push_element(&[
                    column_node(a as usize, k),
                    column_node(b as usize, k),
                    column_node(c as usize, k),
                    column_node(a as usize, k + 1),
                    column_node(b as usize, k + 1),
                    column_node(c as usize, k + 1),
                ]);
            }
        }
        mesh.add_section(prisms);

        // wall boundary, one section per tag so patch identity survives
        let mut by_tag: BTreeMap<i32, Section> = BTreeMap::new();
        for ti in 0..self.wall.ntriangles() {
            let tag = self.wall.tag(ti);
            let section = by_tag.entry(tag).or_insert_with(|| {
                Section::new(format!("wall{}", tag), ElementKind::Tri3, tag)
            });
            let [a, b, c] = self.wall.triangle(ti);
            section.push_element(&[
                column_node(a as usize, 0),
                column_node(b as usize, 0),
                column_node(c as usize, 0),
            ]);
        }
        for (_, section) in by_tag {
            mesh.add_section(section);
        }

        // outer boundaries from the tet mesh (far-field and symmetry cap)
        let mut outer = Section::new("farfield", ElementKind::Tri3, NEARFIELD_TAG);
        for (tri, marker) in &self.tet.boundary_faces {
            if is_outer_marker(*marker) {
                outer.push_element(tri);
            }
        }
        if outer.nelements() > 0 {
            mesh.add_section(outer);
        }

        info!(
            nodes = mesh.nnodes(),
            tets = self.tet.ntets(),
            prisms = self.wall.ntriangles() * layers,
            "assembled hybrid mesh"
        );
        mesh
    }
}
