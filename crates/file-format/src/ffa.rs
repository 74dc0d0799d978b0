use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hybrid_mesh::{ElementKind, HybridMesh};

use crate::errors::ExportError;

/// Write the hybrid mesh in the FFA ASCII record format used by the EDGE
/// flow solver.
///
/// The file is one `unstr_grid_data` record containing the coordinate
/// block, one element group per volume section, and one boundary group
/// per Tri3 section. Record headers follow the FFA convention
/// `name, type, size, subrecords`.
pub fn write_ffa(path: &Path, mesh: &HybridMesh) -> Result<(), ExportError> {
    let io_err = |e: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);
    write_ffa_impl(&mut w, mesh).map_err(io_err)
}

fn write_ffa_impl(w: &mut impl Write, mesh: &HybridMesh) -> std::io::Result<()> {
    let volume_sections: Vec<_> = mesh
        .sections
        .iter()
        .filter(|s| s.kind != ElementKind::Tri3)
        .collect();
    let boundary_sections: Vec<_> = mesh
        .sections
        .iter()
        .filter(|s| s.kind == ElementKind::Tri3)
        .collect();

    let subrecords = 1 + volume_sections.len() + boundary_sections.len();
    writeln!(w, "unstr_grid_data, N, 0, {}", subrecords)?;

    writeln!(w, "coordinates, DF, {}, 3", mesh.nnodes())?;
    for p in &mesh.nodes {
        writeln!(w, "{:.16e} {:.16e} {:.16e}", p.x, p.y, p.z)?;
    }

    for section in volume_sections {
        let name = match section.kind {
            ElementKind::Tet4 => "element_group_tetra",
            ElementKind::Penta6 => "element_group_prism",
            ElementKind::Tri3 => unreachable!(),
        };
        let npe = section.kind.nodes_per_element();
        writeln!(w, "{}, IF, {}, {}", name, section.nelements(), npe)?;
        for i in 0..section.nelements() {
            let e = section.element(i);
            let ids: Vec<String> = e.iter().map(|v| (v + 1).to_string()).collect();
            writeln!(w, "{}", ids.join(" "))?;
        }
    }

    for section in boundary_sections {
        writeln!(w, "boundary_group, N, 0, 2")?;
        writeln!(w, "boundary_name, L, 1, 1")?;
        writeln!(w, "{}", section.name)?;
        writeln!(w, "bound_elem_group_tria, IF, {}, 3", section.nelements())?;
        for i in 0..section.nelements() {
            let e = section.element(i);
            writeln!(w, "{} {} {}", e[0] + 1, e[1] + 1, e[2] + 1)?;
        }
    }
    Ok(())
}
