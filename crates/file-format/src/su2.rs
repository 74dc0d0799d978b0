use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hybrid_mesh::{ElementKind, HybridMesh};

use crate::errors::ExportError;

// SU2 element type identifiers
const SU2_TRIANGLE: u32 = 5;
const SU2_TETRA: u32 = 10;
const SU2_PRISM: u32 = 13;

/// Write the hybrid mesh in SU2 text format: volume sections become the
/// element list, every Tri3 section becomes a boundary marker.
pub fn write_su2(path: &Path, mesh: &HybridMesh) -> Result<(), ExportError> {
    let io_err = |e: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);
    write_su2_impl(&mut w, mesh).map_err(io_err)
}

fn write_su2_impl(w: &mut impl Write, mesh: &HybridMesh) -> std::io::Result<()> {
    writeln!(w, "NDIME= 3")?;

    let nvol: usize = mesh
        .sections
        .iter()
        .filter(|s| s.kind != ElementKind::Tri3)
        .map(|s| s.nelements())
        .sum();
    writeln!(w, "NELEM= {}", nvol)?;
    for section in &mesh.sections {
        let su2_kind = match section.kind {
            ElementKind::Tet4 => SU2_TETRA,
            ElementKind::Penta6 => SU2_PRISM,
            ElementKind::Tri3 => continue,
        };
        for i in 0..section.nelements() {
            write!(w, "{}", su2_kind)?;
            for v in section.element(i) {
                write!(w, " {}", v)?;
            }
            writeln!(w)?;
        }
    }

    writeln!(w, "NPOIN= {}", mesh.nnodes())?;
    for p in &mesh.nodes {
        writeln!(w, "{:.16e} {:.16e} {:.16e}", p.x, p.y, p.z)?;
    }

    let markers: Vec<_> = mesh
        .sections
        .iter()
        .filter(|s| s.kind == ElementKind::Tri3)
        .collect();
    writeln!(w, "NMARK= {}", markers.len())?;
    for section in markers {
        writeln!(w, "MARKER_TAG= {}", section.name)?;
        writeln!(w, "MARKER_ELEMS= {}", section.nelements())?;
        for i in 0..section.nelements() {
            let e = section.element(i);
            writeln!(w, "{} {} {} {}", SU2_TRIANGLE, e[0], e[1], e[2])?;
        }
    }
    Ok(())
}
