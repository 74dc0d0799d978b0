use std::io::{self, Write};

use prism_types::Point3d;

use crate::mesh::{ElementKind, HybridMesh};

/// Signed volume of a tetrahedron.
pub fn tet_volume(a: Point3d, b: Point3d, c: Point3d, d: Point3d) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}

/// Corner-tet decomposition of a pentahedron with bottom (0,1,2) and top
/// (3,4,5). Every piece must have positive volume for the prism to be
/// untangled.
pub fn penta_tet_volumes(p: &[Point3d; 6]) -> [f64; 3] {
    [
        tet_volume(p[0], p[1], p[2], p[3]),
        tet_volume(p[1], p[2], p[3], p[4]),
        tet_volume(p[2], p[3], p[4], p[5]),
    ]
}

/// Total volume of a pentahedron via its decomposition.
pub fn penta_volume(p: &[Point3d; 6]) -> f64 {
    penta_tet_volumes(p).iter().sum()
}

/// Check every volume element for a positive Jacobian, writing one line
/// per offender to the diagnostic stream. Tangled elements are reported,
/// not fatal; a large count means the envelope parameters were too
/// aggressive.
pub fn count_negative_volumes(mesh: &HybridMesh, out: &mut dyn Write) -> io::Result<usize> {
    let mut count = 0usize;
    for section in &mesh.sections {
        match section.kind {
            ElementKind::Tet4 => {
                for i in 0..section.nelements() {
                    let e = section.element(i);
                    let v = tet_volume(
                        mesh.nodes[e[0] as usize],
                        mesh.nodes[e[1] as usize],
                        mesh.nodes[e[2] as usize],
                        mesh.nodes[e[3] as usize],
                    );
                    if v <= 0.0 {
                        count += 1;
                        writeln!(out, "{} tet {} volume {:e}", section.name, i, v)?;
                    }
                }
            }
            ElementKind::Penta6 => {
                for i in 0..section.nelements() {
                    let e = section.element(i);
                    let p = [
                        mesh.nodes[e[0] as usize],
                        mesh.nodes[e[1] as usize],
                        mesh.nodes[e[2] as usize],
                        mesh.nodes[e[3] as usize],
                        mesh.nodes[e[4] as usize],
                        mesh.nodes[e[5] as usize],
                    ];
                    let vols = penta_tet_volumes(&p);
                    if vols.iter().any(|&v| v <= 0.0) {
                        count += 1;
                        writeln!(
                            out,
                            "{} penta {} corner volumes {:e} {:e} {:e}",
                            section.name, i, vols[0], vols[1], vols[2]
                        )?;
                    }
                }
            }
            ElementKind::Tri3 => {}
        }
    }
    Ok(count)
}

/// Histogram of the prism side-face alignment quality.
///
/// Per prism, the quality is the mean cosine between the three side edges
/// and the bottom-face normal: 1 for perfectly orthogonal extrusion,
/// falling toward 0 as the prism shears. The histogram is written as one
/// `lower_bound count` line per bin.
pub fn prism_quality_sumcos(
    mesh: &HybridMesh,
    section_name: &str,
    bins: usize,
    out: &mut dyn Write,
) -> io::Result<()> {
    let section = match mesh.section(section_name) {
        Some(s) if s.kind == ElementKind::Penta6 => s,
        _ => return Ok(()),
    };
    let mut histogram = vec![0usize; bins.max(1)];
    for i in 0..section.nelements() {
        let e = section.element(i);
        let p: Vec<Point3d> = e.iter().map(|&v| mesh.nodes[v as usize]).collect();
        let n = (p[1] - p[0])
            .cross(&(p[2] - p[0]))
            .normalized_or(prism_types::Vec3::Z);
        let mut sum = 0.0;
        for k in 0..3 {
            if let Some(edge) = (p[k + 3] - p[k]).normalized() {
                sum += edge.dot(&n);
            }
        }
        let q = (sum / 3.0).clamp(0.0, 1.0);
        let bin = ((q * histogram.len() as f64) as usize).min(histogram.len() - 1);
        histogram[bin] += 1;
    }
    for (b, count) in histogram.iter().enumerate() {
        writeln!(
            out,
            "{:.4} {}",
            b as f64 / histogram.len() as f64,
            count
        )?;
    }
    Ok(())
}
