use prism_types::{Point3d, Vec3};

/// Node positions of one prismatic column from the wall point to its
/// envelope copy.
///
/// The layer spacing follows the geometric progression of the shell; the
/// fractions are relative so the column respects wherever the optimizer
/// actually placed the envelope node.
pub fn straight_column(wall: Point3d, top: Point3d, fractions: &[f64]) -> Vec<Point3d> {
    fractions.iter().map(|&t| wall.lerp(&top, t)).collect()
}

/// Column along a cubic Hermite arc: leaves the wall along its normal and
/// arrives at the envelope along the extrusion direction. Used when bent
/// columns are requested; can produce tangled prisms on strongly curved
/// walls, which the quality check reports.
pub fn spline_column(
    wall: Point3d,
    top: Point3d,
    wall_normal: Vec3,
    direction: Vec3,
    fractions: &[f64],
) -> Vec<Point3d> {
    let chord = top - wall;
    let h = chord.length();
    let m0 = wall_normal * h;
    let m1 = direction * h;

    fractions
        .iter()
        .map(|&t| {
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            Point3d::ORIGIN
                + (wall.to_vec3() * h00 + m0 * h10 + top.to_vec3() * h01 + m1 * h11)
        })
        .collect()
}

/// Normalized layer fractions `t_k = offset(k) / offset(L)` for a
/// geometric progression with ratio `r` over `layers` sub-layers.
pub fn layer_fractions(ratio: f64, layers: usize) -> Vec<f64> {
    let total = if (ratio - 1.0).abs() < 1e-12 {
        layers as f64
    } else {
        (ratio.powi(layers as i32) - 1.0) / (ratio - 1.0)
    };
    (0..=layers)
        .map(|k| {
            let off = if (ratio - 1.0).abs() < 1e-12 {
                k as f64
            } else {
                (ratio.powi(k as i32) - 1.0) / (ratio - 1.0)
            };
            off / total
        })
        .collect()
}
