//! Shell generation scenarios: the unit cube, the symmetric half-sphere,
//! and the concave cavity.

use proptest::prelude::*;

use shell_gen::{ShellBuilder, ShellParams};
use test_harness::assertions::*;
use test_harness::helpers::*;
use wall_mesh::{SymmetrySpec, WallGraph};

// ── Scenario 1: unit cube ───────────────────────────────────────────────

#[test]
fn cube_shell_grows_outward_along_averaged_normals() {
    let wall = unit_cube();
    let graph = WallGraph::build(&wall, None).unwrap();
    let params = ShellParams {
        first_layer_height: 0.02,
        growth_ratio: 1.3,
        num_layers: 4,
        // the cube's sharp corners would otherwise trigger the curvature
        // reduction; this scenario pins the plain growth
        curvature_scaling: 0.0,
        concavity_scaling: 0.0,
        ..Default::default()
    };
    let stack = params.stack_height(0.02);
    let shell = ShellBuilder::new(&wall, &graph, params).build();

    assert!(shell.infeasible.is_empty(), "cube rays must not invert");
    let envelope = shell.envelope(&wall);
    assert_envelope_connectivity(&wall, &envelope).unwrap();
    assert_manifold_preserved(&wall, &envelope).unwrap();
    assert_non_inversion(&wall, &envelope).unwrap();
    assert_monotone_columns(&wall, &shell).unwrap();

    // every corner is pushed outward from the cube center by roughly the
    // stack height (corner directions are averaged face normals)
    let center = prism_types::Point3d::new(0.5, 0.5, 0.5);
    for i in 0..wall.nvertices() {
        let r0 = wall.vertex(i as u32).distance_to(&center);
        let r1 = envelope.vertex(i as u32).distance_to(&center);
        let growth = r1 - r0;
        assert!(
            growth > 0.5 * stack && growth < 1.5 * stack,
            "corner {} grew {} for stack height {}",
            i,
            growth,
            stack
        );
    }
}

// ── Scenario 2: half-sphere with symmetry plane ─────────────────────────

#[test]
fn half_sphere_keeps_symmetry_nodes_in_plane() {
    let wall = half_sphere_wall(1.0, 3);
    let graph = WallGraph::build(&wall, Some(SymmetrySpec { y0: 0.0 })).unwrap();
    let params = ShellParams {
        first_layer_height: 0.005,
        num_layers: 4,
        ..Default::default()
    };
    let shell = ShellBuilder::new(&wall, &graph, params).build();
    let envelope = shell.envelope(&wall);

    assert_envelope_connectivity(&wall, &envelope).unwrap();
    assert_symmetry_preserved(&wall, &shell, &envelope, 0.0, 1e-9).unwrap();

    // the envelope is open exactly along the symmetry plane, like the wall
    let open_edges: Vec<_> = envelope
        .edge_use_counts()
        .into_iter()
        .filter(|&(_, c)| c == 1)
        .map(|(e, _)| e)
        .collect();
    assert!(!open_edges.is_empty());
    for (a, b) in open_edges {
        assert!(envelope.vertex(a).y.abs() < 1e-9);
        assert!(envelope.vertex(b).y.abs() < 1e-9);
    }
}

// ── Scenario 3: concave cavity ──────────────────────────────────────────

#[test]
fn dent_reduces_local_first_layer_heights() {
    let wall = dented_sphere_wall(1.0, 3, 0.15);
    let graph = WallGraph::build(&wall, None).unwrap();
    let params = ShellParams {
        first_layer_height: 0.01,
        growth_ratio: 1.25,
        num_layers: 6,
        ..Default::default()
    };
    let shell = ShellBuilder::new(&wall, &graph, params).build();

    // compare mean heights inside the dent cap vs the smooth far side
    let mut dent_sum = 0.0;
    let mut dent_n = 0usize;
    let mut far_sum = 0.0;
    let mut far_n = 0usize;
    for i in 0..wall.nvertices() {
        let dir = wall.vertex(i as u32).to_vec3();
        let x = dir.x / dir.length().max(1e-30);
        if x > 0.95 {
            dent_sum += shell.total_height[i];
            dent_n += 1;
        } else if x < -0.5 {
            far_sum += shell.total_height[i];
            far_n += 1;
        }
    }
    assert!(dent_n > 0 && far_n > 0);
    let dent_mean = dent_sum / dent_n as f64;
    let far_mean = far_sum / far_n as f64;
    assert!(
        dent_mean < far_mean,
        "dent heights {} should undercut smooth-side heights {}",
        dent_mean,
        far_mean
    );

    // the whole envelope still satisfies non-inversion
    let envelope = shell.envelope(&wall);
    assert_non_inversion(&wall, &envelope).unwrap();
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn stack_height_is_sum_of_layer_thicknesses(
        h1 in 1e-5f64..1.0,
        ratio in 1.0f64..2.0,
        layers in 1usize..12,
    ) {
        let params = ShellParams {
            first_layer_height: h1,
            growth_ratio: ratio,
            num_layers: layers,
            ..Default::default()
        };
        let mut sum = 0.0;
        for k in 0..layers {
            sum += h1 * ratio.powi(k as i32);
        }
        let total = params.stack_height(h1);
        prop_assert!((total - sum).abs() <= 1e-9 * sum.max(1e-30));
        // offsets are monotone in the layer index
        for k in 0..layers {
            prop_assert!(params.layer_offset(h1, k + 1) > params.layer_offset(h1, k));
        }
    }
}

proptest! {
    #[test]
    fn smoothing_never_escapes_the_field_range(seed in 0u64..1000) {
        let wall = sphere_wall(1.0, 1);
        let graph = WallGraph::build(&wall, None).unwrap();
        let mut field: Vec<f64> = (0..graph.nnodes())
            .map(|i| 0.5 + 0.5 * (((i as u64 * 2654435761 + seed) % 97) as f64 / 97.0))
            .collect();
        let lo = field.iter().cloned().fold(f64::MAX, f64::min);
        let hi = field.iter().cloned().fold(f64::MIN, f64::max);
        shell_gen::heights::smooth_field(&graph, &mut field, 5);
        for &v in &field {
            prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
        }
    }
}
