use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{info, warn};

use envelope_opt::{EnvelopeOptimizer, OptParams, OptStatus};
use file_format::{ffa, native, su2, Config, FormatSet, InputFormat};
use hybrid_mesh::merge::merge_nodes;
use hybrid_mesh::quality::{count_negative_volumes, prism_quality_sumcos};
use hybrid_mesh::{match_envelope, HybridMesh, PrismAssembler, PrismParams, Section};
use prism_types::{Point3d, Vec3};
use shell_gen::{Shell, ShellBuilder, ShellParams};
use tet_bridge::farfield::{build_farfield, build_symmetric_farfield};
use tet_bridge::nearfield::{build_nearfield, NearfieldSpec};
use tet_bridge::options::TetgenOptions;
use tet_bridge::plc::write_smesh;
use tet_bridge::{read_tetgen, TetRefiner, TetgenRunner};
use wall_mesh::{SymmetrySpec, TriMesh, WallGraph};

const BOUNDARY_STEM: &str = "boundaries";

/// Which phases of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    First,
    Second,
    Both,
}

impl Phase {
    fn runs_first(self) -> bool {
        matches!(self, Phase::First | Phase::Both)
    }
    fn runs_second(self) -> bool {
        matches!(self, Phase::Second | Phase::Both)
    }
}

/// Everything derived from the wall mesh that both phases need. The
/// second pass recomputes this instead of persisting it; shell and
/// envelope generation are deterministic and cheap next to the mesher.
struct Prepared {
    wall: TriMesh,
    graph: WallGraph,
    shell: Shell,
    envelope: TriMesh,
    opt_status: Option<OptStatus>,
    symmetry: Option<SymmetrySpec>,
}

/// Machine-readable run summary written next to the output mesh.
#[derive(Debug, Serialize)]
struct RunSummary {
    nodes: usize,
    elements: usize,
    merged_nodes: usize,
    tangled_elements: usize,
    envelope_infeasible: usize,
    optimizer_converged: Option<bool>,
}

/// Top-level driver: configuration, phase selection, and the pipeline
/// from wall mesh to hybrid mesh.
pub struct FrontEnd {
    cfg: Config,
    workdir: PathBuf,
    phase: Phase,
    refinement_pass: bool,
}

impl FrontEnd {
    pub fn new(cfg: Config, workdir: PathBuf) -> anyhow::Result<Self> {
        let phase = match cfg.get_str("Pass", "both").to_ascii_lowercase().as_str() {
            "first" => Phase::First,
            "second" => Phase::Second,
            "both" => Phase::Both,
            other => bail!("unknown Pass value {:?} (expected first, second, or both)", other),
        };
        let refinement_pass = cfg.get_float("TetGrowthFactor", 0.0)? > 1.0;
        Ok(Self {
            cfg,
            workdir,
            phase,
            refinement_pass,
        })
    }

    pub fn run(&self, wall_path: &Path) -> anyhow::Result<()> {
        let prep = self.prepare(wall_path)?;

        let mut iter = 1u32;
        if self.phase.runs_first() {
            native::save_triangulation(&self.workdir.join("outermost.json"), &prep.envelope)
                .context("writing shell debug mesh")?;
            self.first_tetgen_pass(&prep)?;
            iter = self.generate_metric(1)?;
        } else if self.refinement_pass {
            iter = 2;
        }

        if self.phase.runs_second() {
            if self.refinement_pass {
                self.second_tetgen_pass(iter)?;
            }
            let mesh = self.generate_layer(&prep, iter)?;
            self.write_final(&mesh)?;
        }
        Ok(())
    }

    /// Read the wall, validate it, and generate the shell and envelope.
    fn prepare(&self, wall_path: &Path) -> anyhow::Result<Prepared> {
        let format = match self.cfg.value("InputFormat") {
            Some(key) => InputFormat::from_key(key),
            None => InputFormat::Generic,
        };
        let wall = file_format::read_wall_mesh(wall_path, format)
            .with_context(|| format!("reading wall mesh {}", wall_path.display()))?;

        let symmetry = if self.cfg.get_bool("Symmetry", false)? {
            Some(SymmetrySpec {
                y0: self.cfg.get_float("YPlaneCut", 0.0)?,
            })
        } else {
            None
        };

        let graph = WallGraph::build(&wall, symmetry).context("validating wall mesh")?;

        let params = self.shell_params()?;
        info!(
            nodes = wall.nvertices(),
            triangles = wall.ntriangles(),
            layers = params.num_layers,
            "generating shell"
        );
        let shell = ShellBuilder::new(&wall, &graph, params).build();
        if !shell.infeasible.is_empty() {
            warn!(
                nodes = shell.infeasible.len(),
                "shell generation left non-inversion violations"
            );
        }

        let (envelope, opt_status) = if self.cfg.get_bool("OptimizeEnvelope", true)? {
            let opt_params = OptParams {
                iterations: self.cfg.get_int("OptIterations", 20)? as usize,
                ..Default::default()
            };
            let (positions, status) = EnvelopeOptimizer::new(&wall, &shell, opt_params).run();
            let envelope =
                TriMesh::from_parts(positions, wall.triangles().to_vec(), wall.tags().to_vec());
            (envelope, Some(status))
        } else {
            (shell.envelope(&wall), None)
        };

        Ok(Prepared {
            wall,
            graph,
            shell,
            envelope,
            opt_status,
            symmetry,
        })
    }

    fn shell_params(&self) -> anyhow::Result<ShellParams> {
        let cfg = &self.cfg;
        let first_layer_height = cfg.get_float("FirstLayerHeight", 1e-3)?;
        if first_layer_height <= 0.0 {
            bail!("FirstLayerHeight must be positive");
        }
        let growth_ratio = cfg.get_float("LayerGrowthRatio", 1.3)?;
        if growth_ratio < 1.0 {
            bail!("LayerGrowthRatio must be at least 1");
        }
        let num_layers = cfg.get_int("NumPrismLayers", 4)?;
        if num_layers < 1 {
            bail!("NumPrismLayers must be at least 1");
        }
        Ok(ShellParams {
            first_layer_height,
            growth_ratio,
            num_layers: num_layers as usize,
            height_iterations: cfg.get_int("HeightIterations", 5)? as usize,
            normal_iterations: cfg.get_int("NormalIterations", 50)? as usize,
            max_crit_iterations: cfg.get_int("MaxCritIterations", 99)? as usize,
            laplace_iterations: cfg.get_int("LaplaceIterations", 5)? as usize,
            max_normal_angle: cfg.get_float("MaxNormalAngle", 30.0)?.to_radians(),
            curvature_scaling: cfg.get_float("CurvatureScaling", 1.0)?,
            concavity_scaling: cfg.get_float("ConcavityScaling", 2.0)?,
        })
    }

    fn runner(&self) -> TetgenRunner {
        TetgenRunner::new(self.cfg.get_str("TetgenPath", "tetgen"), &self.workdir)
    }

    fn tetgen_options(&self, with_nearfield: bool) -> anyhow::Result<TetgenOptions> {
        Ok(TetgenOptions {
            base: self.cfg.get_str(
                "TetgenOptions",
                TetgenOptions::default_base(with_nearfield),
            ),
            max_global_edge_length: self.cfg.get_float("MaxGlobalEdgeLength", 0.0)?,
            max_steiner_points: self.cfg.get_int("MaxSteinerPoints", 0)?.max(0) as u64,
        })
    }

    /// Build the outer boundaries, write the PLC, and run the mesher.
    fn first_tetgen_pass(&self, prep: &Prepared) -> anyhow::Result<()> {
        let cfg = &self.cfg;
        let radius = cfg.get_float("FarfieldRadius", 100.0)?;
        let subdivision = cfg.get_int("FarfieldSubdivision", 3)?.max(0) as u32;

        let holes = cfg.get_points("HolePosition")?;
        for h in &holes {
            info!(x = h.x, y = h.y, z = h.z, "interior volume marker point");
        }
        let default_center = holes.first().copied().unwrap_or(Point3d::ORIGIN);
        let center = Point3d::from_vec3(
            cfg.get_vec3("FarfieldCenter", default_center.to_vec3())?,
        );

        let farfield = match prep.symmetry {
            Some(spec) => {
                let rim = envelope_symmetry_rim(&prep.envelope);
                build_symmetric_farfield(center, radius, subdivision, spec.y0, &rim)
            }
            None => build_farfield(center, radius, subdivision),
        };

        let nearfield_spec = NearfieldSpec {
            edge_length: cfg.get_float("NearfieldEdgeLength", 0.0)?,
            size_factor: cfg.get_float("NearfieldSize", 3.5)?,
            center: cfg
                .value("NearfieldCenter")
                .map(|_| cfg.get_vec3("NearfieldCenter", Vec3::ZERO))
                .transpose()?
                .map(Point3d::from_vec3),
            semi_axes: cfg
                .value("NearfieldSemiAxes")
                .map(|_| cfg.get_vec3("NearfieldSemiAxes", Vec3::ZERO))
                .transpose()?,
        };
        let nearfield = build_nearfield(&nearfield_spec, &prep.envelope)?;
        let with_nearfield = nearfield.is_some();

        let options = self.tetgen_options(with_nearfield)?;
        let opts = options.first_pass();
        if with_nearfield && !opts.contains('a') {
            warn!("mesher will not refine the nearfield; add 'a' to TetgenOptions");
        }

        let smesh = self.workdir.join(format!("{}.smesh", BOUNDARY_STEM));
        write_smesh(
            &smesh,
            &prep.envelope,
            &farfield,
            nearfield.as_ref().map(|nf| &nf.mesh),
            &holes,
            prep.symmetry,
        )?;

        let runner = self.runner();
        runner.invoke(&opts, &format!("{}.smesh", BOUNDARY_STEM))?;
        runner.expect_outputs(BOUNDARY_STEM, 1)?;
        Ok(())
    }

    /// Compute the edge-length metric from the first-pass tet mesh; the
    /// returned iteration number selects which mesher output the second
    /// pass consumes.
    fn generate_metric(&self, iter: u32) -> anyhow::Result<u32> {
        let mtr = self.workdir.join(format!("{}.{}.mtr", BOUNDARY_STEM, iter));
        // a stale metric file would redirect the refinement pass
        let _ = std::fs::remove_file(&mtr);

        let growth = self.cfg.get_float("TetGrowthFactor", 0.0)?;
        if growth <= 1.0 {
            return Ok(iter);
        }

        let base = self.workdir.join(format!("{}.{}", BOUNDARY_STEM, iter));
        let tet = read_tetgen(&base).context("reading first-pass mesher output")?;

        let refiner = TetRefiner::new(
            growth,
            self.cfg.get_int("MetricIterations", 8)? as usize,
        );
        let lengths = refiner.edge_lengths(&tet);
        refiner.write_metric_file(&mtr, &lengths)?;

        // debug copy of the first pass with the target lengths attached
        let mut debug_mesh = HybridMesh::new();
        debug_mesh.nodes = tet.nodes.clone();
        let mut tets = Section::new("tetregion", hybrid_mesh::ElementKind::Tet4, 0);
        for t in &tet.tets {
            tets.push_element(t);
        }
        debug_mesh.add_section(tets);
        debug_mesh.append_field("TargetEdgeLengths", lengths);
        native::save_hybrid(&self.workdir.join("firstpass.json"), &debug_mesh)
            .context("writing first-pass debug mesh")?;

        Ok(iter + 1)
    }

    /// Metric-driven refinement: re-run the mesher on the previous output.
    fn second_tetgen_pass(&self, final_iter: u32) -> anyhow::Result<()> {
        let options = self.tetgen_options(false)?;
        let runner = self.runner();
        runner.invoke(
            &options.refine_pass(),
            &format!("{}.{}", BOUNDARY_STEM, final_iter - 1),
        )?;
        runner.expect_outputs(BOUNDARY_STEM, final_iter)?;
        Ok(())
    }

    /// Read the tet mesh back, stitch the prism layer in, and diagnose.
    fn generate_layer(&self, prep: &Prepared, iter: u32) -> anyhow::Result<HybridMesh> {
        let base = self.workdir.join(format!("{}.{}", BOUNDARY_STEM, iter));
        let runner = self.runner();
        runner.expect_outputs(BOUNDARY_STEM, iter)?;
        let tet = read_tetgen(&base).context("reading mesher output")?;
        info!(nodes = tet.nnodes(), tets = tet.ntets(), "read tet mesh");

        let wall_match = match_envelope(&tet, &prep.wall, &prep.envelope)?;

        let spline = self.cfg.get_bool("SplineNormals", false)?;
        let mut mesh = PrismAssembler::new(
            &prep.wall,
            prep.graph.normals(),
            &prep.shell,
            &tet,
            &wall_match,
            PrismParams {
                spline_normals: spline,
            },
        )
        .assemble();

        mesh.flags.envelope_infeasible = prep.shell.infeasible.len();
        mesh.flags.optimizer_failed = prep
            .opt_status
            .as_ref()
            .map(|s| !s.converged)
            .unwrap_or(false);

        let sumcos = File::create(self.workdir.join("sumcos.txt"))?;
        prism_quality_sumcos(&mesh, "prisms", 15, &mut BufWriter::new(sumcos))?;

        let tol = 1e-9 * mesh.bounding_box().diagonal().max(1.0);
        let merged = merge_nodes(&mut mesh, tol);
        info!(merged, nodes = mesh.nnodes(), "final mesh node count");

        let diag_path = self.workdir.join("diagnose.txt");
        let diag = File::create(&diag_path)?;
        let tangled = count_negative_volumes(&mesh, &mut BufWriter::new(diag))?;
        mesh.flags.tangled_elements = tangled;
        if tangled > 0 {
            warn!(
                tangled,
                list = %diag_path.display(),
                "tangled volume elements detected"
            );
            if spline {
                warn!("consider disabling bent normals (SplineNormals = false)");
            }
        }

        let summary = RunSummary {
            nodes: mesh.nnodes(),
            elements: mesh.nelements(),
            merged_nodes: merged,
            tangled_elements: tangled,
            envelope_infeasible: mesh.flags.envelope_infeasible,
            optimizer_converged: prep.opt_status.as_ref().map(|s| s.converged),
        };
        let summary_json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(self.workdir.join("summary.json"), summary_json)?;

        Ok(mesh)
    }

    /// Write the hybrid mesh in every requested format.
    fn write_final(&self, mesh: &HybridMesh) -> anyhow::Result<()> {
        let formats = FormatSet::parse(&self.cfg.get_str("OutputFormat", ""));
        if formats.contains(FormatSet::CGNS) {
            bail!("OutputFormat cgns is not supported by this build");
        }
        if formats.contains(FormatSet::TAU) {
            bail!("OutputFormat tau is not supported by this build");
        }

        let basename = self.cfg.get_str("OutputBasename", "hybrid");
        if formats.contains(FormatSet::NATIVE) {
            let path = self.workdir.join(format!("{}.json", basename));
            native::save_hybrid(&path, mesh)?;
            info!(path = %path.display(), "wrote native mesh");
        }
        if formats.contains(FormatSet::EDGE) {
            let path = self.workdir.join(format!("{}.bmsh", basename));
            ffa::write_ffa(&path, mesh)?;
            info!(path = %path.display(), "wrote EDGE mesh");
        }
        if formats.contains(FormatSet::SU2) {
            let path = self.workdir.join(format!("{}.su2", basename));
            su2::write_su2(&path, mesh)?;
            info!(path = %path.display(), "wrote SU2 mesh");
        }
        Ok(())
    }
}

/// The envelope's closed boundary loop on the symmetry plane, longest
/// first when the surface has several.
fn envelope_symmetry_rim(envelope: &TriMesh) -> Vec<Point3d> {
    let mut loops = envelope.boundary_loops();
    loops.sort_by_key(|l| std::cmp::Reverse(l.len()));
    match loops.into_iter().next() {
        Some(ring) => ring.into_iter().map(|i| envelope.vertex(i)).collect(),
        None => Vec::new(),
    }
}
