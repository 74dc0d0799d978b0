//! Mesh and configuration I/O.
//!
//! Readers for the wall triangulation (STL, native, generic suffix
//! dispatch), writers for the hybrid mesh (native, SU2, FFA/EDGE), the
//! key/value configuration parser, and the format selection logic.
//! CGNS and TAU selectors are recognized but rejected: this build carries
//! no bindings for those libraries.

pub mod config;
pub mod errors;
pub mod ffa;
pub mod formats;
pub mod native;
pub mod stl;
pub mod su2;

use std::path::Path;

use tracing::info;
use wall_mesh::TriMesh;

pub use config::Config;
pub use errors::{ExportError, LoadError};
pub use formats::{FormatSet, InputFormat};

/// Read a wall triangulation, dispatching on the explicit format override
/// or the filename suffix.
pub fn read_wall_mesh(path: &Path, format: InputFormat) -> Result<TriMesh, LoadError> {
    let format = match format {
        InputFormat::Generic => InputFormat::from_suffix(path),
        explicit => explicit,
    };
    let mesh = match format {
        InputFormat::Stl => stl::read_stl(path)?,
        InputFormat::Native => native::load_triangulation(path)?,
        InputFormat::Cgns => {
            return Err(LoadError::Unsupported {
                format: "cgns".into(),
            })
        }
        InputFormat::Generic => {
            // last resort: try STL first, then the native triangulation
            match stl::read_stl(path) {
                Ok(m) => m,
                Err(_) => native::load_triangulation(path)?,
            }
        }
    };
    info!(
        path = %path.display(),
        triangles = mesh.ntriangles(),
        "imported wall mesh"
    );
    Ok(mesh)
}
