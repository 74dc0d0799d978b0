use std::fs;
use std::path::{Path, PathBuf};

use prism_types::Point3d;

use crate::error::TetError;

/// A tetrahedral mesh as read back from the external mesher: nodes, tets,
/// and the tagged boundary triangles.
#[derive(Debug, Clone, Default)]
pub struct TetMesh {
    pub nodes: Vec<Point3d>,
    pub tets: Vec<[u32; 4]>,
    /// Boundary triangles with their facet marker.
    pub boundary_faces: Vec<([u32; 3], i32)>,
}

impl TetMesh {
    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn ntets(&self) -> usize {
        self.tets.len()
    }

    /// Unique undirected edges over all tets.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        const TET_EDGES: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let mut edges = Vec::with_capacity(self.tets.len() * 6);
        for t in &self.tets {
            for &(i, j) in &TET_EDGES {
                let a = t[i];
                let b = t[j];
                edges.push((a.min(b), a.max(b)));
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }
}

/// Read the mesher output triple `<base>.node`, `<base>.ele`,
/// `<base>.face`. Handles both 0- and 1-based output numbering by
/// inspecting the first node index.
pub fn read_tetgen(base: &Path) -> Result<TetMesh, TetError> {
    let node_path = suffixed(base, "node");
    let ele_path = suffixed(base, "ele");
    let face_path = suffixed(base, "face");

    let (nodes, index_base) = read_nodes(&node_path)?;
    let tets = read_elements(&ele_path, index_base, nodes.len())?;
    let boundary_faces = read_faces(&face_path, index_base, nodes.len())?;

    Ok(TetMesh {
        nodes,
        tets,
        boundary_faces,
    })
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(n, l)| (n + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> TetError {
    TetError::MalformedOutput {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn read_nodes(path: &Path) -> Result<(Vec<Point3d>, u32), TetError> {
    let text = fs::read_to_string(path).map_err(|_| TetError::MissingOutput {
        path: path.to_path_buf(),
    })?;
    let mut lines = content_lines(&text);

    let (hline, header) = lines
        .next()
        .ok_or_else(|| malformed(path, 1, "empty node file"))?;
    let count: usize = header
        .split_whitespace()
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| malformed(path, hline, "bad node count"))?;

    let mut nodes = Vec::with_capacity(count);
    let mut index_base = 0u32;
    for k in 0..count {
        let (ln, line) = lines
            .next()
            .ok_or_else(|| malformed(path, hline, "truncated node list"))?;
        let mut tok = line.split_whitespace();
        let idx: u32 = tok
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| malformed(path, ln, "bad node index"))?;
        if k == 0 {
            index_base = idx;
            if index_base > 1 {
                return Err(malformed(path, ln, "node numbering must start at 0 or 1"));
            }
        }
        let mut coord = [0.0f64; 3];
        for c in coord.iter_mut() {
            *c = tok
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed(path, ln, "bad coordinate"))?;
        }
        nodes.push(Point3d::from_array(coord));
    }
    Ok((nodes, index_base))
}

fn read_elements(path: &Path, index_base: u32, nnodes: usize) -> Result<Vec<[u32; 4]>, TetError> {
    let text = fs::read_to_string(path).map_err(|_| TetError::MissingOutput {
        path: path.to_path_buf(),
    })?;
    let mut lines = content_lines(&text);

    let (hline, header) = lines
        .next()
        .ok_or_else(|| malformed(path, 1, "empty element file"))?;
    let mut tok = header.split_whitespace();
    let count: usize = tok
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| malformed(path, hline, "bad element count"))?;
    let nodes_per_tet: usize = tok.next().and_then(|t| t.parse().ok()).unwrap_or(4);
    if nodes_per_tet < 4 {
        return Err(malformed(path, hline, "expected 4-node tetrahedra"));
    }

    let mut tets = Vec::with_capacity(count);
    for _ in 0..count {
        let (ln, line) = lines
            .next()
            .ok_or_else(|| malformed(path, hline, "truncated element list"))?;
        let mut tok = line.split_whitespace().skip(1);
        let mut tet = [0u32; 4];
        for v in tet.iter_mut() {
            let raw: u32 = tok
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed(path, ln, "bad vertex index"))?;
            let idx = raw
                .checked_sub(index_base)
                .ok_or_else(|| malformed(path, ln, "vertex index below base"))?;
            if idx as usize >= nnodes {
                return Err(malformed(path, ln, "vertex index out of range"));
            }
            *v = idx;
        }
        tets.push(tet);
    }
    Ok(tets)
}

fn read_faces(
    path: &Path,
    index_base: u32,
    nnodes: usize,
) -> Result<Vec<([u32; 3], i32)>, TetError> {
    let text = fs::read_to_string(path).map_err(|_| TetError::MissingOutput {
        path: path.to_path_buf(),
    })?;
    let mut lines = content_lines(&text);

    let (hline, header) = lines
        .next()
        .ok_or_else(|| malformed(path, 1, "empty face file"))?;
    let mut tok = header.split_whitespace();
    let count: usize = tok
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| malformed(path, hline, "bad face count"))?;
    let has_marker: bool = tok
        .next()
        .and_then(|t| t.parse::<u32>().ok())
        .map(|m| m != 0)
        .unwrap_or(false);

    let mut faces = Vec::with_capacity(count);
    for _ in 0..count {
        let (ln, line) = lines
            .next()
            .ok_or_else(|| malformed(path, hline, "truncated face list"))?;
        let mut tok = line.split_whitespace().skip(1);
        let mut tri = [0u32; 3];
        for v in tri.iter_mut() {
            let raw: u32 = tok
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed(path, ln, "bad vertex index"))?;
            let idx = raw
                .checked_sub(index_base)
                .ok_or_else(|| malformed(path, ln, "vertex index below base"))?;
            if idx as usize >= nnodes {
                return Err(malformed(path, ln, "vertex index out of range"));
            }
            *v = idx;
        }
        let marker: i32 = if has_marker {
            tok.next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed(path, ln, "missing boundary marker"))?
        } else {
            0
        };
        faces.push((tri, marker));
    }
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(dir: &Path, base: &str, node: &str, ele: &str, face: &str) -> PathBuf {
        let stem = dir.join(base);
        fs::write(suffixed(&stem, "node"), node).unwrap();
        fs::write(suffixed(&stem, "ele"), ele).unwrap();
        fs::write(suffixed(&stem, "face"), face).unwrap();
        stem
    }

    #[test]
    fn reads_one_based_single_tet() {
        let dir = std::env::temp_dir().join(format!("ingest-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let stem = write_fixture(
            &dir,
            "single",
            "# comment\n4 3 0 0\n1 0.0 0.0 0.0\n2 1.0 0.0 0.0\n3 0.0 1.0 0.0\n4 0.0 0.0 1.0\n",
            "1 4 0\n1 1 2 3 4\n",
            "4 1\n1 1 2 3 -1\n2 1 2 4 1000005\n3 1 3 4 1000005\n4 2 3 4 1000005\n",
        );
        let mesh = read_tetgen(&stem).unwrap();
        assert_eq!(mesh.nnodes(), 4);
        assert_eq!(mesh.ntets(), 1);
        assert_eq!(mesh.tets[0], [0, 1, 2, 3]);
        assert_eq!(mesh.boundary_faces.len(), 4);
        assert_eq!(mesh.boundary_faces[1].1, 1000005);
        assert_eq!(mesh.edges().len(), 6);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reads_zero_based_numbering() {
        let dir = std::env::temp_dir().join(format!("ingest0-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let stem = write_fixture(
            &dir,
            "zero",
            "4 3 0 0\n0 0 0 0\n1 1 0 0\n2 0 1 0\n3 0 0 1\n",
            "1 4 0\n0 0 1 2 3\n",
            "1 0\n0 0 1 2\n",
        );
        let mesh = read_tetgen(&stem).unwrap();
        assert_eq!(mesh.tets[0], [0, 1, 2, 3]);
        assert_eq!(mesh.boundary_faces[0].1, 0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let dir = std::env::temp_dir().join(format!("ingest-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let stem = write_fixture(
            &dir,
            "bad",
            "2 3 0 0\n1 0 0 0\n2 1 0 0\n",
            "1 4 0\n1 1 2 3 4\n",
            "0 0\n",
        );
        assert!(matches!(
            read_tetgen(&stem),
            Err(TetError::MalformedOutput { .. })
        ));
        fs::remove_dir_all(&dir).ok();
    }
}
