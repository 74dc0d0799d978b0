use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use prism_types::{Aabb, Point3d};

/// Element types of the hybrid mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Tri3,
    Tet4,
    Penta6,
}

impl ElementKind {
    pub fn nodes_per_element(&self) -> usize {
        match self {
            ElementKind::Tri3 => 3,
            ElementKind::Tet4 => 4,
            ElementKind::Penta6 => 6,
        }
    }
}

/// A homogeneous group of elements sharing a name and an integer tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub kind: ElementKind,
    pub tag: i32,
    /// Flat node indices, `nodes_per_element` entries per element.
    pub elements: Vec<u32>,
}

impl Section {
    pub fn new(name: impl Into<String>, kind: ElementKind, tag: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            tag,
            elements: Vec::new(),
        }
    }

    pub fn nelements(&self) -> usize {
        self.elements.len() / self.kind.nodes_per_element()
    }

    pub fn element(&self, i: usize) -> &[u32] {
        let n = self.kind.nodes_per_element();
        &self.elements[i * n..(i + 1) * n]
    }

    pub fn push_element(&mut self, nodes: &[u32]) {
        debug_assert_eq!(nodes.len(), self.kind.nodes_per_element());
        self.elements.extend_from_slice(nodes);
    }
}

/// Recoverable conditions surfaced on the final mesh rather than raised
/// as errors, so downstream tools can detect them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshFlags {
    /// Wall nodes where shell generation could not satisfy non-inversion.
    pub envelope_infeasible: usize,
    /// The envelope optimizer stalled; the last feasible iterate was used.
    pub optimizer_failed: bool,
    /// Count of negative-volume elements in the final mesh.
    pub tangled_elements: usize,
}

impl MeshFlags {
    pub fn is_clean(&self) -> bool {
        self.envelope_infeasible == 0 && !self.optimizer_failed && self.tangled_elements == 0
    }
}

/// The assembled hybrid mesh: one node array, element sections, optional
/// per-node scalar fields, and the diagnostic flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HybridMesh {
    pub nodes: Vec<Point3d>,
    pub sections: Vec<Section>,
    pub fields: BTreeMap<String, Vec<f64>>,
    pub flags: MeshFlags,
}

impl HybridMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nelements(&self) -> usize {
        self.sections.iter().map(|s| s.nelements()).sum()
    }

    pub fn add_section(&mut self, section: Section) -> usize {
        self.sections.push(section);
        self.sections.len() - 1
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.nodes)
    }

    /// Attach a per-node scalar field; the length must match the node
    /// count.
    pub fn append_field(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.nodes.len());
        self.fields.insert(name.into(), values);
    }

    /// Highest node index referenced by any section, or None for an
    /// element-free mesh.
    pub fn max_referenced_node(&self) -> Option<u32> {
        self.sections
            .iter()
            .flat_map(|s| s.elements.iter().copied())
            .max()
    }
}
