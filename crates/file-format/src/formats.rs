use std::path::Path;

/// Wall-mesh input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Stl,
    Cgns,
    Native,
    /// Dispatch by filename suffix, with a read-anything fallback.
    Generic,
}

impl InputFormat {
    /// Parse a configuration override like `InputFormat = stl`.
    pub fn from_key(key: &str) -> Self {
        match key.to_ascii_lowercase().as_str() {
            "stl" => Self::Stl,
            "cgns" => Self::Cgns,
            "msh" | "zml" | "native" => Self::Native,
            _ => Self::Generic,
        }
    }

    pub fn from_suffix(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("stl") => Self::Stl,
            Some("cgns") => Self::Cgns,
            Some("msh") | Some("zml") | Some("json") => Self::Native,
            _ => Self::Generic,
        }
    }
}

/// Bitmask of output formats for the final hybrid mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatSet(u32);

impl FormatSet {
    pub const NATIVE: FormatSet = FormatSet(1);
    pub const EDGE: FormatSet = FormatSet(2);
    pub const CGNS: FormatSet = FormatSet(4);
    pub const TAU: FormatSet = FormatSet(8);
    pub const SU2: FormatSet = FormatSet(16);

    pub fn empty() -> Self {
        FormatSet(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: FormatSet) {
        self.0 |= other.0;
    }

    pub fn contains(&self, other: FormatSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parse an `OutputFormat` value by substring, the way users actually
    /// write it ("zml edge", "su2,cgns", ...). Unknown words are ignored;
    /// an empty result falls back to native + EDGE.
    pub fn parse(value: &str) -> Self {
        let v = value.to_ascii_lowercase();
        let mut set = FormatSet::empty();
        if v.contains("edge") || v.contains("bmsh") {
            set.insert(Self::EDGE);
        }
        if v.contains("zml") || v.contains("native") || v.contains("json") {
            set.insert(Self::NATIVE);
        }
        if v.contains("cgns") {
            set.insert(Self::CGNS);
        }
        if v.contains("tau") {
            set.insert(Self::TAU);
        }
        if v.contains("su2") {
            set.insert(Self::SU2);
        }
        if set.is_empty() {
            set.insert(Self::NATIVE);
            set.insert(Self::EDGE);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_dispatch() {
        assert_eq!(InputFormat::from_suffix(Path::new("wing.stl")), InputFormat::Stl);
        assert_eq!(InputFormat::from_suffix(Path::new("wing.STL")), InputFormat::Stl);
        assert_eq!(InputFormat::from_suffix(Path::new("wing.msh")), InputFormat::Native);
        assert_eq!(InputFormat::from_suffix(Path::new("wing.dat")), InputFormat::Generic);
    }

    #[test]
    fn output_parse_accumulates_and_defaults() {
        let set = FormatSet::parse("zml edge su2");
        assert!(set.contains(FormatSet::NATIVE));
        assert!(set.contains(FormatSet::EDGE));
        assert!(set.contains(FormatSet::SU2));
        assert!(!set.contains(FormatSet::TAU));

        let fallback = FormatSet::parse("nonsense");
        assert!(fallback.contains(FormatSet::NATIVE));
        assert!(fallback.contains(FormatSet::EDGE));
    }
}
