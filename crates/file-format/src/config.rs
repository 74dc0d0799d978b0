use std::collections::BTreeMap;
use std::path::Path;

use prism_types::{Point3d, Vec3};

use crate::errors::ConfigError;

/// Key/value configuration, parsed from `key = value` lines.
///
/// Lines starting with `#` (or the remainder of a line after `#`) are
/// comments. Keys are case-sensitive. Typed getters fall back to a
/// default when the key is absent but fail loudly on malformed values;
/// a silently ignored typo in an option name is bad enough, a silently
/// ignored value is worse.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for (n, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Malformed {
                line: n + 1,
                text: raw.to_string(),
            })?;
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.value(key).unwrap_or(default).to_string()
    }

    pub fn get_float(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| self.bad(key, v, "a number")),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| self.bad(key, v, "an integer")),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(self.bad(key, v, "a boolean")),
            },
        }
    }

    pub fn get_vec3(&self, key: &str, default: Vec3) -> Result<Vec3, ConfigError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => {
                let nums = self.parse_floats(key, v)?;
                if nums.len() != 3 {
                    return Err(self.bad(key, v, "three numbers"));
                }
                Ok(Vec3::new(nums[0], nums[1], nums[2]))
            }
        }
    }

    /// A whitespace-separated list of 3D points, e.g. hole markers.
    pub fn get_points(&self, key: &str) -> Result<Vec<Point3d>, ConfigError> {
        match self.value(key) {
            None => Ok(Vec::new()),
            Some(v) => {
                let nums = self.parse_floats(key, v)?;
                if nums.is_empty() || nums.len() % 3 != 0 {
                    return Err(self.bad(key, v, "a multiple of three numbers"));
                }
                Ok(nums
                    .chunks(3)
                    .map(|c| Point3d::new(c[0], c[1], c[2]))
                    .collect())
            }
        }
    }

    fn parse_floats(&self, key: &str, v: &str) -> Result<Vec<f64>, ConfigError> {
        v.split_whitespace()
            .map(|t| t.parse().map_err(|_| self.bad(key, v, "numbers")))
            .collect()
    }

    fn bad(&self, key: &str, value: &str, expected: &'static str) -> ConfigError {
        ConfigError::BadValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# prism layer setup
FirstLayerHeight = 0.02
NumPrismLayers = 4
Symmetry = yes
FarfieldCenter = 1.0 0 -2.5   # behind the wing
HolePosition = 0 0 0  1 1 1
TetgenOptions = -pq1.2V
";

    #[test]
    fn typed_getters_and_defaults() {
        let cfg = Config::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get_float("FirstLayerHeight", 1.0).unwrap(), 0.02);
        assert_eq!(cfg.get_int("NumPrismLayers", 0).unwrap(), 4);
        assert!(cfg.get_bool("Symmetry", false).unwrap());
        assert_eq!(cfg.get_float("FarfieldRadius", 100.0).unwrap(), 100.0);
        let c = cfg.get_vec3("FarfieldCenter", Vec3::ZERO).unwrap();
        assert_eq!(c.z, -2.5);
        assert_eq!(cfg.get_points("HolePosition").unwrap().len(), 2);
        assert_eq!(cfg.get_str("TetgenOptions", ""), "-pq1.2V");
    }

    #[test]
    fn malformed_lines_and_values_are_rejected() {
        assert!(matches!(
            Config::parse("just a line without equals"),
            Err(ConfigError::Malformed { line: 1, .. })
        ));
        let cfg = Config::parse("FarfieldRadius = ten").unwrap();
        assert!(matches!(
            cfg.get_float("FarfieldRadius", 1.0),
            Err(ConfigError::BadValue { .. })
        ));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let cfg = Config::parse("\n# only a comment\n\nPass = second # inline\n").unwrap();
        assert_eq!(cfg.get_str("Pass", "both"), "second");
        assert!(!cfg.has_key("only"));
    }
}
