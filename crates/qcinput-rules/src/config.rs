/// How the `string` rule measures length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    /// UTF-8 byte count.
    #[default]
    Bytes,
    /// Unicode scalar value count.
    Chars,
}

impl LengthUnit {
    pub fn measure(self, s: &str) -> usize {
        match self {
            LengthUnit::Bytes => s.len(),
            LengthUnit::Chars => s.chars().count(),
        }
    }
}

/// Controls dispatcher behavior and resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum nesting depth of record arrays.
    pub max_depth: usize,
    /// Maximum number of elements accepted in a single array field.
    pub max_array_len: usize,
    /// Unit used by the `string` rule length constraints.
    pub length_unit: LengthUnit,
    /// When true, an absent non-optional typed `files` field is checked by
    /// the `files` rule instead of being skipped.
    pub strict_files: bool,
    /// Bytes read from each uploaded file when sniffing its content.
    pub max_sniff_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_array_len: 10_000,
            length_unit: LengthUnit::Bytes,
            strict_files: false,
            max_sniff_bytes: 16,
        }
    }
}

/// Controls loading of requirements descriptions from a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Maximum number of descriptions loaded from a directory.
    pub max_descriptions: usize,
    /// Maximum bytes allowed per description file.
    pub max_file_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_descriptions: 256,
            max_file_size: 256 * 1024,
        }
    }
}
