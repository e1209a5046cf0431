//! Format resolution: legacy extension → OOXML extension + engine filter.
//!
//! The table is tiny and fixed, so it is a `const` slice wrapped in a `Copy`
//! handle that lives inside [`crate::config::ConverterConfig`]. Nothing in
//! the crate looks it up through global state.

use crate::error::ConvertError;
use serde::Serialize;

/// The family of document a mapping covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Word processor documents.
    Text,
    /// Spreadsheets.
    Spreadsheet,
    /// Slide decks.
    Presentation,
}

/// One supported legacy → modern conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatMapping {
    /// Lower-case source extension including the dot, e.g. `.doc`.
    pub source: &'static str,
    /// Lower-case target extension including the dot, e.g. `.docx`.
    pub target: &'static str,
    /// Value passed to the engine's `--convert-to`.
    pub filter: &'static str,
    pub kind: DocumentKind,
}

/// The three conversions this crate performs.
pub const STANDARD_MAPPINGS: [FormatMapping; 3] = [
    FormatMapping {
        source: ".doc",
        target: ".docx",
        filter: "docx",
        kind: DocumentKind::Text,
    },
    FormatMapping {
        source: ".xls",
        target: ".xlsx",
        filter: "xlsx",
        kind: DocumentKind::Spreadsheet,
    },
    FormatMapping {
        source: ".ppt",
        target: ".pptx",
        filter: "pptx",
        kind: DocumentKind::Presentation,
    },
];

/// Read-only source → target lookup table.
///
/// Safe for unsynchronised concurrent reads: it is `Copy` and points at
/// `'static` data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedFormatMap {
    mappings: &'static [FormatMapping],
}

impl Default for SupportedFormatMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl SupportedFormatMap {
    /// `.doc → .docx`, `.xls → .xlsx`, `.ppt → .pptx`.
    pub const fn standard() -> Self {
        Self {
            mappings: &STANDARD_MAPPINGS,
        }
    }

    pub fn mappings(&self) -> &'static [FormatMapping] {
        self.mappings
    }

    /// Supported source extensions in table order, e.g. `[".doc", ".xls", ".ppt"]`.
    pub fn source_extensions(&self) -> Vec<&'static str> {
        self.mappings.iter().map(|m| m.source).collect()
    }

    /// Look up an extension, with or without the leading dot, ignoring case.
    pub fn lookup(&self, extension: &str) -> Option<&'static FormatMapping> {
        let bare = extension.strip_prefix('.').unwrap_or(extension);
        if bare.is_empty() {
            return None;
        }
        self.mappings
            .iter()
            .find(|m| m.source[1..].eq_ignore_ascii_case(bare))
    }

    /// Resolve the mapping for an uploaded file name.
    ///
    /// # Errors
    /// [`ConvertError::UnsupportedFormat`] when the name has no extension or
    /// the extension is not in the table.
    pub fn resolve(&self, file_name: &str) -> Result<&'static FormatMapping, ConvertError> {
        let extension = extension_of(file_name);
        extension
            .as_deref()
            .and_then(|ext| self.lookup(ext))
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                file_name: file_name.to_string(),
                extension,
                supported: self.source_extensions(),
            })
    }
}

/// Final path component of an uploaded name.
///
/// Browsers on Windows may send `C:\Users\me\report.doc`, so both `/` and `\`
/// count as separators.
pub fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

/// Split a base name into `(stem, extension-without-dot)`.
///
/// Leading-dot names such as `.doc` are stems with no extension, and a
/// trailing dot (`report.`) yields no extension.
pub fn split_extension(base: &str) -> (&str, Option<&str>) {
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    }
}

/// Lower-case extension of `file_name` including the dot, e.g. `.doc`.
pub fn extension_of(file_name: &str) -> Option<String> {
    split_extension(base_name(file_name))
        .1
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_each_supported_extension() {
        let map = SupportedFormatMap::standard();
        assert_eq!(map.resolve("report.doc").unwrap().target, ".docx");
        assert_eq!(map.resolve("budget.xls").unwrap().target, ".xlsx");
        assert_eq!(map.resolve("deck.ppt").unwrap().target, ".pptx");
    }

    #[test]
    fn resolution_ignores_case() {
        let map = SupportedFormatMap::standard();
        assert_eq!(map.resolve("TEST.DOC").unwrap().target, ".docx");
        assert_eq!(map.resolve("Mixed.Xls").unwrap().target, ".xlsx");
        assert_eq!(map.resolve("deck.pPt").unwrap().filter, "pptx");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let map = SupportedFormatMap::standard();
        for name in ["notes.txt", "document.pdf", "already.docx", "archive.doc.zip"] {
            match map.resolve(name) {
                Err(ConvertError::UnsupportedFormat { supported, .. }) => {
                    assert_eq!(supported, vec![".doc", ".xls", ".ppt"]);
                }
                other => panic!("{name}: expected UnsupportedFormat, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_extension_is_rejected() {
        let map = SupportedFormatMap::standard();
        for name in ["document", "", ".doc", "report.", "dir.doc/"] {
            match map.resolve(name) {
                Err(ConvertError::UnsupportedFormat { extension, .. }) => {
                    assert_eq!(extension, None, "{name:?}");
                }
                other => panic!("{name:?}: expected UnsupportedFormat, got {other:?}"),
            }
        }
    }

    #[test]
    fn only_the_last_extension_counts() {
        let map = SupportedFormatMap::standard();
        assert_eq!(map.resolve("q3.final.xls").unwrap().source, ".xls");
        assert_eq!(extension_of("q3.final.xls").as_deref(), Some(".xls"));
    }

    #[test]
    fn directory_components_are_ignored() {
        assert_eq!(base_name("uploads/2024/report.doc"), "report.doc");
        assert_eq!(base_name(r"C:\Users\me\report.doc"), "report.doc");
        assert_eq!(base_name("../../etc/passwd.doc"), "passwd.doc");
        assert_eq!(base_name("plain.doc"), "plain.doc");
        assert_eq!(extension_of("folder.xls/notes"), None);
    }

    #[test]
    fn lookup_accepts_bare_or_dotted() {
        let map = SupportedFormatMap::standard();
        assert_eq!(map.lookup("doc"), map.lookup(".DOC"));
        assert!(map.lookup("").is_none());
        assert!(map.lookup(".").is_none());
    }

    #[test]
    fn each_source_maps_to_exactly_one_target() {
        let map = SupportedFormatMap::standard();
        let mut sources = map.source_extensions();
        sources.sort_unstable();
        sources.dedup();
        assert_eq!(sources.len(), map.mappings().len());
        for m in map.mappings() {
            assert_eq!(m.target, format!(".{}", m.filter));
            assert!(m.target.starts_with(m.source));
        }
    }
}
