//! The immutable description of one conversion request.

use crate::error::ConvertError;
use crate::format::{base_name, split_extension, FormatMapping, SupportedFormatMap};
use uuid::Uuid;

/// An uploaded document plus everything derived from its name.
///
/// Construction performs format resolution, so a `ConversionRequest` always
/// refers to a supported format: unsupported uploads are rejected before any
/// directory is created or any process is launched.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    id: Uuid,
    original_name: String,
    content: Vec<u8>,
    source_extension: &'static str,
    mapping: &'static FormatMapping,
}

impl ConversionRequest {
    /// Validate `file_name` against `formats` and capture the upload.
    pub fn new(
        file_name: impl Into<String>,
        content: Vec<u8>,
        formats: &SupportedFormatMap,
    ) -> Result<Self, ConvertError> {
        let original_name = file_name.into();
        let mapping = formats.resolve(&original_name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            original_name,
            content,
            source_extension: mapping.source,
            mapping,
        })
    }

    /// Opaque identifier used for the workspace prefix and in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The name exactly as the caller supplied it.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Final path component of the original name; used inside the workspace.
    pub fn file_name(&self) -> &str {
        base_name(&self.original_name)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        split_extension(self.file_name()).0
    }

    /// Lower-case source extension with the dot, e.g. `.doc`.
    pub fn source_extension(&self) -> &'static str {
        self.source_extension
    }

    pub fn mapping(&self) -> &'static FormatMapping {
        self.mapping
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Name the converted document is returned under: `<stem><target>`.
    pub fn output_name(&self) -> String {
        format!("{}{}", self.stem(), self.mapping.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> Result<ConversionRequest, ConvertError> {
        ConversionRequest::new(name, b"bytes".to_vec(), &SupportedFormatMap::standard())
    }

    #[test]
    fn derives_output_name_from_stem() {
        let r = request("report.doc").unwrap();
        assert_eq!(r.source_extension(), ".doc");
        assert_eq!(r.output_name(), "report.docx");
        assert_eq!(r.content(), b"bytes");
    }

    #[test]
    fn output_keeps_stem_case_and_lowercases_target() {
        let r = request("TEST.DOC").unwrap();
        assert_eq!(r.source_extension(), ".doc");
        assert_eq!(r.file_name(), "TEST.DOC");
        assert_eq!(r.output_name(), "TEST.docx");
    }

    #[test]
    fn strips_client_supplied_directories() {
        let r = request("../../tmp/evil.xls").unwrap();
        assert_eq!(r.original_name(), "../../tmp/evil.xls");
        assert_eq!(r.file_name(), "evil.xls");
        assert_eq!(r.output_name(), "evil.xlsx");
    }

    #[test]
    fn rejects_unsupported_names() {
        assert!(matches!(
            request("notes.txt"),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            request("document"),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn ids_are_unique() {
        let a = request("a.ppt").unwrap();
        let b = request("a.ppt").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
