//! Media type module - the upload allow-list

/// Document formats accepted for extraction
///
/// This enum *is* the allow-list: a `MediaType` can only be constructed from
/// a MIME string or file extension that names one of these formats.
/// - Jpeg: `image/jpeg` (`.jpg`, `.jpeg`)
/// - Png: `image/png` (`.png`)
/// - Pdf: `application/pdf` (`.pdf`), sent to the model as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// JPEG image
    Jpeg,

    /// PNG image
    Png,

    /// PDF document
    Pdf,
}

impl MediaType {
    /// All accepted media types
    pub const ALL: [MediaType; 3] = [MediaType::Jpeg, MediaType::Png, MediaType::Pdf];

    /// Canonical MIME string
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Pdf => "application/pdf",
        }
    }

    /// Parse a declared MIME type
    ///
    /// Parameters after `;` are ignored and matching is case-insensitive.
    /// `image/jpg` is accepted as a common misspelling of `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaType::Jpeg),
            "image/png" => Some(MediaType::Png),
            "application/pdf" => Some(MediaType::Pdf),
            _ => None,
        }
    }

    /// Guess the media type from a file name's extension
    pub fn from_extension(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "pdf" => Some(MediaType::Pdf),
            _ => None,
        }
    }

    /// Whether this is an image format (as opposed to a document)
    pub fn is_image(&self) -> bool {
        matches!(self, MediaType::Jpeg | MediaType::Png)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_mime())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_mime(s).ok_or_else(|| format!("Unsupported media type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_round_trip() {
        for media_type in MediaType::ALL {
            assert_eq!(MediaType::from_mime(media_type.as_mime()), Some(media_type));
        }
    }

    #[test]
    fn test_mime_with_parameters_and_case() {
        assert_eq!(MediaType::from_mime("IMAGE/PNG"), Some(MediaType::Png));
        assert_eq!(
            MediaType::from_mime("application/pdf; charset=binary"),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::from_mime("image/jpg"), Some(MediaType::Jpeg));
    }

    #[test]
    fn test_rejects_unsupported_mime() {
        assert_eq!(MediaType::from_mime("text/plain"), None);
        assert_eq!(MediaType::from_mime("image/gif"), None);
        assert_eq!(MediaType::from_mime("application/octet-stream"), None);
        assert_eq!(MediaType::from_mime(""), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaType::from_extension("invoice.jpg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("scan.JPEG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("nota.fiscal.png"), Some(MediaType::Png));
        assert_eq!(MediaType::from_extension("invoice.pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_extension("notes.txt"), None);
        assert_eq!(MediaType::from_extension("no_extension"), None);
    }

    #[test]
    fn test_is_image() {
        assert!(MediaType::Jpeg.is_image());
        assert!(MediaType::Png.is_image());
        assert!(!MediaType::Pdf.is_image());
    }
}
