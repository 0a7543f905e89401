use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

/// Input document type accepted for conversion.
///
/// HTML is rendered by the HTML engine; everything else goes through the office engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Html,
    Docx,
    Doc,
    Odt,
    Rtf,
    Txt,
    Xlsx,
    Xls,
    Ods,
    Pptx,
    Ppt,
    Odp,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 12] = [
        SourceFormat::Html,
        SourceFormat::Docx,
        SourceFormat::Doc,
        SourceFormat::Odt,
        SourceFormat::Rtf,
        SourceFormat::Txt,
        SourceFormat::Xlsx,
        SourceFormat::Xls,
        SourceFormat::Ods,
        SourceFormat::Pptx,
        SourceFormat::Ppt,
        SourceFormat::Odp,
    ];

    /// Canonical lowercase extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Html => "html",
            SourceFormat::Docx => "docx",
            SourceFormat::Doc => "doc",
            SourceFormat::Odt => "odt",
            SourceFormat::Rtf => "rtf",
            SourceFormat::Txt => "txt",
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Xls => "xls",
            SourceFormat::Ods => "ods",
            SourceFormat::Pptx => "pptx",
            SourceFormat::Ppt => "ppt",
            SourceFormat::Odp => "odp",
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, SourceFormat::Html)
    }

    /// Detect the format from a filename's extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl Display for SourceFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

impl FromStr for SourceFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "html" | "htm" | "text/html" => Ok(SourceFormat::Html),
            "docx" => Ok(SourceFormat::Docx),
            "doc" => Ok(SourceFormat::Doc),
            "odt" => Ok(SourceFormat::Odt),
            "rtf" => Ok(SourceFormat::Rtf),
            "txt" | "text" => Ok(SourceFormat::Txt),
            "xlsx" => Ok(SourceFormat::Xlsx),
            "xls" => Ok(SourceFormat::Xls),
            "ods" => Ok(SourceFormat::Ods),
            "pptx" => Ok(SourceFormat::Pptx),
            "ppt" => Ok(SourceFormat::Ppt),
            "odp" => Ok(SourceFormat::Odp),
            _ => Err(anyhow::anyhow!("Unsupported source format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_filename() {
        assert_eq!(SourceFormat::from_filename("a.docx"), Some(SourceFormat::Docx));
        assert_eq!(SourceFormat::from_filename("Report.HTM"), Some(SourceFormat::Html));
        assert_eq!(SourceFormat::from_filename("archive.tar.gz"), None);
        assert_eq!(SourceFormat::from_filename("no_extension"), None);
    }

    #[test]
    fn parses_declared_formats() {
        assert_eq!(".ODT".parse::<SourceFormat>().unwrap(), SourceFormat::Odt);
        assert_eq!("text/html".parse::<SourceFormat>().unwrap(), SourceFormat::Html);
        assert!("pdf".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn extension_round_trips_for_every_format() {
        for format in SourceFormat::ALL {
            assert_eq!(format.extension().parse::<SourceFormat>().unwrap(), format);
        }
    }
}
