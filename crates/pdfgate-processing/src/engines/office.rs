use super::command::{run, validate_binary_path};
use crate::converter::ensure_pdf;
use crate::{ConvertError, Converter};
use async_trait::async_trait;
use pdfgate_core::SourceFormat;

const INPUT_STEM: &str = "input";

/// Office document converter backed by LibreOffice in headless mode.
///
/// Each call gets its own user profile inside the scratch directory; concurrent
/// `soffice` processes sharing a profile block on its lock file.
pub struct LibreOfficeEngine {
    binary: String,
}

impl LibreOfficeEngine {
    pub fn new(binary: impl Into<String>) -> anyhow::Result<Self> {
        let binary = binary.into();
        validate_binary_path(&binary)?;
        Ok(Self { binary })
    }
}

#[async_trait]
impl Converter for LibreOfficeEngine {
    async fn convert(&self, input: &[u8], format: SourceFormat) -> Result<Vec<u8>, ConvertError> {
        if input.is_empty() {
            return Err(ConvertError::InvalidInput("document is empty".to_string()));
        }

        let workdir = tempfile::tempdir()?;
        let input_path = workdir
            .path()
            .join(format!("{}.{}", INPUT_STEM, format.extension()));
        let output_path = workdir.path().join(format!("{}.pdf", INPUT_STEM));
        let profile_dir = workdir.path().join("profile");
        tokio::fs::write(&input_path, input).await?;

        let args = vec![
            format!("-env:UserInstallation=file://{}", profile_dir.to_string_lossy()),
            "--headless".to_string(),
            "--norestore".to_string(),
            "--convert-to".to_string(),
            "pdf".to_string(),
            "--outdir".to_string(),
            workdir.path().to_string_lossy().to_string(),
            input_path.to_string_lossy().to_string(),
        ];
        run(&self.binary, &args, workdir.path(), "libreoffice").await?;

        // soffice exits 0 even when it could not load the input.
        let output = tokio::fs::read(&output_path).await.map_err(|_| {
            ConvertError::failed(format!(
                "libreoffice could not convert the {} document",
                format
            ))
        })?;
        ensure_pdf(output)
    }

    fn name(&self) -> &'static str {
        "libreoffice"
    }
}
