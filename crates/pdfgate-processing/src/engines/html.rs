use super::command::{run, validate_binary_path};
use crate::converter::ensure_pdf;
use crate::{ConvertError, Converter};
use async_trait::async_trait;
use pdfgate_core::SourceFormat;

const INPUT_NAME: &str = "input.html";
const OUTPUT_NAME: &str = "output.pdf";

/// HTML renderer backed by the `weasyprint` CLI.
pub struct WeasyprintEngine {
    binary: String,
}

impl WeasyprintEngine {
    pub fn new(binary: impl Into<String>) -> anyhow::Result<Self> {
        let binary = binary.into();
        validate_binary_path(&binary)?;
        Ok(Self { binary })
    }
}

#[async_trait]
impl Converter for WeasyprintEngine {
    async fn convert(&self, input: &[u8], format: SourceFormat) -> Result<Vec<u8>, ConvertError> {
        if !format.is_html() {
            return Err(ConvertError::InvalidInput(format!(
                "weasyprint cannot render {} documents",
                format
            )));
        }
        if input.is_empty() {
            return Err(ConvertError::InvalidInput("HTML document is empty".to_string()));
        }

        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join(INPUT_NAME);
        let output_path = workdir.path().join(OUTPUT_NAME);
        tokio::fs::write(&input_path, input).await?;

        let args = vec![
            input_path.to_string_lossy().to_string(),
            output_path.to_string_lossy().to_string(),
        ];
        run(&self.binary, &args, workdir.path(), "weasyprint").await?;

        let output = tokio::fs::read(&output_path).await.map_err(|_| {
            ConvertError::failed("weasyprint finished without writing a document")
        })?;
        ensure_pdf(output)
    }

    fn name(&self) -> &'static str {
        "weasyprint"
    }
}
