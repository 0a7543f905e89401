use crate::engines::{LibreOfficeEngine, WeasyprintEngine};
use crate::{ConvertError, Converter};
use async_trait::async_trait;
use pdfgate_core::{EngineConfig, SourceFormat};
use std::sync::Arc;

/// Routes each format to its engine: HTML to the HTML renderer, everything else to the
/// office converter.
pub struct DocumentConverter {
    html: Arc<dyn Converter>,
    office: Arc<dyn Converter>,
}

impl DocumentConverter {
    pub fn new(html: Arc<dyn Converter>, office: Arc<dyn Converter>) -> Self {
        Self { html, office }
    }

    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(WeasyprintEngine::new(config.weasyprint_path.clone())?),
            Arc::new(LibreOfficeEngine::new(config.libreoffice_path.clone())?),
        ))
    }

    fn engine_for(&self, format: SourceFormat) -> &dyn Converter {
        if format.is_html() {
            self.html.as_ref()
        } else {
            self.office.as_ref()
        }
    }
}

#[async_trait]
impl Converter for DocumentConverter {
    async fn convert(&self, input: &[u8], format: SourceFormat) -> Result<Vec<u8>, ConvertError> {
        self.engine_for(format).convert(input, format).await
    }

    fn name(&self) -> &'static str {
        "router"
    }
}
