use crate::config::IngestSettings;
use crate::error::DataSightError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One uploaded file, with its content inlined as a data URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(rename = "dataUrl")]
    pub data_url: String,
}

impl FileRecord {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: u64,
        data_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            data_url: data_url.into(),
        }
    }

    /// Build a record from raw bytes, encoding them as a base64 data URL.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type,
            data_url,
        }
    }

    /// Read and validate a file from disk.
    pub async fn from_path(path: &Path, settings: &IngestSettings) -> Result<Self, DataSightError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DataSightError::ingest(&name, e.to_string()))?;
        if !metadata.is_file() {
            return Err(DataSightError::ingest(&name, "not a regular file"));
        }
        if metadata.len() > settings.max_file_size {
            return Err(DataSightError::ingest(
                &name,
                format!(
                    "exceeds the maximum size limit of {}MB",
                    settings.max_file_size / 1024 / 1024
                ),
            ));
        }

        let mime_type = mime_for_path(path)
            .filter(|mime| settings.allowed_file_types.iter().any(|a| a == mime))
            .ok_or_else(|| {
                let shown = mime_for_path(path).unwrap_or("unknown");
                DataSightError::ingest(&name, format!("file type {} is not supported", shown))
            })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DataSightError::ingest(&name, e.to_string()))?;

        Ok(Self::from_bytes(name, mime_type, &bytes))
    }
}

/// Result of ingesting a batch: accepted files plus per-file rejections.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files: Vec<FileRecord>,
    pub rejected: Vec<DataSightError>,
}

/// Read every path, skipping (and reporting) files that fail validation.
pub async fn ingest_paths<P: AsRef<Path>>(paths: &[P], settings: &IngestSettings) -> IngestReport {
    let mut report = IngestReport::default();
    for path in paths {
        match FileRecord::from_path(path.as_ref(), settings).await {
            Ok(record) => report.files.push(record),
            Err(e) => {
                tracing::warn!("skipping upload: {}", e);
                report.rejected.push(e);
            }
        }
    }
    report
}

/// MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}
