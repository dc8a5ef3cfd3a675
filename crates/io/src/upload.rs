// Upload-to-workbook composition: validate, stage, ingest, reconcile, render

use serde::Serialize;
use tracing::info;

use payadj_recon::config::{AdjustmentConfig, XLSX_MIME};
use payadj_recon::model::{RunMeta, Summary};
use payadj_recon::{AdjustError, ReferenceStore};

use crate::staging::{staging_dir, StagedUpload};
use crate::{extension_of, ingest, xlsx, InputFormat, ALLOWED_EXTENSIONS};

pub const UPLOAD_COMPLETED: &str = "Batch adjustment upload completed";

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The generated artifact ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct FileDelivery {
    pub filename: String,
    pub mimetype: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub meta: RunMeta,
    pub summary: Summary,
    pub sheets: Vec<SheetInfo>,
    pub file: FileDelivery,
}

/// Run one uploaded file through the whole pipeline.
///
/// The upload is staged to disk for the duration of the call and removed on
/// every exit path. Any error means no artifact was produced.
pub async fn process_upload<S>(
    request: UploadRequest,
    config: &AdjustmentConfig,
    store: &S,
) -> Result<UploadResponse, AdjustError>
where
    S: ReferenceStore + ?Sized,
{
    let format = InputFormat::from_filename(&request.filename).ok_or_else(|| {
        AdjustError::validation(format!(
            "Unsupported file type '{}'; expected one of {}",
            extension_of(&request.filename).unwrap_or_default(),
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })?;
    if request.bytes.is_empty() {
        return Err(AdjustError::validation("File is empty or invalid"));
    }
    if request.bytes.len() as u64 > config.upload.max_bytes {
        return Err(AdjustError::validation(format!(
            "File exceeds the maximum upload size of {} bytes",
            config.upload.max_bytes
        )));
    }

    let extension = extension_of(&request.filename).unwrap_or_default();
    let dir = staging_dir(config.upload.staging_dir.as_deref());
    let staged = StagedUpload::write(&dir, &extension, &request.bytes)?;
    info!(filename = %request.filename, bytes = request.bytes.len(), ?format, "upload received");

    let path = staged.path().to_path_buf();
    let default_sheet = config.output.default_sheet.clone();
    let records = tokio::task::spawn_blocking(move || ingest(&path, format, &default_sheet))
        .await
        .map_err(|e| AdjustError::Io(format!("ingest task failed: {e}")))??;
    info!(records = records.len(), "input parsed");

    let result = payadj_recon::run(config, records, store).await?;
    let bytes = xlsx::write_workbook(&result.sheets, &config.output.default_sheet)?;

    let sheets = result
        .sheets
        .iter()
        .map(|s| SheetInfo { name: s.name.clone(), records: s.records.len() })
        .collect();

    drop(staged);

    Ok(UploadResponse {
        message: UPLOAD_COMPLETED.to_string(),
        meta: result.meta,
        summary: result.summary,
        sheets,
        file: FileDelivery {
            filename: config.output.filename.clone(),
            mimetype: XLSX_MIME.to_string(),
            bytes,
        },
    })
}
