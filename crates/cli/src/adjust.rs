//! `payadj run`, `payadj template`, `payadj validate`.

use std::path::PathBuf;

use base64::Engine as _;
use serde::Serialize;

use payadj_io::template::{template_workbook, TEMPLATE_FILENAME};
use payadj_io::upload::SheetInfo;
use payadj_io::{process_upload, SqliteStore, UploadRequest};
use payadj_recon::model::{RunMeta, Summary};

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::settings::{load_config, resolve_config_path};
use crate::CliError;

/// `--json` success payload.
#[derive(Serialize)]
struct RunOutput<'a> {
    success: bool,
    message: &'a str,
    meta: &'a RunMeta,
    summary: &'a Summary,
    sheets: &'a [SheetInfo],
    file: FileOutput<'a>,
}

#[derive(Serialize)]
struct FileOutput<'a> {
    filename: &'a str,
    mimetype: &'a str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_base64: Option<String>,
}

pub async fn cmd_run(
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    json_output: bool,
    inline: bool,
) -> Result<(), CliError> {
    let config_path = resolve_config_path(config)?;
    let (config, base_dir) = load_config(&config_path)?;
    let store = SqliteStore::from_config(&config, &base_dir)?;

    let bytes = std::fs::read(&input)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", input.display())))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::usage(format!("not a file: {}", input.display())))?;

    let response = process_upload(UploadRequest { filename, bytes }, &config, &store).await?;

    let out_path = output.unwrap_or_else(|| PathBuf::from(&response.file.filename));
    std::fs::write(&out_path, &response.file.bytes)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", out_path.display())))?;

    if json_output {
        let payload = RunOutput {
            success: true,
            message: &response.message,
            meta: &response.meta,
            summary: &response.summary,
            sheets: &response.sheets,
            file: FileOutput {
                filename: &response.file.filename,
                mimetype: &response.file.mimetype,
                path: out_path.display().to_string(),
                content_base64: inline.then(|| {
                    base64::engine::general_purpose::STANDARD.encode(&response.file.bytes)
                }),
            },
        };
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    // Human summary to stderr
    let s = &response.summary;
    eprintln!(
        "{}: {} unique, {} duplicates, {} inactive, {} uploaded, {} unmapped, {} unresolved",
        response.message,
        s.total_unique_records,
        s.duplicates,
        s.inactive,
        s.uploaded,
        s.unmapped,
        s.unresolved,
    );
    for gap in &s.failures {
        eprintln!("  payclass '{}': {}", gap.payclass, gap.reason);
    }
    eprintln!("wrote {}", out_path.display());

    Ok(())
}

pub fn cmd_template(output: Option<PathBuf>) -> Result<(), CliError> {
    let bytes = template_workbook()?;
    let path = output.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILENAME));
    std::fs::write(&path, bytes)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let config_path = resolve_config_path(config)?;
    let (config, base_dir) = load_config(&config_path)?;
    SqliteStore::from_config(&config, &base_dir)?;

    let missing: Vec<String> = config
        .stores
        .iter()
        .map(|(id, store)| (id, base_dir.join(&store.path)))
        .filter(|(_, path)| !path.is_file())
        .map(|(id, path)| format!("{id} ({})", path.display()))
        .collect();
    if !missing.is_empty() {
        return Err(CliError {
            code: EXIT_INVALID_CONFIG,
            kind: "config".into(),
            message: format!("store file(s) not found: {}", missing.join(", ")),
            hint: Some("store paths resolve relative to the config file".into()),
            details: Vec::new(),
        });
    }

    eprintln!(
        "{}: ok ({} payclasses, {} stores)",
        config.name,
        config.payclasses.len(),
        config.stores.len()
    );
    Ok(())
}
