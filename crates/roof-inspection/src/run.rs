use crate::{
    list_entries, AnalyzedImageRecord, InspectionError, InspectionResult, RoofInspector,
    VerdictPolicy,
};
use ai::ImageInput;
use anyhow::Context;
use futures::Stream;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
use uuid::Uuid;

pub type RecordStream = Pin<Box<dyn Stream<Item = InspectionResult<AnalyzedImageRecord>> + Send>>;

#[derive(Debug, Clone)]
pub struct InspectionSettings {
    pub image_dir: PathBuf,
    /// When set, a completed run writes all its records here as a JSON array.
    pub output_path: Option<PathBuf>,
    pub verdict_policy: VerdictPolicy,
}

/// Starts one processing run over `settings.image_dir`.
///
/// The directory is checked and listed before anything is sent to the model, so a
/// missing directory is returned here and no image is processed. The returned
/// stream yields one record per entry as soon as it is ready. The first error is
/// yielded as the last item: records already yielded stay valid, later entries
/// are never touched.
pub async fn start_run(
    settings: InspectionSettings,
    inspector: Arc<dyn RoofInspector>,
) -> InspectionResult<RecordStream> {
    let entries = list_entries(&settings.image_dir).await?;
    let run_id = Uuid::new_v4();

    tracing::info!(
        %run_id,
        "start processing {} entries in {}",
        entries.len(),
        settings.image_dir.display()
    );

    let stream = async_stream::stream! {
        let mut results: Vec<AnalyzedImageRecord> = Vec::with_capacity(entries.len());

        for entry in entries {
            match process_entry(run_id, &settings, inspector.as_ref(), &entry).await {
                Ok(record) => {
                    let record = record.not_before(results.last());
                    results.push(record.clone());
                    yield Ok(record);
                }
                Err(e) => {
                    tracing::error!(%run_id, "run aborted after {} images: {}", results.len(), e);
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(output_path) = &settings.output_path {
            if let Err(e) = write_results(output_path, &results).await {
                tracing::error!(%run_id, "{}", e);
                yield Err(e);
                return;
            }
            tracing::info!(%run_id, "results written to {}", output_path.display());
        }

        tracing::info!(%run_id, "finished processing {} images", results.len());
    };

    Ok(Box::pin(stream))
}

#[tracing::instrument(skip(settings, inspector, entry), fields(image_file = %entry.to_string_lossy()))]
async fn process_entry(
    run_id: Uuid,
    settings: &InspectionSettings,
    inspector: &dyn RoofInspector,
    entry: &OsStr,
) -> InspectionResult<AnalyzedImageRecord> {
    // the raw name opens the file, the lossy one is only for display
    let image_file = entry.to_string_lossy().into_owned();
    let image = ImageInput::load(settings.image_dir.join(entry))
        .await
        .map_err(|reason| InspectionError::Load {
            file: image_file.clone(),
            reason,
        })?;

    let response = inspector.inspect(&image).await?;

    Ok(AnalyzedImageRecord::new(
        image_file,
        response.with_policy(settings.verdict_policy),
    ))
}

async fn write_results(path: &Path, results: &[AnalyzedImageRecord]) -> InspectionResult<()> {
    let write = async {
        let json = serde_json::to_vec_pretty(results)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, json).await?;
        anyhow::Ok(())
    };

    write.await.map_err(|reason| InspectionError::Output {
        path: path.to_path_buf(),
        reason,
    })
}
