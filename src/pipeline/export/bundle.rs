use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::csv_render::{csv_file_name, table_to_csv};
use super::markdown::render_user_stories;
use super::projector::TabularExport;
use super::ExportError;
use crate::models::{ArtifactKind, StageName, StageResult};
use crate::pipeline::storage::{get_typed, load_stage_result, ArtifactStore};

/// What went into a bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleSummary {
    pub document_id: Uuid,
    pub path: PathBuf,
    pub entries: Vec<String>,
    pub size_bytes: u64,
}

/// Default bundle location: `<dir>/<file stem>-<short id>.tar.gz`.
pub fn default_bundle_path(dir: &Path, file_name: &str, document_id: &Uuid) -> PathBuf {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    let short = document_id.simple().to_string();
    dir.join(format!("{stem}-{}.tar.gz", &short[..8]))
}

/// Collect every stored artifact of a document as `(entry name, bytes)`.
/// Missing artifacts are skipped.
pub fn collect_bundle_entries(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
) -> Result<Vec<(String, Vec<u8>)>, ExportError> {
    let document = store
        .get_document(document_id)?
        .ok_or(ExportError::UnknownDocument(*document_id))?;

    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for kind in ArtifactKind::ALL {
        let Some(value) = store.get_artifact(document_id, kind)? else {
            continue;
        };
        entries.push((format!("{}.json", kind.as_str()), pretty(&value)?));

        if kind == ArtifactKind::UserStories {
            if let Some(result) = load_stage_result(store, document_id, StageName::UserStories)? {
                if let Some(stories) = result.payload.as_user_stories() {
                    let md = render_user_stories(&document.file_name, stories);
                    entries.push(("user_stories.md".to_string(), md.into_bytes()));
                }
            }
        }

        if kind == ArtifactKind::TabularExport {
            if let Some(export) =
                get_typed::<TabularExport>(store, document_id, ArtifactKind::TabularExport)?
            {
                for table in export.tables() {
                    entries.push((
                        format!("tabular_export/{}", csv_file_name(table)),
                        table_to_csv(table)?,
                    ));
                }
            }
        }
    }

    if entries.is_empty() {
        return Err(ExportError::NothingToExport(*document_id));
    }
    Ok(entries)
}

/// Write all artifacts of a document to a gzip-compressed tar archive.
pub fn export_bundle(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
    output_path: &Path,
) -> Result<BundleSummary, ExportError> {
    let entries = collect_bundle_entries(store, document_id)?;
    let mtime = chrono::Utc::now().timestamp().max(0) as u64;

    let mut tar_bytes = Vec::new();
    {
        let gz = flate2::write::GzEncoder::new(&mut tar_bytes, flate2::Compression::default());
        let mut tar = tar::Builder::new(gz);

        for (name, bytes) in &entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(mtime);
            tar.append_data(&mut header, name, bytes.as_slice())?;
        }

        tar.into_inner()?.finish()?;
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(&tar_bytes)?;
    file.flush()?;

    let size_bytes = std::fs::metadata(output_path)?.len();
    let names: Vec<String> = entries.into_iter().map(|(name, _)| name).collect();

    tracing::info!(
        document_id = %document_id,
        entries = names.len(),
        size_bytes,
        path = %output_path.display(),
        "Bundle exported"
    );

    Ok(BundleSummary {
        document_id: *document_id,
        path: output_path.to_path_buf(),
        entries: names,
        size_bytes,
    })
}

/// Human-readable JSON of one stored artifact, for `atf show`.
pub fn render_artifact(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
    kind: ArtifactKind,
) -> Result<Option<String>, ExportError> {
    if store.get_document(document_id)?.is_none() {
        return Err(ExportError::UnknownDocument(*document_id));
    }
    match store.get_artifact(document_id, kind)? {
        Some(value) => Ok(Some(serde_json::to_string_pretty(&value)?)),
        None => Ok(None),
    }
}

/// Stage outcome labels for every stored stage of a document.
pub fn stage_statuses(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
) -> Result<Vec<(StageName, Option<StageResult>)>, ExportError> {
    let mut out = Vec::with_capacity(StageName::ALL.len());
    for stage in StageName::ALL {
        out.push((stage, load_stage_result(store, document_id, stage)?));
    }
    Ok(out)
}

fn pretty(value: &Value) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::pipeline::export::projector::build_tabular_export;
    use crate::pipeline::storage::{put_typed, save_stage_result, MemoryArtifactStore};
    use std::io::Read;

    fn seeded_store() -> (MemoryArtifactStore, SourceDocument) {
        let store = MemoryArtifactStore::new();
        let doc = SourceDocument::new("shop.md", "Users buy books").unwrap();
        store.insert_document(&doc).unwrap();
        (store, doc)
    }

    fn read_archive(path: &Path) -> Vec<(String, String)> {
        let file = std::fs::File::open(path).unwrap();
        let gz = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(gz);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut body = String::new();
                entry.read_to_string(&mut body).unwrap();
                (name, body)
            })
            .collect()
    }

    #[test]
    fn bundle_contains_all_artifacts() {
        let (store, doc) = seeded_store();
        let stories = UserStoryCollection {
            user_stories: vec![UserStory {
                id: "US-001".into(),
                title: "Login".into(),
                ..Default::default()
            }],
            summary: None,
        };
        for stage in StageName::ALL {
            let payload = match stage {
                StageName::UserStories => Artifact::UserStories(stories.clone()),
                other => Artifact::empty(other),
            };
            save_stage_result(&store, &StageResult::success(doc.id, payload, "{}".into())).unwrap();
        }
        let export = build_tabular_export(
            doc.id,
            &TestCaseCollection::default(),
            &TestDataCollection::default(),
        );
        put_typed(&store, &doc.id, ArtifactKind::TabularExport, &export).unwrap();
        put_typed(&store, &doc.id, ArtifactKind::Coverage, &serde_json::json!({"user_stories_count": 1}))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = default_bundle_path(dir.path(), &doc.file_name, &doc.id);
        let summary = export_bundle(&store, &doc.id, &path).unwrap();
        assert!(summary.size_bytes > 0);

        let entries = read_archive(&path);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "analysis.json",
                "user_stories.json",
                "user_stories.md",
                "test_cases.json",
                "test_data.json",
                "coverage.json",
                "tabular_export.json",
                "tabular_export/test_cases.csv",
                "tabular_export/test_data.csv",
            ]
        );
        let md = &entries[2].1;
        assert!(md.contains("## US-001: Login"));
        let data_csv = &entries[8].1;
        assert_eq!(
            data_csv,
            "Test Data ID,Test Case ID,Data Set Name,Description,Test Data Values\n"
        );
    }

    #[test]
    fn missing_artifacts_are_skipped() {
        let (store, doc) = seeded_store();
        save_stage_result(
            &store,
            &StageResult::degraded(doc.id, StageName::Analysis, "prose".into()),
        )
        .unwrap();
        let entries = collect_bundle_entries(&store, &doc.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "analysis.json");
    }

    #[test]
    fn empty_document_has_nothing_to_export() {
        let (store, doc) = seeded_store();
        assert!(matches!(
            collect_bundle_entries(&store, &doc.id),
            Err(ExportError::NothingToExport(_))
        ));
    }

    #[test]
    fn unknown_document_rejected() {
        let store = MemoryArtifactStore::new();
        assert!(matches!(
            collect_bundle_entries(&store, &Uuid::new_v4()),
            Err(ExportError::UnknownDocument(_))
        ));
    }

    #[test]
    fn bundle_path_uses_stem_and_short_id() {
        let id = Uuid::parse_str("0123456789abcdef0123456789abcdef").unwrap();
        let path = default_bundle_path(Path::new("/tmp/out"), "reqs.final.md", &id);
        assert_eq!(path, PathBuf::from("/tmp/out/reqs.final-01234567.tar.gz"));
    }
}
