use std::path::{Path, PathBuf};

use crate::error::VfsError;
use crate::storage::CursorStore;
use crate::transfer::partial_path;
use crate::vfs::{NodeAccessor, NodeKind, RemoteNode, resolve_entry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

const EXPORT_FORMATS: &[(&str, ExportFormat)] = &[
    (
        "document",
        ExportFormat {
            mime_type: "application/pdf",
            extension: ".pdf",
        },
    ),
    (
        "spreadsheet",
        ExportFormat {
            mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            extension: ".xlsx",
        },
    ),
    (
        "presentation",
        ExportFormat {
            mime_type: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            extension: ".pptx",
        },
    ),
];

/// Export format for a native document subtype, if one is supported.
pub fn export_format(subtype: &str) -> Option<ExportFormat> {
    EXPORT_FORMATS
        .iter()
        .find(|(name, _)| *name == subtype)
        .map(|(_, format)| *format)
}

/// Downloads the file `name` (a name or path relative to the cursor) and
/// returns where it was written.
///
/// `dest` may be an existing directory, which receives the file under its
/// remote name, or a file path. Native documents are exported and get the
/// export extension appended when missing. Bytes land in a `.partial` file
/// that is renamed into place once complete.
pub async fn download<A, C>(
    accessor: &A,
    cursor: &C,
    name: &str,
    dest: Option<&Path>,
    progress: &mut dyn FnMut(f64),
) -> Result<PathBuf, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
{
    let current = cursor.load();
    let node = resolve_entry(accessor, name, &current.current_folder_id).await?;

    let export = match &node.kind {
        NodeKind::Folder => return Err(VfsError::IsAFolder(node.name)),
        NodeKind::File => None,
        NodeKind::NativeDocument(subtype) => Some(
            export_format(subtype).ok_or_else(|| VfsError::UnsupportedExport(subtype.clone()))?,
        ),
    };

    let mut target = match dest {
        Some(dest) if dest.is_dir() => dest.join(&node.name),
        Some(dest) => dest.to_path_buf(),
        None => PathBuf::from(&node.name),
    };
    if let Some(format) = export {
        target = with_extension(target, format.extension);
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(&target);
    let written = write_partial(accessor, &node, export, &partial, progress).await;
    match written {
        Ok(bytes) => {
            tokio::fs::rename(&partial, &target).await?;
            tracing::info!(id = %node.id, bytes, target = %target.display(), "download complete");
            Ok(target)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(err)
        }
    }
}

async fn write_partial<A: NodeAccessor>(
    accessor: &A,
    node: &RemoteNode,
    export: Option<ExportFormat>,
    partial: &Path,
    progress: &mut dyn FnMut(f64),
) -> Result<u64, VfsError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let bytes = accessor
        .read_content(node, export.map(|f| f.mime_type), &mut file, progress)
        .await?;
    file.sync_all().await?;
    Ok(bytes)
}

fn with_extension(path: PathBuf, extension: &str) -> PathBuf {
    let has_extension = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(extension));
    if has_extension {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}
