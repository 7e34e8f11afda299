use std::path::{Path, PathBuf};

use crate::error::VfsError;
use crate::storage::CursorStore;
use crate::vfs::{NodeAccessor, RemoteNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// The uploaded file, or the folder created for an uploaded directory.
    pub root: RemoteNode,
    pub files: usize,
    pub folders: usize,
}

/// Uploads a local file or directory into the cursor folder.
///
/// Directories are mirrored depth-first: the remote folder is created, then
/// each entry in name order. A failure part way leaves what was already
/// uploaded in place. `progress` receives the local file being sent and its
/// completed fraction.
pub async fn upload<A, C>(
    accessor: &A,
    cursor: &C,
    local: &Path,
    progress: &mut dyn FnMut(&Path, f64),
) -> Result<UploadReport, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
{
    let metadata = tokio::fs::metadata(local)
        .await
        .map_err(|_| VfsError::InvalidLocalPath(local.to_path_buf()))?;
    let parent_id = cursor.load().current_folder_id;

    if metadata.is_file() {
        let node = upload_file(accessor, local, &parent_id, progress).await?;
        Ok(UploadReport {
            root: node,
            files: 1,
            folders: 0,
        })
    } else if metadata.is_dir() {
        // `.` and `..` have no file name of their own.
        let name = match local_name(local) {
            Ok(name) => name,
            Err(_) => local_name(&tokio::fs::canonicalize(local).await?)?,
        };
        let mut report = UploadReport {
            root: accessor.create_folder(&name, &parent_id).await?,
            files: 0,
            folders: 1,
        };
        let folder_id = report.root.id.clone();
        upload_dir_contents(accessor, local, &folder_id, &mut report, progress).await?;
        Ok(report)
    } else {
        Err(VfsError::InvalidLocalPath(local.to_path_buf()))
    }
}

async fn upload_file<A: NodeAccessor>(
    accessor: &A,
    local: &Path,
    parent_id: &str,
    progress: &mut dyn FnMut(&Path, f64),
) -> Result<RemoteNode, VfsError> {
    let name = local_name(local)?;
    let node = accessor
        .write_content(&name, parent_id, local, &mut |fraction: f64| progress(local, fraction))
        .await?;
    tracing::debug!(local = %local.display(), id = %node.id, "uploaded file");
    Ok(node)
}

async fn upload_dir_contents<A: NodeAccessor>(
    accessor: &A,
    dir: &Path,
    folder_id: &str,
    report: &mut UploadReport,
    progress: &mut dyn FnMut(&Path, f64),
) -> Result<(), VfsError> {
    for entry in sorted_entries(dir).await? {
        let file_type = tokio::fs::metadata(&entry).await?;
        if file_type.is_dir() {
            let folder = accessor
                .create_folder(&local_name(&entry)?, folder_id)
                .await?;
            report.folders += 1;
            Box::pin(upload_dir_contents(
                accessor, &entry, &folder.id, report, progress,
            ))
            .await?;
        } else if file_type.is_file() {
            upload_file(accessor, &entry, folder_id, progress).await?;
            report.files += 1;
        } else {
            tracing::warn!(path = %entry.display(), "skipping entry that is neither file nor directory");
        }
    }
    Ok(())
}

async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, VfsError> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn local_name(path: &Path) -> Result<String, VfsError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| VfsError::InvalidLocalPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCursorStore;
    use crate::vfs::NodeKind;
    use crate::vfs::fake::FakeDrive;
    use tempfile::tempdir;

    #[tokio::test]
    async fn uploads_single_file_into_cursor_folder() {
        let drive = FakeDrive::new();
        drive.add_folder("f1", "Docs", "root");
        let cursor = MemoryCursorStore::new();
        cursor.set_current_folder("f1", "/Docs").unwrap();
        let dir = tempdir().unwrap();
        let local = dir.path().join("notes.txt");
        std::fs::write(&local, b"hello").unwrap();
        let mut fractions = Vec::new();

        let report = upload(&drive, &cursor, &local, &mut |_: &Path, f: f64| fractions.push(f))
            .await
            .unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.root.primary_parent(), Some("f1"));
        assert_eq!(drive.content(&report.root.id).unwrap(), b"hello");
        assert_eq!(fractions.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn uploads_folder_recursively() {
        let drive = FakeDrive::new();
        let cursor = MemoryCursorStore::new();
        let dir = tempdir().unwrap();
        let proj = dir.path().join("proj");
        std::fs::create_dir_all(proj.join("sub")).unwrap();
        std::fs::write(proj.join("a.txt"), b"a").unwrap();
        std::fs::write(proj.join("sub/b.txt"), b"b").unwrap();

        let report = upload(&drive, &cursor, &proj, &mut |_: &Path, _: f64| {})
            .await
            .unwrap();

        assert_eq!(drive.node_count(), 4);
        assert_eq!((report.files, report.folders), (2, 2));
        let remote_proj = drive.child_named("root", "proj").unwrap();
        assert_eq!(remote_proj.kind, NodeKind::Folder);
        assert!(drive.child_named(&remote_proj.id, "a.txt").is_some());
        let sub = drive.child_named(&remote_proj.id, "sub").unwrap();
        assert_eq!(sub.kind, NodeKind::Folder);
        let b = drive.child_named(&sub.id, "b.txt").unwrap();
        assert_eq!(drive.content(&b.id).unwrap(), b"b");
    }

    #[tokio::test]
    async fn missing_local_path_is_rejected() {
        let drive = FakeDrive::new();
        let cursor = MemoryCursorStore::new();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.bin");

        let err = upload(&drive, &cursor, &missing, &mut |_: &Path, _: f64| {})
            .await
            .unwrap_err();

        assert!(matches!(err, VfsError::InvalidLocalPath(path) if path == missing));
        assert_eq!(drive.remote_calls(), 0);
    }
}
