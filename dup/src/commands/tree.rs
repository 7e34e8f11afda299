use crate::error::VfsError;
use crate::storage::CursorStore;
use crate::vfs::{DisplayLine, NodeAccessor, compute_full_path, materialize, resolve};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeView {
    pub path: String,
    pub lines: Vec<DisplayLine>,
}

pub async fn tree<A, C>(
    accessor: &A,
    cursor: &C,
    path: Option<&str>,
    max_depth: usize,
    page_size: u32,
) -> Result<TreeView, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
{
    let current = cursor.load();
    let (start_id, path) = match path {
        Some(path) => {
            let id = resolve(accessor, path, &current.current_folder_id).await?;
            let full_path = compute_full_path(accessor, &id).await;
            (id, full_path)
        }
        None => (current.current_folder_id, current.current_path),
    };
    let lines = materialize(accessor, &start_id, max_depth, page_size).await;
    Ok(TreeView { path, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCursorStore;
    use crate::vfs::fake::FakeDrive;

    #[tokio::test]
    async fn renders_from_cursor_folder() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "Docs", "root")
            .add_file("x1", "a.txt", "f1", b"a");
        let cursor = MemoryCursorStore::new();
        cursor.set_current_folder("f1", "/Docs").unwrap();

        let view = tree(&drive, &cursor, None, 10, 100).await.unwrap();

        assert_eq!(view.path, "/Docs");
        let rendered: Vec<String> = view.lines.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["└── 📄 a.txt"]);
    }

    #[tokio::test]
    async fn unknown_start_path_fails_before_walking() {
        let drive = FakeDrive::new();
        let cursor = MemoryCursorStore::new();

        let err = tree(&drive, &cursor, Some("nope"), 10, 100).await.unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_size_applies_to_tree() {
        let drive = FakeDrive::new();
        let files = [("x1", "a"), ("x2", "b"), ("x3", "c"), ("x4", "d"), ("x5", "e")];
        for (id, name) in files {
            drive.add_file(id, name, "root", b"");
        }
        let cursor = MemoryCursorStore::new();

        let view = tree(&drive, &cursor, None, 10, 3).await.unwrap();

        assert_eq!(view.lines.len(), 3);
        assert_eq!(view.lines[2].label, "c");
    }
}
