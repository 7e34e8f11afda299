use crate::error::VfsError;
use crate::storage::{Cursor, CursorStore};
use crate::vfs::{NodeAccessor, ROOT_ID, compute_full_path, resolve};

/// Moves the cursor to the folder `path` names, relative to the current one.
pub async fn change_dir<A, C>(accessor: &A, cursor: &C, path: &str) -> Result<Cursor, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
{
    let current = cursor.load();
    let target = resolve(accessor, path, &current.current_folder_id).await?;
    if target != ROOT_ID {
        match accessor.get_by_id(&target).await? {
            Some(node) if node.is_folder() => {}
            Some(_) => return Err(VfsError::NotAFolder(path.to_string())),
            None => return Err(VfsError::NotFound(path.to_string())),
        }
    }
    let full_path = compute_full_path(accessor, &target).await;
    cursor.set_current_folder(&target, &full_path)?;
    Ok(Cursor {
        current_folder_id: target,
        current_path: full_path,
    })
}

pub fn working_dir<C: CursorStore>(cursor: &C) -> Cursor {
    cursor.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCursorStore;
    use crate::vfs::fake::FakeDrive;

    fn drive() -> FakeDrive {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "Docs", "root")
            .add_folder("f2", "Work", "f1")
            .add_file("x1", "a.txt", "f1", &[0; 120]);
        drive
    }

    #[tokio::test]
    async fn cd_into_folder_and_back_restores_root() {
        let drive = drive();
        let cursor = MemoryCursorStore::new();

        let moved = change_dir(&drive, &cursor, "Docs").await.unwrap();
        assert_eq!(moved.current_folder_id, "f1");
        assert_eq!(moved.current_path, "/Docs");

        let back = change_dir(&drive, &cursor, "..").await.unwrap();
        assert_eq!(back, Cursor::default());
        assert_eq!(working_dir(&cursor), Cursor::default());
    }

    #[tokio::test]
    async fn cd_nested_and_absolute_paths() {
        let drive = drive();
        let cursor = MemoryCursorStore::new();

        change_dir(&drive, &cursor, "Docs/Work").await.unwrap();
        assert_eq!(working_dir(&cursor).current_path, "/Docs/Work");

        change_dir(&drive, &cursor, "/Docs").await.unwrap();
        assert_eq!(working_dir(&cursor).current_folder_id, "f1");

        change_dir(&drive, &cursor, "/").await.unwrap();
        assert_eq!(working_dir(&cursor), Cursor::default());
    }

    #[tokio::test]
    async fn cd_to_missing_path_keeps_cursor() {
        let drive = drive();
        let cursor = MemoryCursorStore::new();
        change_dir(&drive, &cursor, "Docs").await.unwrap();

        let err = change_dir(&drive, &cursor, "Nope").await.unwrap_err();

        assert!(matches!(err, VfsError::NotFound(path) if path == "Nope"));
        assert_eq!(working_dir(&cursor).current_folder_id, "f1");
    }

    #[tokio::test]
    async fn cd_to_file_is_not_found() {
        let drive = drive();
        let cursor = MemoryCursorStore::new();

        let err = change_dir(&drive, &cursor, "Docs/a.txt").await.unwrap_err();

        assert!(matches!(err, VfsError::NotFound(_)));
        assert_eq!(working_dir(&cursor), Cursor::default());
    }
}
