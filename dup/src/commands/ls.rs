use crate::error::VfsError;
use crate::storage::CursorStore;
use crate::vfs::{NodeAccessor, RemoteNode, compute_full_path, resolve};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub folder_id: String,
    pub path: String,
    pub entries: Vec<RemoteNode>,
}

/// Lists one page of the folder `path` names, or the cursor folder.
pub async fn list<A, C>(
    accessor: &A,
    cursor: &C,
    path: Option<&str>,
    page_size: u32,
) -> Result<Listing, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
{
    let current = cursor.load();
    let (folder_id, path) = match path {
        Some(path) => {
            let id = resolve(accessor, path, &current.current_folder_id).await?;
            let full_path = compute_full_path(accessor, &id).await;
            (id, full_path)
        }
        None => (current.current_folder_id, current.current_path),
    };
    let entries = accessor.list_children(&folder_id, page_size).await?;
    Ok(Listing {
        folder_id,
        path,
        entries,
    })
}
