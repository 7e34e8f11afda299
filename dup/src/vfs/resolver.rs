use super::accessor::NodeAccessor;
use super::node::{ROOT_ID, RemoteNode};
use super::paths::split_segments;
use crate::error::VfsError;

/// Resolves a folder path expression (`.`, `..`, `/`, `a/b`, `/a/../b`)
/// against `start_id`, one remote lookup per segment.
///
/// Every named segment must be a folder. Any miss fails the whole resolution
/// with [`VfsError::NotFound`].
pub async fn resolve<A: NodeAccessor>(
    accessor: &A,
    path: &str,
    start_id: &str,
) -> Result<String, VfsError> {
    match path {
        "." => return Ok(start_id.to_string()),
        "/" => return Ok(ROOT_ID.to_string()),
        ".." => return parent_of(accessor, start_id, path).await,
        _ => {}
    }

    let (mut current, rest) = match path.strip_prefix('/') {
        Some(rest) => (ROOT_ID.to_string(), rest),
        None => (start_id.to_string(), path),
    };
    for segment in split_segments(rest) {
        current = if segment == ".." {
            parent_of(accessor, &current, path).await?
        } else {
            match accessor.get_by_name(segment, &current).await? {
                Some(node) if node.is_folder() => node.id,
                _ => return Err(VfsError::NotFound(path.to_string())),
            }
        };
    }
    Ok(current)
}

/// Resolves a path whose last segment may name a file: the parent part goes
/// through [`resolve`], the last segment is looked up by name.
pub async fn resolve_entry<A: NodeAccessor>(
    accessor: &A,
    path: &str,
    start_id: &str,
) -> Result<RemoteNode, VfsError> {
    let trimmed = path.trim_end_matches('/');
    let (parent_expr, name) = match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => (".", trimmed),
    };

    if name.is_empty() || name == "." || name == ".." {
        let id = resolve(accessor, path, start_id).await?;
        if id == ROOT_ID {
            return Err(VfsError::NotFound(path.to_string()));
        }
        return accessor
            .get_by_id(&id)
            .await?
            .ok_or_else(|| VfsError::NotFound(path.to_string()));
    }

    let parent = resolve(accessor, parent_expr, start_id).await?;
    accessor
        .get_by_name(name, &parent)
        .await?
        .ok_or_else(|| VfsError::NotFound(path.to_string()))
}

async fn parent_of<A: NodeAccessor>(
    accessor: &A,
    id: &str,
    path: &str,
) -> Result<String, VfsError> {
    if id == ROOT_ID {
        return Ok(ROOT_ID.to_string());
    }
    let node = accessor
        .get_by_id(id)
        .await?
        .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
    Ok(node.primary_parent().unwrap_or(ROOT_ID).to_string())
}
