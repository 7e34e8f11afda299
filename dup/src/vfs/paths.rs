use super::accessor::NodeAccessor;
use super::node::ROOT_ID;

// Upper bound on parent hops, so a parent cycle in the store cannot spin forever.
const MAX_PARENT_HOPS: usize = 256;

/// Splits a relative path expression into segments, dropping empty and `.` segments.
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

/// Absolute path of `id`, rebuilt by walking primary parents up to the root.
///
/// A node that cannot be fetched, or that has no parents, ends the walk early;
/// whatever names were collected so far are returned.
pub async fn compute_full_path<A: NodeAccessor>(accessor: &A, id: &str) -> String {
    let mut names = Vec::new();
    let mut current = id.to_string();
    while current != ROOT_ID && names.len() < MAX_PARENT_HOPS {
        let node = match accessor.get_by_id(&current).await {
            Ok(Some(node)) => node,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(id = %current, error = %err, "path walk stopped");
                break;
            }
        };
        let parent = node.primary_parent().map(str::to_string);
        names.push(node.name);
        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
    names.reverse();
    format!("/{}", names.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::fake::FakeDrive;

    #[test]
    fn split_skips_empty_and_dot_segments() {
        let segments: Vec<_> = split_segments("a//./b/../c/").collect();
        assert_eq!(segments, vec!["a", "b", "..", "c"]);
    }

    #[tokio::test]
    async fn root_is_slash_without_remote_calls() {
        let drive = FakeDrive::new();
        assert_eq!(compute_full_path(&drive, ROOT_ID).await, "/");
        assert_eq!(drive.remote_calls(), 0);
    }

    #[tokio::test]
    async fn walks_primary_parents() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "Docs", ROOT_ID)
            .add_folder("f2", "Work", "f1")
            .add_folder("f3", "2024", "f2");

        assert_eq!(compute_full_path(&drive, "f3").await, "/Docs/Work/2024");
    }

    #[tokio::test]
    async fn missing_ancestor_truncates_silently() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f2", "Work", "vanished")
            .add_folder("f3", "2024", "f2");

        assert_eq!(compute_full_path(&drive, "f3").await, "/Work/2024");
        assert_eq!(compute_full_path(&drive, "nope").await, "/");
    }
}
