use std::fmt;

use super::accessor::NodeAccessor;
use super::node::RemoteNode;

pub const DEFAULT_MAX_DEPTH: usize = 10;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const CONTINUATION: &str = "│   ";
const BLANK: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Folder,
    File,
    Error,
}

/// One rendered row: indentation (ancestor guides plus connector) and a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub prefix: String,
    pub kind: LineKind,
    pub label: String,
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            LineKind::Folder => "📁 ",
            LineKind::File => "📄 ",
            LineKind::Error => "",
        };
        write!(f, "{}{}{}", self.prefix, marker, self.label)
    }
}

/// Depth-first, pre-order rendering of the hierarchy below `start_id`.
///
/// Folders at depth `max_depth` are not listed, and each listing returns at
/// most `page_size` children. A folder whose listing fails
/// contributes a single error line in place of its children; the rest of the
/// walk continues.
pub async fn materialize<A: NodeAccessor>(
    accessor: &A,
    start_id: &str,
    max_depth: usize,
    page_size: u32,
) -> Vec<DisplayLine> {
    let mut lines = Vec::new();
    let limits = Limits {
        max_depth,
        page_size,
    };
    walk(accessor, start_id, String::new(), 0, limits, &mut lines).await;
    lines
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    max_depth: usize,
    page_size: u32,
}

async fn walk<A: NodeAccessor>(
    accessor: &A,
    folder_id: &str,
    prefix: String,
    depth: usize,
    limits: Limits,
    lines: &mut Vec<DisplayLine>,
) {
    if depth >= limits.max_depth {
        return;
    }
    let children = match accessor.list_children(folder_id, limits.page_size).await {
        Ok(children) => children,
        Err(err) => {
            tracing::warn!(folder_id, error = %err, "tree listing failed");
            lines.push(DisplayLine {
                prefix: format!("{prefix}{LAST_BRANCH}"),
                kind: LineKind::Error,
                label: "[Error reading folder]".to_string(),
            });
            return;
        }
    };

    let count = children.len();
    for (index, child) in children.into_iter().enumerate() {
        let is_last = index + 1 == count;
        lines.push(line_for(&child, &prefix, is_last));
        if child.is_folder() {
            let extension = if is_last { BLANK } else { CONTINUATION };
            let child_prefix = format!("{prefix}{extension}");
            Box::pin(walk(
                accessor,
                &child.id,
                child_prefix,
                depth + 1,
                limits,
                lines,
            ))
            .await;
        }
    }
}

fn line_for(node: &RemoteNode, prefix: &str, is_last: bool) -> DisplayLine {
    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    DisplayLine {
        prefix: format!("{prefix}{connector}"),
        kind: if node.is_folder() {
            LineKind::Folder
        } else {
            LineKind::File
        },
        label: node.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::DEFAULT_PAGE_SIZE;
    use crate::vfs::fake::FakeDrive;
    use crate::vfs::node::ROOT_ID;

    fn rendered(lines: &[DisplayLine]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn renders_box_drawing_tree() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "Docs", ROOT_ID)
            .add_file("x1", "a.txt", "f1", b"a")
            .add_folder("f2", "Work", "f1")
            .add_file("x2", "plan.md", "f2", b"p")
            .add_file("x3", "readme.txt", ROOT_ID, b"r");

        let lines = materialize(&drive, ROOT_ID, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_SIZE).await;

        assert_eq!(
            rendered(&lines),
            vec![
                "├── 📁 Docs",
                "│   ├── 📁 Work",
                "│   │   └── 📄 plan.md",
                "│   └── 📄 a.txt",
                "└── 📄 readme.txt",
            ]
        );
    }

    #[tokio::test]
    async fn failing_branch_is_contained() {
        let drive = FakeDrive::new();
        drive
            .add_folder("bad", "Locked", ROOT_ID)
            .add_file("x1", "notes.txt", ROOT_ID, b"n");
        drive.fail_listing("bad");

        let lines = materialize(&drive, ROOT_ID, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_SIZE).await;

        assert_eq!(
            rendered(&lines),
            vec![
                "├── 📁 Locked",
                "│   └── [Error reading folder]",
                "└── 📄 notes.txt",
            ]
        );
        let errors = lines
            .iter()
            .filter(|line| line.kind == LineKind::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn failing_start_folder_yields_single_error_line() {
        let drive = FakeDrive::new();
        drive.fail_listing(ROOT_ID);

        let lines = materialize(&drive, ROOT_ID, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_SIZE).await;

        assert_eq!(rendered(&lines), vec!["└── [Error reading folder]"]);
    }

    #[tokio::test]
    async fn depth_limit_stops_listing() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "a", ROOT_ID)
            .add_folder("f2", "b", "f1")
            .add_folder("f3", "c", "f2");

        let lines = materialize(&drive, ROOT_ID, 2, DEFAULT_PAGE_SIZE).await;

        assert_eq!(rendered(&lines), vec!["└── 📁 a", "    └── 📁 b"]);
        // root and f1 were listed; f2 sits at the cutoff.
        assert_eq!(drive.remote_calls(), 2);
    }

    #[tokio::test]
    async fn page_size_caps_each_listing() {
        let drive = FakeDrive::new();
        drive
            .add_folder("f1", "big", ROOT_ID)
            .add_file("x1", "a", "f1", b"")
            .add_file("x2", "b", "f1", b"")
            .add_file("x3", "c", "f1", b"")
            .add_file("x4", "d", "f1", b"");

        let lines = materialize(&drive, ROOT_ID, DEFAULT_MAX_DEPTH, 2).await;

        assert_eq!(
            rendered(&lines),
            vec!["└── 📁 big", "    ├── 📄 a", "    └── 📄 b"]
        );
    }
}
