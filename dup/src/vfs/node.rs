use dup_core::{DriveFile, FOLDER_MIME_TYPE, NATIVE_MIME_PREFIX};

/// Id of the store's top-level folder. Never fetched by id.
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
    /// Store-internal document; the payload is the subtype (`document`, `spreadsheet`, ...).
    NativeDocument(String),
}

impl NodeKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            NodeKind::Folder
        } else if let Some(subtype) = mime_type.strip_prefix(NATIVE_MIME_PREFIX) {
            NodeKind::NativeDocument(subtype.to_string())
        } else {
            NodeKind::File
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parents: Vec<String>,
    pub size: Option<u64>,
    pub modified_time: Option<String>,
    pub web_view_link: Option<String>,
    pub md5_checksum: Option<String>,
}

impl RemoteNode {
    /// Builds a node from API metadata, rewriting `root_id` (the real id of the
    /// top-level folder) to [`ROOT_ID`] wherever it appears as a parent.
    pub fn from_drive_file(file: DriveFile, root_id: &str) -> Self {
        let kind = NodeKind::from_mime_type(&file.mime_type);
        let parents = file
            .parents
            .into_iter()
            .map(|parent| {
                if parent == root_id {
                    ROOT_ID.to_string()
                } else {
                    parent
                }
            })
            .collect();
        Self {
            id: file.id,
            name: file.name,
            kind,
            parents,
            size: file.size,
            modified_time: file.modified_time,
            web_view_link: file.web_view_link,
            md5_checksum: file.md5_checksum,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// The first parent. Additional parents are ignored for path purposes.
    pub fn primary_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    pub fn share_link(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_file(mime_type: &str, parents: &[&str]) -> DriveFile {
        DriveFile {
            id: "n1".into(),
            name: "node".into(),
            mime_type: mime_type.into(),
            size: None,
            modified_time: None,
            parents: parents.iter().map(|p| p.to_string()).collect(),
            web_view_link: None,
            md5_checksum: None,
        }
    }

    #[test]
    fn kind_follows_mime_type() {
        assert_eq!(NodeKind::from_mime_type(FOLDER_MIME_TYPE), NodeKind::Folder);
        assert_eq!(
            NodeKind::from_mime_type("application/vnd.google-apps.spreadsheet"),
            NodeKind::NativeDocument("spreadsheet".into())
        );
        assert_eq!(NodeKind::from_mime_type("image/png"), NodeKind::File);
    }

    #[test]
    fn real_root_id_becomes_sentinel() {
        let node = RemoteNode::from_drive_file(
            drive_file(FOLDER_MIME_TYPE, &["0AbcRoot", "other"]),
            "0AbcRoot",
        );
        assert_eq!(node.primary_parent(), Some(ROOT_ID));
        assert_eq!(node.parents[1], "other");
    }

    #[test]
    fn share_link_falls_back_to_view_url() {
        let node = RemoteNode::from_drive_file(drive_file("text/plain", &[]), "0AbcRoot");
        assert_eq!(node.share_link(), "https://drive.google.com/file/d/n1/view");
        assert_eq!(node.primary_parent(), None);
    }
}
