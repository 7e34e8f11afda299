//! In-memory [`NodeAccessor`] used by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::accessor::NodeAccessor;
use super::node::{NodeKind, RemoteNode};
use crate::error::VfsError;

#[derive(Default)]
struct FakeState {
    nodes: BTreeMap<String, RemoteNode>,
    contents: BTreeMap<String, Vec<u8>>,
    public: HashSet<String>,
    failing_listings: HashSet<String>,
    next_id: u64,
    calls: usize,
}

#[derive(Default)]
pub struct FakeDrive {
    state: Mutex<FakeState>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: &str) -> &Self {
        self.insert(id, name, parent, NodeKind::Folder, None);
        self
    }

    pub fn add_file(&self, id: &str, name: &str, parent: &str, content: &[u8]) -> &Self {
        self.insert(id, name, parent, NodeKind::File, Some(content.to_vec()));
        self
    }

    pub fn add_native(&self, id: &str, name: &str, parent: &str, subtype: &str) -> &Self {
        let kind = NodeKind::NativeDocument(subtype.to_string());
        self.insert(id, name, parent, kind, Some(format!("exported {subtype}").into_bytes()));
        self
    }

    /// Makes every listing of `id` fail with a non-retryable error.
    pub fn fail_listing(&self, id: &str) {
        self.lock().failing_listings.insert(id.to_string());
    }

    pub fn remote_calls(&self) -> usize {
        self.lock().calls
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.lock().contents.get(id).cloned()
    }

    pub fn child_named(&self, parent: &str, name: &str) -> Option<RemoteNode> {
        children_of(&self.lock(), parent)
            .into_iter()
            .find(|node| node.name == name)
    }

    fn insert(&self, id: &str, name: &str, parent: &str, kind: NodeKind, content: Option<Vec<u8>>) {
        let size = match kind {
            NodeKind::File => content.as_ref().map(|bytes| bytes.len() as u64),
            _ => None,
        };
        let node = RemoteNode {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            parents: vec![parent.to_string()],
            size,
            modified_time: Some("2024-05-01T10:00:00.000Z".to_string()),
            web_view_link: Some(format!("https://drive.example/{id}")),
            md5_checksum: None,
        };
        let mut state = self.lock();
        if let Some(content) = content {
            state.contents.insert(id.to_string(), content);
        }
        state.nodes.insert(id.to_string(), node);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn call(&self) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.lock();
        state.calls += 1;
        state
    }
}

// Folders first, then by name, like the real listing order.
fn children_of(state: &FakeState, parent: &str) -> Vec<RemoteNode> {
    let mut children: Vec<RemoteNode> = state
        .nodes
        .values()
        .filter(|node| node.primary_parent() == Some(parent))
        .cloned()
        .collect();
    children.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    children
}

impl NodeAccessor for FakeDrive {
    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNode>, VfsError> {
        Ok(self.call().nodes.get(id).cloned())
    }

    async fn get_by_name(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<RemoteNode>, VfsError> {
        let state = self.call();
        Ok(children_of(&state, parent_id)
            .into_iter()
            .find(|node| node.name == name))
    }

    async fn list_children(
        &self,
        parent_id: &str,
        page_size: u32,
    ) -> Result<Vec<RemoteNode>, VfsError> {
        let state = self.call();
        if state.failing_listings.contains(parent_id) {
            return Err(VfsError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "listing denied",
            )));
        }
        let mut children = children_of(&state, parent_id);
        children.truncate(page_size as usize);
        Ok(children)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode, VfsError> {
        let id = {
            let mut state = self.call();
            state.next_id += 1;
            format!("new-{}", state.next_id)
        };
        self.insert(&id, name, parent_id, NodeKind::Folder, None);
        Ok(self.lock().nodes[&id].clone())
    }

    async fn set_public_permission(&self, id: &str) -> Result<(), VfsError> {
        let mut state = self.call();
        if !state.nodes.contains_key(id) {
            return Err(VfsError::NotFound(id.to_string()));
        }
        state.public.insert(id.to_string());
        Ok(())
    }

    async fn is_public(&self, id: &str) -> Result<bool, VfsError> {
        Ok(self.call().public.contains(id))
    }

    async fn read_content<W>(
        &self,
        node: &RemoteNode,
        _export_mime_type: Option<&str>,
        sink: &mut W,
        progress: &mut dyn FnMut(f64),
    ) -> Result<u64, VfsError>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self
            .call()
            .contents
            .get(&node.id)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(node.name.clone()))?;
        sink.write_all(&bytes).await?;
        sink.flush().await?;
        progress(1.0);
        Ok(bytes.len() as u64)
    }

    async fn write_content(
        &self,
        name: &str,
        parent_id: &str,
        source: &Path,
        progress: &mut dyn FnMut(f64),
    ) -> Result<RemoteNode, VfsError> {
        let bytes = tokio::fs::read(source).await?;
        let id = {
            let mut state = self.call();
            state.next_id += 1;
            format!("new-{}", state.next_id)
        };
        self.insert(&id, name, parent_id, NodeKind::File, Some(bytes));
        progress(1.0);
        Ok(self.lock().nodes[&id].clone())
    }
}
