use std::future::Future;
use std::path::Path;

use dup_core::{
    DownloadSource, DriveClient, DriveError, FILE_FIELDS, FileQuery, LIST_FIELDS, Permission,
    escape_query_value,
};
use tokio::io::AsyncWrite;
use tokio::sync::OnceCell;

use super::node::{ROOT_ID, RemoteNode};
use super::retry::{RetryError, RetryPolicy};
use crate::error::VfsError;
use crate::transfer;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
const CHILD_ORDER: &str = "folder,name";

/// Typed operations against the remote store, addressed by node id.
///
/// Lookups report a miss as `Ok(None)`. Implementations retry transient
/// connectivity failures and surface [`VfsError::ConnectivityExhausted`]
/// once the budget is spent.
#[allow(async_fn_in_trait)]
pub trait NodeAccessor {
    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNode>, VfsError>;

    /// First non-trashed child of `parent_id` named exactly `name`, folders
    /// before files, then by name.
    async fn get_by_name(&self, name: &str, parent_id: &str)
    -> Result<Option<RemoteNode>, VfsError>;

    /// One page of non-trashed children. Never follows further pages.
    async fn list_children(
        &self,
        parent_id: &str,
        page_size: u32,
    ) -> Result<Vec<RemoteNode>, VfsError>;

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode, VfsError>;

    /// Grants "anyone with the link" read access. Calling it on an already
    /// public node is a no-op.
    async fn set_public_permission(&self, id: &str) -> Result<(), VfsError>;

    async fn is_public(&self, id: &str) -> Result<bool, VfsError>;

    /// Streams the node's bytes into `sink`, exported as `export_mime_type`
    /// when given. Returns the number of bytes written.
    async fn read_content<W>(
        &self,
        node: &RemoteNode,
        export_mime_type: Option<&str>,
        sink: &mut W,
        progress: &mut dyn FnMut(f64),
    ) -> Result<u64, VfsError>
    where
        W: AsyncWrite + Unpin;

    async fn write_content(
        &self,
        name: &str,
        parent_id: &str,
        source: &Path,
        progress: &mut dyn FnMut(f64),
    ) -> Result<RemoteNode, VfsError>;
}

impl From<RetryError<DriveError>> for VfsError {
    fn from(err: RetryError<DriveError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => VfsError::ConnectivityExhausted {
                attempts,
                source: last,
            },
            RetryError::Fatal(err) => VfsError::Drive(err),
        }
    }
}

/// [`NodeAccessor`] backed by the Drive REST API.
pub struct DriveAccessor {
    client: DriveClient,
    retry: RetryPolicy,
    root_id: OnceCell<String>,
}

impl DriveAccessor {
    pub fn new(client: DriveClient, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            root_id: OnceCell::new(),
        }
    }

    async fn call<T, F, Fut>(&self, label: &str, op: F) -> Result<T, VfsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriveError>>,
    {
        Ok(self.retry.run(label, DriveError::is_transport, op).await?)
    }

    // Children of the top-level folder report its real id as their parent.
    async fn root_id(&self) -> Result<&str, VfsError> {
        let id = self
            .root_id
            .get_or_try_init(|| async {
                let root = self
                    .call("get root", || self.client.get_file(ROOT_ID, "id"))
                    .await?;
                Ok::<_, VfsError>(root.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn find_first(&self, q: &str, page_size: u32) -> Result<Vec<RemoteNode>, VfsError> {
        let query = FileQuery {
            q,
            page_size,
            order_by: Some(CHILD_ORDER),
            fields: LIST_FIELDS,
        };
        let list = self
            .call("list files", || self.client.list_files(&query))
            .await?;
        let root_id = self.root_id().await?;
        Ok(list
            .files
            .into_iter()
            .map(|file| RemoteNode::from_drive_file(file, root_id))
            .collect())
    }
}

impl NodeAccessor for DriveAccessor {
    async fn get_by_id(&self, id: &str) -> Result<Option<RemoteNode>, VfsError> {
        match self
            .call("get file", || self.client.get_file(id, FILE_FIELDS))
            .await
        {
            Ok(file) => {
                let root_id = self.root_id().await?;
                Ok(Some(RemoteNode::from_drive_file(file, root_id)))
            }
            Err(VfsError::Drive(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_by_name(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<RemoteNode>, VfsError> {
        let q = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query_value(name),
            escape_query_value(parent_id)
        );
        Ok(self.find_first(&q, 1).await?.into_iter().next())
    }

    async fn list_children(
        &self,
        parent_id: &str,
        page_size: u32,
    ) -> Result<Vec<RemoteNode>, VfsError> {
        let q = format!(
            "'{}' in parents and trashed=false",
            escape_query_value(parent_id)
        );
        self.find_first(&q, page_size).await
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteNode, VfsError> {
        let file = self
            .call("create folder", || self.client.create_folder(name, parent_id))
            .await?;
        let root_id = self.root_id().await?;
        Ok(RemoteNode::from_drive_file(file, root_id))
    }

    async fn set_public_permission(&self, id: &str) -> Result<(), VfsError> {
        if self.is_public(id).await? {
            return Ok(());
        }
        let permission = Permission::anyone_reader();
        self.call("create permission", || {
            self.client.create_permission(id, &permission)
        })
        .await?;
        Ok(())
    }

    async fn is_public(&self, id: &str) -> Result<bool, VfsError> {
        let permissions = self
            .call("list permissions", || self.client.list_permissions(id))
            .await?;
        Ok(permissions.iter().any(Permission::is_anyone))
    }

    async fn read_content<W>(
        &self,
        node: &RemoteNode,
        export_mime_type: Option<&str>,
        sink: &mut W,
        progress: &mut dyn FnMut(f64),
    ) -> Result<u64, VfsError>
    where
        W: AsyncWrite + Unpin,
    {
        let (source, expected_md5) = match export_mime_type {
            Some(mime_type) => (
                DownloadSource::Export {
                    id: node.id.clone(),
                    mime_type: mime_type.to_string(),
                },
                None,
            ),
            None => (
                DownloadSource::Media {
                    id: node.id.clone(),
                },
                node.md5_checksum.as_deref(),
            ),
        };
        transfer::download_chunked(
            &self.client,
            &self.retry,
            &source,
            sink,
            expected_md5,
            progress,
        )
        .await
    }

    async fn write_content(
        &self,
        name: &str,
        parent_id: &str,
        source: &Path,
        progress: &mut dyn FnMut(f64),
    ) -> Result<RemoteNode, VfsError> {
        let file =
            transfer::upload_chunked(&self.client, &self.retry, name, parent_id, source, progress)
                .await?;
        let root_id = self.root_id().await?;
        Ok(RemoteNode::from_drive_file(file, root_id))
    }
}
