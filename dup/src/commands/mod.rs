//! User-level operations over a [`NodeAccessor`](crate::vfs::NodeAccessor)
//! and a [`CursorStore`](crate::storage::CursorStore).
//!
//! Each operation returns data; printing is left to the binary.

mod cd;
mod download;
mod link;
mod ls;
mod tree;
mod upload;

pub use cd::{change_dir, working_dir};
pub use download::{ExportFormat, download, export_format};
pub use link::{AssumeYes, Confirm, LinkOutcome, LinkStatus, StdinConfirm, share_link};
pub use ls::{Listing, list};
pub use tree::{TreeView, tree};
pub use upload::{UploadReport, upload};
