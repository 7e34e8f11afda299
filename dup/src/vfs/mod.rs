mod accessor;
#[cfg(test)]
pub(crate) mod fake;
mod node;
mod paths;
mod resolver;
mod retry;
mod tree;

pub use accessor::{DEFAULT_PAGE_SIZE, DriveAccessor, NodeAccessor};
pub use node::{NodeKind, ROOT_ID, RemoteNode};
pub use paths::{compute_full_path, split_segments};
pub use resolver::{resolve, resolve_entry};
pub use retry::{RetryError, RetryPolicy};
pub use tree::{DEFAULT_MAX_DEPTH, DisplayLine, LineKind, materialize};
