mod cursor;
mod token_storage;

pub use cursor::{Cursor, CursorError, CursorStore, JsonCursorStore, MemoryCursorStore};
pub use token_storage::{OAuthState, StorageError, TokenStorage};
pub(crate) use token_storage::now_unix;
