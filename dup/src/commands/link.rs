use std::io::{self, BufRead, Write};

use crate::error::VfsError;
use crate::storage::CursorStore;
use crate::vfs::{NodeAccessor, resolve_entry};

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Prompts on stdout and reads the answer from stdin. Anything but `y`/`yes`
/// counts as no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question} [y/N]: ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Answers every question with a fixed value.
pub struct AssumeYes(pub bool);

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    AlreadyPublic,
    MadePublic,
    /// The user declined; the link only works for people with access.
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub name: String,
    pub link: String,
    pub status: LinkStatus,
}

/// Returns a share link for `name`, offering to make it public first.
pub async fn share_link<A, C, Q>(
    accessor: &A,
    cursor: &C,
    name: &str,
    confirm: &mut Q,
) -> Result<LinkOutcome, VfsError>
where
    A: NodeAccessor,
    C: CursorStore,
    Q: Confirm + ?Sized,
{
    let current = cursor.load();
    let node = resolve_entry(accessor, name, &current.current_folder_id).await?;

    let status = if accessor.is_public(&node.id).await? {
        LinkStatus::AlreadyPublic
    } else if confirm.confirm(&format!(
        "'{}' is private. Make it publicly accessible?",
        node.name
    )) {
        accessor.set_public_permission(&node.id).await?;
        LinkStatus::MadePublic
    } else {
        LinkStatus::Private
    };

    Ok(LinkOutcome {
        link: node.share_link(),
        name: node.name,
        status,
    })
}
