mod client;
mod oauth;

pub use client::{
    ApiErrorClass, DownloadChunk, DownloadSource, DriveClient, DriveError, DriveFile, FILE_FIELDS,
    FOLDER_MIME_TYPE, FileList, FileQuery, LIST_FIELDS, NATIVE_MIME_PREFIX, Permission,
    UploadStatus, escape_query_value,
};
pub use oauth::{DRIVE_SCOPE, OAuthClient, OAuthError, OAuthToken};
