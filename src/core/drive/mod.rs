pub mod drive_models;
pub mod drive_service;

pub use drive_models::{RemoteDocumentRef, RemoteFolderRef, SyncReport};
pub use drive_service::{DriveClient, DriveError, DriveService};
