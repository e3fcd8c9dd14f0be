pub mod google_drive_client;

pub use google_drive_client::GoogleDriveClient;
