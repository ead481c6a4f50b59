// Library root
// -----------
// A small blocking client for the Backblaze B2 native API, plus the
// interactive front-end used by the `b2-client` binary.
//
// Module responsibilities:
// - `api`: the `Client` itself: account session, upload tickets, uploads
//   with retry, downloads, file info and deletion.
// - `config`: credentials, bucket reference and tuning knobs, loadable
//   from `B2_*` environment variables.
// - `error`: the `B2Error` taxonomy shared by every operation.
// - `ui`: terminal menu flows that delegate to `api`.
pub mod api;
pub mod config;
pub mod error;
pub mod ui;

pub use api::{Client, FileInfo, FileVersion, Session, UploadTicket};
pub use config::B2Config;
pub use error::{B2Error, B2Result};
