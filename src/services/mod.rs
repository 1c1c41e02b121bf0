pub mod catalog;
pub mod query;
pub mod session;

pub use catalog::{AccessKind, CatalogService, IncomingFile, UploadFields};
pub use session::SessionService;
