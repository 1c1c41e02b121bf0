pub mod category;
pub mod file;
pub mod session;

pub use category::*;
pub use file::*;
pub use session::*;
