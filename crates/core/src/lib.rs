pub mod artifact;
pub mod cache;
pub mod classify;
pub mod error;
pub mod ticket;

pub use artifact::Artifact;
pub use cache::{MemoryCache, RecencyCache};
pub use classify::{classify, DataType};
pub use error::CoreError;
pub use ticket::TicketStore;
