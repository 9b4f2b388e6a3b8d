pub mod backend;
pub mod documents;

pub use backend::MongoBackend;
