// Adapters layer: concrete implementations of the domain ports for external
// systems (dBase files, the import HTTP endpoint).

pub mod dbf;
pub mod upload;

pub use self::dbf::DbaseDecoder;
pub use self::upload::HttpUploader;
