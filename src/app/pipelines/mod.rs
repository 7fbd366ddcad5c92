pub mod dbf_pipeline;

pub use self::dbf_pipeline::DbfPipeline;
