pub mod coerce;
pub mod controller;
pub mod encoder;
pub mod etl;
pub mod keymap;
pub mod mapping;
pub mod worker;

pub use crate::domain::model::{OutputBuffer, Record};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RecordDecoder, Storage, Uploader};
pub use crate::utils::error::Result;
