// Domain layer: records, the worker message protocol and ports (interfaces).
// No knowledge of dBase, HTTP or the filesystem lives here.

pub mod model;
pub mod ports;
pub mod protocol;
