//! Data model for one compile round trip.

mod options;
mod request;
mod response;
mod result;

pub use options::CompileOptions;
pub use request::CompileRequest;
pub use response::CompileResponse;
pub use result::{StageOutcome, StageResult};
