//! Data model definitions shared across anchorscan crates.
//!
//! Everything that crosses the HTTP boundary keeps the server's exact field
//! names; everything produced locally (matches, debug observations) lives here
//! too so the core and the agent agree on one shape.

pub mod error;
pub mod ids;
pub mod job;
pub mod lenient;
pub mod observation;
pub mod report;
pub mod tag;
pub mod time;

pub use error::{ModelError, Result as ModelResult};
pub use ids::AnchorId;
pub use job::ScanJob;
pub use observation::{GenericObservation, RadioObservation};
pub use report::{RelationshipUpdate, ScanDataEntry};
pub use tag::{MatchedTag, TagRecord};
pub use time::{SERVER_TIME_FORMAT, format_server_time, parse_server_time};
