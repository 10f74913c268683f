//! Context & Memory (spec.md §4.5): message compression plus three
//! durable, JSON-backed memories rooted under `.photon/memory/`.

pub mod attempt;
pub mod context;
pub mod failures;
pub mod preferences;
pub mod project;

pub use attempt::{AttemptRecord, AttemptStatus, AttemptStore};
pub use context::{compress, Message, Role};
pub use failures::FailureMemory;
pub use preferences::Preferences;
pub use project::{ProjectMemory, ProjectProfile};
