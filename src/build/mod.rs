//! Native addon prebuild orchestration
//!
//! ```text
//! BuildConfig → target.rs (directory name) → stager.rs → node_gyp.rs → node-gyp
//! ```
//!
//! - `target` - target directory naming and host defaults
//! - `node_gyp` - node-gyp command construction
//! - `stager` - sequential build + replace of staged module trees

pub mod node_gyp;
pub mod stager;
pub mod target;

pub use node_gyp::NodeGyp;
pub use stager::{ArtifactStager, StageReport, StageState};
pub use target::{BuildConfig, BuildSummary, StagingLayout};
