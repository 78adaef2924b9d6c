//! Multi-tool rule audit.
//!
//! Three LLM-backed tools each emit a [`ToolReport`](crate::domain::models::ToolReport);
//! the commander runs them in turn and folds the reports into an
//! executive summary.

pub mod canned;
pub mod commander;
pub mod overfit_detector;
pub mod red_team;
pub mod scoring;
pub mod semantic_mapper;
pub mod traits;

pub use commander::Commander;
pub use overfit_detector::OverfitDetector;
pub use red_team::RedTeamTool;
pub use scoring::executive_summary;
pub use semantic_mapper::SemanticMapper;
pub use traits::AuditTool;

pub const RED_TEAM_TOOL: &str = "Synthetic Red Team";
pub const OVERFIT_TOOL: &str = "Variance/Overfit Detector";
pub const BOUNDARY_TOOL: &str = "Semantic Boundary Mapper";
