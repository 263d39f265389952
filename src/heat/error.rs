use thiserror::Error;

/// Everything that can degrade a render. None of these abort the render
/// pass; they are collected in the render report instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatError {
    /// Points skipped for non-finite coordinates or intensity
    #[error("skipped {count} invalid points")]
    Data { count: usize },
    /// Boundary geometry unusable; rendering continues unclipped
    #[error("boundary geometry unusable: {0}")]
    Geometry(String),
    /// Configuration value replaced by a safe fallback
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Render surface could not be allocated; the render is a no-op
    #[error("render surface unavailable: {0}")]
    Resource(String),
}
