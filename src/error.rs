use thiserror::Error;

/// Errors reported by the olivine core.
///
/// Every failure goes to the immediate caller; nothing is retried or
/// suppressed internally.
#[derive(Debug, Error)]
pub enum OlivineError {
    /// Unreadable or malformed model input.
    #[error("input error: {0}")]
    Input(String),

    /// Invalid geometry: self-intersecting boundaries, misplaced holes,
    /// too few boundary points.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Invalid configuration: material parameters out of range, or an
    /// analysis request missing fixed points, triangles, or forces.
    #[error("validation error: {0}")]
    Validation(String),

    /// Numerical failure: a singular global system, or element results
    /// read before a solve produced displacements.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Result output failure.
    #[error("output error: {0}")]
    Output(String),
}
