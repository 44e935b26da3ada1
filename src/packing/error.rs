use thiserror::Error;

/// Result type alias for packing operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors that can stop a packing run.
///
/// Everything past statistics/config validation is handled by retry or revert inside the
/// algorithm, so most of these can only surface from `PackingSession::new`.
#[derive(Debug, Error)]
pub enum PackError {
	/// No usable phase statistics were supplied.
	#[error("Missing statistics: {0}")]
	MissingStatistics(String),

	/// A phase carries statistics that cannot be sampled.
	#[error("Invalid statistics for phase {phase}: {reason}")]
	InvalidStatistics { phase: usize, reason: String },

	/// Configuration error.
	#[error("Configuration error: {0}")]
	InvalidConfig(String),

	/// The caller raised the abort flag.
	#[error("Packing cancelled")]
	Cancelled,

	/// Gap filling was asked to cover voxels but no grain is left active.
	#[error("No active grains left to fill {0} unassigned voxels")]
	NoActiveGrains(usize),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
