pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read corpus artifact at {path:?}.")]
	ReadArtifact { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse corpus artifact at {path:?}.")]
	ParseArtifact { path: std::path::PathBuf, source: serde_json::Error },
	#[error("Failed to write corpus artifact at {path:?}.")]
	WriteArtifact { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to serialize corpus artifact.")]
	SerializeArtifact { source: serde_json::Error },
	#[error("{message}")]
	InvalidArtifact { message: String },
}
