pub type ServiceResult<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Book corpus is not loaded.")]
	CorpusUnavailable,
	#[error("Progress store is not configured.")]
	ProgressUnavailable,
}
