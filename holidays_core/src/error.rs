use std::error::Error as StdError;

/// Common error type for `holidays_core`.
///
/// Store and provider implementations should preserve the underlying error
/// chain where possible via `Error::backend` / `Error::external`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("external source error: {context}")]
    ExternalSource {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("external source error: {0}")]
    ExternalSourceMessage(String),

    /// The provider answered but refused the request (4xx other than 408/429).
    #[error("external source rejected request with status {status}: {message}")]
    ExternalRejected { status: u16, message: String },

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {0}")]
    BackendMessage(String),
}

impl Error {
    #[tracing::instrument(level = "debug", name = "holidays.error.backend", skip(source))]
    pub fn backend(
        context: impl Into<String> + std::fmt::Debug,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[tracing::instrument(level = "debug", name = "holidays.error.external", skip(source))]
    pub fn external(
        context: impl Into<String> + std::fmt::Debug,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::ExternalSource {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Convenience: wrap a reqwest failure into `ExternalSource`.
    pub fn external_reqwest(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::ExternalSource {
            context: "reqwest".into(),
            source: Box::new(source),
        }
    }

    /// Out-of-window year, shared by every year-bounded operation.
    pub fn year_out_of_range(year: i32, from_year: i32, to_year: i32) -> Self {
        Self::InvalidInput(format!(
            "year={year} is outside the allowed range {from_year}..={to_year}"
        ))
    }

    /// True for failures raised by the external provider.
    pub fn is_external(&self) -> bool {
        self.is_retryable() || matches!(self, Error::ExternalRejected { .. })
    }

    /// Transport failures and provider 5xx; a rejected request fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ExternalSource { .. } | Error::ExternalSourceMessage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
