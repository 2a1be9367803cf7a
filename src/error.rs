use crate::config::{Arch, Platform};

pub type Result<T, E = LaunchError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{platform} is not supported")]
    UnsupportedPlatform { platform: Platform },

    #[error("{arch} is not supported")]
    UnsupportedArchitecture { arch: Arch },

    #[error("failed to start `{program}`: {source}")]
    LaunchFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with code {code}")]
    /// `code` is the raw OS exit code; on Windows this includes NTSTATUS values
    /// such as `0xC0000005`.
    NonZeroExit { program: String, code: u32 },

    /// Only the last candidate's failure is kept.
    #[error("all {attempts} candidates failed, last: {last}")]
    AllCandidatesFailed {
        attempts: usize,
        #[source]
        last: Box<LaunchError>,
    },
}

impl LaunchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LaunchError::InvalidArgument(msg.into())
    }

    /// Exit code carried by a `NonZeroExit`, looking through fallback wrappers.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            LaunchError::NonZeroExit { code, .. } => Some(*code),
            LaunchError::AllCandidatesFailed { last, .. } => last.exit_code(),
            _ => None,
        }
    }
}

/// Registry lookup failure. `Clone` so memoized lookups can hand it out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{platform} is not supported")]
    UnsupportedPlatform { platform: Platform },

    #[error("{arch} is not supported")]
    UnsupportedArchitecture { arch: Arch },
}

impl From<RegistryError> for LaunchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnsupportedPlatform { platform } => {
                LaunchError::UnsupportedPlatform { platform }
            }
            RegistryError::UnsupportedArchitecture { arch } => {
                LaunchError::UnsupportedArchitecture { arch }
            }
        }
    }
}
