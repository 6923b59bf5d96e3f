use thiserror::Error;

/// Failure reported by a host capability.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("capability not supported: {0}")]
    NotSupported(String),
    #[error("request refused: {0}")]
    Refused(String),
    #[error("element is detached from the document")]
    Detached,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Other(String),
}

/// Every failure this crate can observe, classified by how it is handled.
///
/// None of these are fatal to the host page. Only [`PipError::Unavailable`]
/// is ever shown to the user; the others are logged or silently dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipError {
    #[error("picture-in-picture unavailable: {0}")]
    Unavailable(String),

    #[error("video is no longer in the document")]
    StaleReference,

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("rejected by policy: {0}")]
    PolicyReject(String),
}

impl PipError {
    pub fn is_user_visible(&self) -> bool {
        matches!(self, PipError::Unavailable(_))
    }

    pub fn policy(reason: impl Into<String>) -> Self {
        PipError::PolicyReject(reason.into())
    }
}

/// Which host capability a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Pip,
    MediaSession,
    Storage,
    Element,
}

impl Capability {
    fn label(self) -> &'static str {
        match self {
            Capability::Pip => "pip",
            Capability::MediaSession => "media-session",
            Capability::Storage => "storage",
            Capability::Element => "element",
        }
    }
}

/// Map a host failure onto the taxonomy.
pub fn classify(capability: Capability, err: HostError) -> PipError {
    match (capability, err) {
        (_, HostError::Detached) => PipError::StaleReference,
        (Capability::Storage, e) => PipError::PersistenceFailure(e.to_string()),
        (_, e) => PipError::Unavailable(e.to_string()),
    }
}

/// Single adapter every capability call goes through.
///
/// Converts the host error, logs it once at the level its kind deserves and
/// hands the classified error back to the caller.
pub fn absorb<T>(
    capability: Capability,
    operation: &str,
    result: Result<T, HostError>,
) -> Result<T, PipError> {
    result.map_err(|e| {
        let classified = classify(capability, e);
        match &classified {
            PipError::StaleReference => {
                log::debug!("[{}] {} aborted: {}", capability.label(), operation, classified)
            }
            PipError::PersistenceFailure(_) | PipError::Unavailable(_) => {
                log::warn!("[{}] {} failed: {}", capability.label(), operation, classified)
            }
            PipError::PolicyReject(_) => {
                log::debug!("[{}] {} rejected: {}", capability.label(), operation, classified)
            }
        }
        classified
    })
}

/// [`absorb`] for fire-and-forget calls where the caller only cares about success.
pub fn best_effort<T>(
    capability: Capability,
    operation: &str,
    result: Result<T, HostError>,
) -> Option<T> {
    absorb(capability, operation, result).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_is_always_stale() {
        for cap in [
            Capability::Pip,
            Capability::MediaSession,
            Capability::Storage,
            Capability::Element,
        ] {
            assert_eq!(classify(cap, HostError::Detached), PipError::StaleReference);
        }
    }

    #[test]
    fn test_storage_failures_are_persistence() {
        let err = classify(Capability::Storage, HostError::Storage("quota".into()));
        assert!(matches!(err, PipError::PersistenceFailure(_)));
        assert!(!err.is_user_visible());
    }

    #[test]
    fn test_pip_refusal_is_unavailable() {
        let err = classify(Capability::Pip, HostError::Refused("no user gesture".into()));
        assert!(err.is_user_visible());
        assert!(err.to_string().contains("no user gesture"));
    }

    #[test]
    fn test_best_effort_swallows() {
        let r: Option<()> = best_effort(
            Capability::Element,
            "pause",
            Err(HostError::Other("boom".into())),
        );
        assert!(r.is_none());
        assert_eq!(best_effort(Capability::Element, "pause", Ok(3)), Some(3));
    }
}
