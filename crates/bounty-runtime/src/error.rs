use thiserror::Error;

#[derive(Debug, Error)]
/// Error surface for the command handlers.
///
/// `Rejected` is a policy refusal that has already been explained to the user
/// on the issue thread; the run result carries its message but no further
/// comment is owed. `Api` wraps GitHub or backend failures that the caller
/// still has to surface.
pub enum StartStopError {
    #[error("{message}")]
    Rejected { message: String },
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl StartStopError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

pub type HandlerResult<T> = Result<T, StartStopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_rejection_keeps_message_and_classification() {
        let error = StartStopError::rejected("This issue is closed, please choose another.");
        assert!(error.is_rejection());
        assert_eq!(
            error.to_string(),
            "This issue is closed, please choose another."
        );
    }

    #[test]
    fn unit_api_errors_are_not_rejections() {
        let error = StartStopError::from(anyhow::anyhow!("github api create issue comment failed"));
        assert!(!error.is_rejection());
    }
}
