use serde::Serialize;

/// Canonical messages returned by mutating operations.
pub mod messages {
    pub const SUCCESSFUL_SAVE_CHANGES: &str = "Changes saved successfully.";
    pub const SUCCESSFUL_DELETE: &str = "Deleted successfully.";
    pub const NO_CLIENT_DATA: &str = "No input data received.";
    pub const NO_CHANGES_DETECTED: &str = "No changes detected to save.";
    pub const NO_RECORDS_TO_DELETE: &str = "No records found to delete.";
}

/// Outcome of a mutating operation: a success flag plus a message suitable
/// for direct display. Reads never produce one of these.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub successful: bool,
    pub message: String,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self { successful: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { successful: false, message: message.into() }
    }

    /// Success variant reported when change detection found nothing to write.
    pub fn no_changes() -> Self {
        Self::success(messages::NO_CHANGES_DETECTED)
    }

    pub fn is_no_changes(&self) -> bool {
        self.successful && self.message == messages::NO_CHANGES_DETECTED
    }
}

/// `OperationResult` that additionally carries a return payload.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResultOf<T> {
    pub successful: bool,
    pub message: String,
    pub value: Option<T>,
}

impl<T> OperationResultOf<T> {
    pub fn success(message: impl Into<String>, value: T) -> Self {
        Self { successful: true, message: message.into(), value: Some(value) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { successful: false, message: message.into(), value: None }
    }
}

impl<T> From<OperationResultOf<T>> for OperationResult {
    fn from(typed: OperationResultOf<T>) -> Self {
        Self { successful: typed.successful, message: typed.message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_flag_and_message() {
        let ok = OperationResult::success(messages::SUCCESSFUL_SAVE_CHANGES);
        assert!(ok.successful);
        assert_eq!(ok.message, messages::SUCCESSFUL_SAVE_CHANGES);

        let err = OperationResult::failure("boom");
        assert!(!err.successful);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn no_changes_is_a_success() {
        let r = OperationResult::no_changes();
        assert!(r.successful);
        assert!(r.is_no_changes());
        assert!(!OperationResult::success("other").is_no_changes());
    }

    #[test]
    fn typed_result_carries_payload() {
        let r = OperationResultOf::success("done", vec![1, 2, 3]);
        assert_eq!(r.value.as_deref(), Some(&[1, 2, 3][..]));

        let f: OperationResultOf<Vec<i64>> = OperationResultOf::failure("nope");
        assert!(f.value.is_none());

        let plain: OperationResult = f.into();
        assert!(!plain.successful);
    }
}
