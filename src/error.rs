// Domain errors for task operations

use thiserror::Error;

/// Failures caused by user input rather than storage
///
/// Store operations return `eyre::Result`; these travel inside the report and
/// can be recovered with `report.downcast_ref::<TaskError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid priority: {0} (expected high, medium or low)")]
    InvalidPriority(String),

    #[error("Invalid filter: {0} (expected all, completed or pending)")]
    InvalidFilter(String),

    #[error("Invalid due date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TaskError::Validation("title is required".to_string()).to_string(),
            "Validation failed: title is required"
        );
        assert_eq!(TaskError::NotFound("abc".to_string()).to_string(), "Task not found: abc");
    }

    #[test]
    fn test_downcast_from_report() {
        let report: eyre::Report = TaskError::NotFound("abc".to_string()).into();
        assert_eq!(
            report.downcast_ref::<TaskError>(),
            Some(&TaskError::NotFound("abc".to_string()))
        );
    }
}
