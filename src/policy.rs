//! Skip policy: the pure decision of whether a run picks a file up at all.

use crate::config::SkipFlags;
use crate::ledger::ExecutionStatus;

/// Decide whether to skip a file given its last known status and the run's
/// flags. `None` means the file was never attempted.
///
/// `retry_pending` is deliberately absent here: it only controls whether the
/// driver honors a stored resume handle. `skip_pending` therefore wins when
/// both are set, because skipped files never reach the driver.
pub fn should_skip(existing: Option<ExecutionStatus>, flags: &SkipFlags) -> bool {
    match existing {
        None => flags.skip_unprocessed,
        Some(ExecutionStatus::Completed) => true,
        Some(ExecutionStatus::Error) => !flags.retry_failed,
        Some(ExecutionStatus::Starting) | Some(ExecutionStatus::Pending) => flags.skip_pending,
    }
}

/// Name the flag responsible for a skip, for the warning log.
pub fn skip_reason(existing: Option<ExecutionStatus>, flags: &SkipFlags) -> Option<&'static str> {
    if !should_skip(existing, flags) {
        return None;
    }
    Some(match existing {
        None => "skip_unprocessed",
        Some(ExecutionStatus::Completed) => "already completed",
        Some(ExecutionStatus::Error) => "retry_failed not set",
        Some(_) => "skip_pending",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(
        retry_failed: bool,
        retry_pending: bool,
        skip_pending: bool,
        skip_unprocessed: bool,
    ) -> SkipFlags {
        SkipFlags {
            retry_failed,
            retry_pending,
            skip_pending,
            skip_unprocessed,
        }
    }

    /// Every combination of stored status and flag values has a defined
    /// outcome, matching the decision table.
    #[test]
    fn test_decision_table_is_total() {
        let statuses = [
            None,
            Some(ExecutionStatus::Starting),
            Some(ExecutionStatus::Pending),
            Some(ExecutionStatus::Completed),
            Some(ExecutionStatus::Error),
        ];

        for status in statuses {
            for bits in 0..16u8 {
                let f = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
                let expected = match status {
                    None => f.skip_unprocessed,
                    Some(ExecutionStatus::Completed) => true,
                    Some(ExecutionStatus::Error) => !f.retry_failed,
                    Some(_) => f.skip_pending,
                };
                assert_eq!(
                    should_skip(status, &f),
                    expected,
                    "status {status:?}, flags {f:?}"
                );
            }
        }
    }

    #[test]
    fn test_completed_always_skips() {
        let f = flags(true, true, false, false);
        assert!(should_skip(Some(ExecutionStatus::Completed), &f));
    }

    #[test]
    fn test_error_retried_only_with_flag() {
        assert!(should_skip(
            Some(ExecutionStatus::Error),
            &flags(false, false, false, false)
        ));
        assert!(!should_skip(
            Some(ExecutionStatus::Error),
            &flags(true, false, false, false)
        ));
    }

    #[test]
    fn test_skip_pending_wins_over_retry_pending() {
        let f = flags(false, true, true, false);
        assert!(should_skip(Some(ExecutionStatus::Pending), &f));
        assert!(should_skip(Some(ExecutionStatus::Starting), &f));
    }

    #[test]
    fn test_unprocessed_skipped_only_with_flag() {
        assert!(!should_skip(None, &flags(false, false, false, false)));
        assert!(should_skip(None, &flags(false, false, false, true)));
    }

    #[test]
    fn test_skip_reason_names_the_flag() {
        assert_eq!(
            skip_reason(None, &flags(false, false, false, true)),
            Some("skip_unprocessed")
        );
        assert_eq!(
            skip_reason(Some(ExecutionStatus::Completed), &flags(true, true, true, true)),
            Some("already completed")
        );
        assert_eq!(skip_reason(None, &flags(false, false, false, false)), None);
    }
}
