use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

const FROM_PENDING: &[RequestStatus] =
    &[RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Rejected];
const FROM_APPROVED: &[RequestStatus] = &[RequestStatus::Approved, RequestStatus::Fulfilled];
const FROM_REJECTED: &[RequestStatus] = &[RequestStatus::Rejected];
const FROM_FULFILLED: &[RequestStatus] = &[RequestStatus::Fulfilled];

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] =
        [Self::Pending, Self::Approved, Self::Rejected, Self::Fulfilled];

    /// Status every new request starts in, whatever the caller submitted.
    pub const INITIAL: RequestStatus = RequestStatus::Pending;

    /// Statuses selectable from `self`, including the no-op reselection.
    pub fn allowed_transitions(self) -> &'static [RequestStatus] {
        match self {
            Self::Pending => FROM_PENDING,
            Self::Approved => FROM_APPROVED,
            Self::Rejected => FROM_REJECTED,
            Self::Fulfilled => FROM_FULFILLED,
        }
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn transition_to(self, next: RequestStatus) -> Result<RequestStatus, DomainError> {
        if self.can_transition_to(next) {
            return Ok(next);
        }

        Err(DomainError::InvalidStatusTransition { from: self, to: next })
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions() == [self]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Fulfilled => "fulfilled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "fulfilled" => Ok(Self::Fulfilled),
            other => Err(DomainError::validation(
                "status",
                format!("unknown status `{other}` (expected pending|approved|rejected|fulfilled)"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RequestStatus;
    use crate::errors::DomainError;

    #[test]
    fn pending_can_move_to_approved_or_rejected() {
        let allowed = RequestStatus::Pending.allowed_transitions();
        assert_eq!(
            allowed,
            [RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Rejected]
        );
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Fulfilled));
    }

    #[test]
    fn approved_can_only_be_fulfilled() {
        assert!(RequestStatus::Approved.can_transition_to(RequestStatus::Fulfilled));
        assert!(RequestStatus::Approved.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Rejected));
    }

    #[test]
    fn rejected_and_fulfilled_only_permit_self_loop() {
        for terminal in [RequestStatus::Rejected, RequestStatus::Fulfilled] {
            assert!(terminal.is_terminal());
            for next in RequestStatus::ALL {
                assert_eq!(terminal.can_transition_to(next), next == terminal);
            }
        }
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
    }

    #[test]
    fn every_pair_matches_the_table() {
        let expected = [
            (RequestStatus::Pending, RequestStatus::Pending, true),
            (RequestStatus::Pending, RequestStatus::Approved, true),
            (RequestStatus::Pending, RequestStatus::Rejected, true),
            (RequestStatus::Pending, RequestStatus::Fulfilled, false),
            (RequestStatus::Approved, RequestStatus::Pending, false),
            (RequestStatus::Approved, RequestStatus::Approved, true),
            (RequestStatus::Approved, RequestStatus::Rejected, false),
            (RequestStatus::Approved, RequestStatus::Fulfilled, true),
            (RequestStatus::Rejected, RequestStatus::Pending, false),
            (RequestStatus::Rejected, RequestStatus::Approved, false),
            (RequestStatus::Rejected, RequestStatus::Rejected, true),
            (RequestStatus::Rejected, RequestStatus::Fulfilled, false),
            (RequestStatus::Fulfilled, RequestStatus::Pending, false),
            (RequestStatus::Fulfilled, RequestStatus::Approved, false),
            (RequestStatus::Fulfilled, RequestStatus::Rejected, false),
            (RequestStatus::Fulfilled, RequestStatus::Fulfilled, true),
        ];

        for (from, to, allowed) in expected {
            assert_eq!(from.can_transition_to(to), allowed, "{from} -> {to}");
        }
    }

    #[test]
    fn blocked_transition_reports_both_ends() {
        let error = RequestStatus::Fulfilled
            .transition_to(RequestStatus::Pending)
            .expect_err("fulfilled -> pending should fail");

        assert_eq!(
            error,
            DomainError::InvalidStatusTransition {
                from: RequestStatus::Fulfilled,
                to: RequestStatus::Pending,
            }
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Approved ".parse::<RequestStatus>(), Ok(RequestStatus::Approved));
        assert!("cancelled".parse::<RequestStatus>().is_err());
    }
}
