//! Shared domain status enums
//!
//! Every status is persisted as a smallint; the repr values are part of the
//! storage contract and must not be renumbered.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// CopyStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a physical book copy.
///
/// `Lost` is terminal; a lost copy is never loaned again. The status column
/// is the sole arbitration point for who gets a copy, so every transition
/// goes through a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum CopyStatus {
    Available = 0,
    OnLoan = 1,
    OnHold = 2,
    Lost = 3,
}

impl From<i16> for CopyStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => CopyStatus::OnLoan,
            2 => CopyStatus::OnHold,
            3 => CopyStatus::Lost,
            _ => CopyStatus::Available,
        }
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle: `OnLoan → {Returned, Overdue, Lost}` on return
/// processing; the sweeper moves `OnLoan → Overdue` without a return, and an
/// overdue loan is still collectible (`Overdue → {Returned, Lost}`).
/// `Returned` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LoanStatus {
    OnLoan = 0,
    Overdue = 1,
    Returned = 2,
    Lost = 3,
}

impl LoanStatus {
    /// A live loan still occupies its copy and counts against the loan cap.
    pub fn is_live(self) -> bool {
        matches!(self, LoanStatus::OnLoan | LoanStatus::Overdue)
    }
}

impl From<i16> for LoanStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LoanStatus::Overdue,
            2 => LoanStatus::Returned,
            3 => LoanStatus::Lost,
            _ => LoanStatus::OnLoan,
        }
    }
}

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ReservationStatus {
    Pending = 0,
    Notified = 1,
    Completed = 2,
    Canceled = 3,
}

impl ReservationStatus {
    /// Live reservations block duplicate queue entries and direct loans.
    pub fn is_live(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Notified)
    }
}

impl From<i16> for ReservationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ReservationStatus::Notified,
            2 => ReservationStatus::Completed,
            3 => ReservationStatus::Canceled,
            _ => ReservationStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// FineReason
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum FineReason {
    Overdue = 0,
    Lost = 1,
}

impl From<i16> for FineReason {
    fn from(v: i16) -> Self {
        match v {
            1 => FineReason::Lost,
            _ => FineReason::Overdue,
        }
    }
}

// ---------------------------------------------------------------------------
// AccountStatus
// ---------------------------------------------------------------------------

/// Member account standing. Only `Suspended` blocks borrowing and
/// reserving; `Inactive` flags an overdue debtor without gating new loans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AccountStatus {
    Active = 0,
    Inactive = 1,
    Suspended = 2,
}

impl From<i16> for AccountStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => AccountStatus::Inactive,
            2 => AccountStatus::Suspended,
            _ => AccountStatus::Active,
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum PaymentStatus {
    Pending = 0,
    Confirmed = 1,
    Failed = 2,
}

impl From<i16> for PaymentStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => PaymentStatus::Confirmed,
            2 => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_status_round_trip() {
        for s in [CopyStatus::Available, CopyStatus::OnLoan, CopyStatus::OnHold, CopyStatus::Lost] {
            assert_eq!(CopyStatus::from(s as i16), s);
        }
    }

    #[test]
    fn live_loan_statuses() {
        assert!(LoanStatus::OnLoan.is_live());
        assert!(LoanStatus::Overdue.is_live());
        assert!(!LoanStatus::Returned.is_live());
        assert!(!LoanStatus::Lost.is_live());
    }

    #[test]
    fn live_reservation_statuses() {
        assert!(ReservationStatus::Pending.is_live());
        assert!(ReservationStatus::Notified.is_live());
        assert!(!ReservationStatus::Completed.is_live());
        assert!(!ReservationStatus::Canceled.is_live());
    }
}
