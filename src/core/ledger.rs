use crate::error::BalanceError;
use crate::model::leave::LeaveBalance;

impl LeaveBalance {
    pub fn available(&self) -> i64 {
        self.entitled - self.consumed - self.reserved
    }
}

/// Holds `units` against the balance when a leave request is submitted.
pub fn reserve(balance: &LeaveBalance, units: i64) -> Result<LeaveBalance, BalanceError> {
    if units > balance.available() {
        return Err(BalanceError::InsufficientBalance);
    }
    Ok(LeaveBalance {
        reserved: balance.reserved + units,
        ..snapshot(balance)
    })
}

/// Moves a reservation into consumption on approval. The caller guards
/// double-commit with the request-id idempotency key; this only does the
/// arithmetic and keeps the ledger invariant.
pub fn commit(balance: &LeaveBalance, units: i64) -> Result<LeaveBalance, BalanceError> {
    if units > balance.reserved {
        // A commit larger than what was reserved means the request was
        // already processed (or never reserved).
        return Err(BalanceError::DoubleCommit);
    }
    Ok(LeaveBalance {
        reserved: balance.reserved - units,
        consumed: balance.consumed + units,
        ..snapshot(balance)
    })
}

/// Returns a reservation to the available pool on rejection.
pub fn release(balance: &LeaveBalance, units: i64) -> LeaveBalance {
    LeaveBalance {
        reserved: (balance.reserved - units).max(0),
        ..snapshot(balance)
    }
}

fn snapshot(b: &LeaveBalance) -> LeaveBalance {
    LeaveBalance {
        employee_id: b.employee_id,
        leave_type: b.leave_type.clone(),
        entitled: b.entitled,
        consumed: b.consumed,
        reserved: b.reserved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(entitled: i64, consumed: i64, reserved: i64) -> LeaveBalance {
        LeaveBalance {
            employee_id: 1000,
            leave_type: "annual".into(),
            entitled,
            consumed,
            reserved,
        }
    }

    #[test]
    fn reserve_up_to_entitlement_then_fail() {
        let b = reserve(&balance(5, 0, 0), 5).unwrap();
        assert_eq!(b.reserved, 5);
        assert_eq!(b.available(), 0);
        assert_eq!(
            reserve(&b, 1).unwrap_err(),
            BalanceError::InsufficientBalance
        );
    }

    #[test]
    fn reserve_counts_consumed_units() {
        assert_eq!(
            reserve(&balance(10, 8, 0), 3).unwrap_err(),
            BalanceError::InsufficientBalance
        );
        assert!(reserve(&balance(10, 8, 0), 2).is_ok());
    }

    #[test]
    fn commit_moves_reserved_to_consumed() {
        let b = commit(&balance(10, 2, 3), 3).unwrap();
        assert_eq!(b.consumed, 5);
        assert_eq!(b.reserved, 0);
        assert_eq!(b.available(), 5);
    }

    #[test]
    fn commit_beyond_reservation_is_double_commit() {
        let b = commit(&balance(10, 2, 3), 3).unwrap();
        assert_eq!(commit(&b, 3).unwrap_err(), BalanceError::DoubleCommit);
    }

    #[test]
    fn release_returns_units_to_available() {
        let b = release(&balance(10, 2, 3), 3);
        assert_eq!(b.reserved, 0);
        assert_eq!(b.consumed, 2);
        assert_eq!(b.available(), 8);
    }

    #[test]
    fn invariant_holds_after_each_operation() {
        let mut b = balance(20, 0, 0);
        for units in [5, 3, 7] {
            b = reserve(&b, units).unwrap();
            assert!(b.consumed + b.reserved <= b.entitled);
        }
        b = commit(&b, 5).unwrap();
        assert!(b.consumed + b.reserved <= b.entitled);
        b = release(&b, 3);
        assert!(b.consumed + b.reserved <= b.entitled);
    }
}
