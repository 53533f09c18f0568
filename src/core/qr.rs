use chrono::NaiveDateTime;

use crate::error::ValidationError;
use crate::model::qr_token::QrToken;

/// What a successful scan entitles the caller to: the office this token
/// was minted for, so the handler can run the location cross-check when
/// policy demands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub office_id: u64,
}

/// Validates a scanned token that was found in storage. A missing token
/// is mapped to `InvalidToken` at the lookup site.
///
/// Expiry is checked before the active flag: an expired token reports
/// `ExpiredToken` no matter how it was deactivated.
pub fn validate_token(token: &QrToken, now: NaiveDateTime) -> Result<ScanOutcome, ValidationError> {
    if now > token.expires_at {
        return Err(ValidationError::ExpiredToken);
    }
    if !token.is_active {
        return Err(ValidationError::InactiveToken);
    }
    Ok(ScanOutcome {
        office_id: token.office_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn token(active: bool, expires_h: u32) -> QrToken {
        QrToken {
            code: "QR_HQ_test".into(),
            office_id: 7,
            is_active: active,
            expires_at: at(expires_h),
        }
    }

    #[test]
    fn valid_token_yields_office() {
        let out = validate_token(&token(true, 18), at(9)).unwrap();
        assert_eq!(out.office_id, 7);
    }

    #[test]
    fn expired_fails_regardless_of_active_flag() {
        for active in [true, false] {
            let err = validate_token(&token(active, 8), at(9)).unwrap_err();
            assert_eq!(err, ValidationError::ExpiredToken);
        }
    }

    #[test]
    fn inactive_fails_when_not_expired() {
        let err = validate_token(&token(false, 18), at(9)).unwrap_err();
        assert_eq!(err, ValidationError::InactiveToken);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        assert!(validate_token(&token(true, 9), at(9)).is_ok());
    }
}
