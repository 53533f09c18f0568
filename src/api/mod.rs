pub mod attendance;
pub mod leave;
pub mod office;
pub mod qr;

/// Shared pagination clamping: page is 1-based, per_page capped at 100,
/// offset saturates instead of overflowing on absurd page numbers.
pub(crate) fn paginate(page: Option<u64>, per_page: Option<u64>) -> (u64, u64, u64) {
    let per_page = per_page.unwrap_or(10).min(100);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(per_page);
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::paginate;

    #[test]
    fn defaults_apply() {
        assert_eq!(paginate(None, None), (1, 10, 0));
    }

    #[test]
    fn per_page_is_capped() {
        assert_eq!(paginate(Some(2), Some(500)), (2, 100, 100));
    }

    #[test]
    fn zero_page_clamps_to_first() {
        assert_eq!(paginate(Some(0), Some(10)), (1, 10, 0));
    }

    #[test]
    fn large_page_numbers_pass_through_untruncated() {
        let big = u64::from(u32::MAX) + 5;
        let (page, per_page, offset) = paginate(Some(big), Some(10));
        assert_eq!(page, big);
        assert_eq!(per_page, 10);
        assert_eq!(offset, (big - 1) * 10);
    }

    #[test]
    fn offset_saturates_at_u64_max() {
        let (_, _, offset) = paginate(Some(u64::MAX), Some(100));
        assert_eq!(offset, u64::MAX);
    }
}
