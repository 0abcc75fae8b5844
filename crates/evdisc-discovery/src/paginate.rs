use evdisc_core::{Event, RankedPage};

use crate::error::DiscoveryError;

/// Slices one 1-indexed page out of the fully filtered and ranked list.
///
/// `total` counts the whole input. An out-of-range page is an empty slice.
///
/// # Errors
///
/// Returns [`DiscoveryError::InvalidPage`] if `page < 1` or `page_size == 0`.
pub fn paginate(
    events: Vec<Event>,
    page: usize,
    page_size: usize,
) -> Result<RankedPage, DiscoveryError> {
    if page < 1 || page_size == 0 {
        return Err(DiscoveryError::InvalidPage { page, page_size });
    }

    let total = events.len();
    let offset = (page - 1).saturating_mul(page_size);
    let end = offset.saturating_add(page_size);

    let data: Vec<Event> = events.into_iter().skip(offset).take(page_size).collect();

    Ok(RankedPage {
        data,
        has_more: total > end,
        total,
    })
}
