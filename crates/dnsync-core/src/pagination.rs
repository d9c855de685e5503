//! Page-by-page listing as a lazy stream
//!
//! The provider does not reliably report a total count, so the only
//! termination signal is a short page: a page with fewer items than were
//! requested is the last one. [`paginate`] hides that rule behind a finite,
//! non-restartable stream of items.

use crate::error::{Error, Result};
use futures_util::stream::{self, Stream, TryStreamExt};
use std::future::Future;

/// One page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// Requested page size
    pub per_page: u32,
}

/// Stream every item of a paginated listing
///
/// `fetch` is called with page 1, 2, ... until it returns fewer than
/// `per_page` items. The first error ends the stream.
pub fn paginate<T, F, Fut>(per_page: u32, mut fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let per_page = per_page.max(1);

    stream::try_unfold(Some(1u32), move |next| {
        let request = next.map(|number| (number, fetch(Page { number, per_page })));

        async move {
            let Some((number, request)) = request else {
                return Ok::<_, Error>(None);
            };

            let items = request.await?;
            let next = if items.len() < per_page as usize {
                None
            } else {
                Some(number + 1)
            };

            Ok(Some((stream::iter(items.into_iter().map(Ok::<T, Error>)), next)))
        }
    })
    .try_flatten()
}
