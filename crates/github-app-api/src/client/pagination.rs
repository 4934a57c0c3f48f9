//! Pagination support for list endpoints.
//!
//! List endpoints return one page per request and advertise the following
//! page in the `Link` header:
//!
//! `<https://api.github.com/resource?page=2>; rel="next", <https://api.github.com/resource?page=5>; rel="last"`
//!
//! [`Paginator`] walks those links lazily: it fetches a page only once every
//! item of the previous page has been handed out, and stops at the first page
//! without a `next` link.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

use crate::client::{decode, ApiClient, Method, Params};
use crate::error::ApiError;

/// Navigation links extracted from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// URL for next page (if available)
    pub next: Option<String>,

    /// URL for previous page (if available)
    pub prev: Option<String>,

    /// URL for first page (if available)
    pub first: Option<String>,

    /// URL for last page (if available)
    pub last: Option<String>,
}

impl Pagination {
    /// Check if there are more pages available.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Check if there are previous pages available.
    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }
}

/// Parse pagination links from a `Link` header.
///
/// Unknown relations and malformed entries are ignored. A link may carry
/// several space separated relations (`rel="next last"`).
pub fn parse_link_header(link_header: Option<&str>) -> Pagination {
    let mut pagination = Pagination::default();

    let Some(header) = link_header else {
        return pagination;
    };

    for link in header.split(',') {
        let mut parts = link.split(';');

        let target = match parts.next().map(str::trim) {
            Some(t) if t.starts_with('<') && t.ends_with('>') => &t[1..t.len() - 1],
            _ => continue,
        };

        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("rel") {
                continue;
            }

            for rel in value.trim().trim_matches('"').split_whitespace() {
                let slot = match rel {
                    "next" => &mut pagination.next,
                    "prev" => &mut pagination.prev,
                    "first" => &mut pagination.first,
                    "last" => &mut pagination.last,
                    _ => continue,
                };
                slot.get_or_insert_with(|| target.to_string());
            }
        }
    }

    pagination
}

/// Split a decoded page into items.
///
/// Arrays yield their elements in order, objects yield their values, null
/// yields nothing and any other value is a single item.
pub(crate) fn page_items(page: Value) -> Vec<Value> {
    match page {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

type PageMapper<'a, T> = Box<dyn FnMut(Value) -> Result<Vec<T>, ApiError> + Send + 'a>;

/// Lazy single-pass cursor over a paginated GET endpoint.
///
/// The first request uses the initial URL and query. Every following request
/// uses the `next` link verbatim with an empty query, since the link already
/// carries the original parameters. Exactly one request is issued per page,
/// and only once the previous page has been drained.
///
/// Any failure (transport, decoding or mapping) is returned once; the cursor
/// is exhausted afterwards.
///
/// # Examples
///
/// ```no_run
/// # use github_app_api::client::{ApiClient, Params};
/// # async fn example(api: &impl ApiClient) -> Result<(), github_app_api::ApiError> {
/// let mut installations = api.get_all("/app/installations", Params::new());
/// while let Some(installation) = installations.try_next().await? {
///     println!("{}", installation["account"]["login"]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Paginator<'a, T> {
    client: &'a dyn ApiClient,
    next_url: Option<String>,
    query: Params,
    buffer: VecDeque<T>,
    mapper: PageMapper<'a, T>,
    pages_fetched: usize,
}

impl<'a> Paginator<'a, Value> {
    /// Create a cursor that yields the raw items of every page.
    pub fn new(client: &'a dyn ApiClient, url: impl Into<String>, query: Params) -> Self {
        Self::with_mapper(client, url, query, |page| Ok(page_items(page)))
    }
}

impl<'a, T> Paginator<'a, T> {
    /// Create a cursor that turns every decoded page into zero or more items.
    pub fn with_mapper<F>(
        client: &'a dyn ApiClient,
        url: impl Into<String>,
        query: Params,
        mapper: F,
    ) -> Self
    where
        F: FnMut(Value) -> Result<Vec<T>, ApiError> + Send + 'a,
    {
        Self {
            client,
            next_url: Some(url.into()),
            query,
            buffer: VecDeque::new(),
            mapper: Box::new(mapper),
            pages_fetched: 0,
        }
    }

    /// Create a cursor that converts every item of every page.
    pub fn with_item_mapper<F>(
        client: &'a dyn ApiClient,
        url: impl Into<String>,
        query: Params,
        mut convert: F,
    ) -> Self
    where
        F: FnMut(Value) -> Result<T, ApiError> + Send + 'a,
    {
        Self::with_mapper(client, url, query, move |page| {
            page_items(page).into_iter().map(&mut convert).collect()
        })
    }

    /// Get the next item, fetching the next page when the current one is
    /// drained.
    ///
    /// Returns `Ok(None)` once a page without a `next` link has been drained.
    pub async fn try_next(&mut self) -> Result<Option<T>, ApiError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            let Some(url) = self.next_url.take() else {
                return Ok(None);
            };
            let query = std::mem::take(&mut self.query);

            debug!(url = %url, page = self.pages_fetched + 1, "Fetching page");

            let response = self.client.request(Method::Get, &url, query).await?;
            self.pages_fetched += 1;

            let items = (self.mapper)(decode(&response)?)?;
            self.buffer.extend(items);

            // Servers may split links over several `Link` lines.
            let links = response.header_values("link").collect::<Vec<_>>().join(", ");
            self.next_url = parse_link_header(Some(links.as_str())).next;
        }
    }

    /// Drain the cursor into a vector.
    pub async fn try_collect(mut self) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Number of page requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Check whether the cursor can yield no further items.
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty() && self.next_url.is_none()
    }
}

impl<T> std::fmt::Debug for Paginator<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("next_url", &self.next_url)
            .field("buffered", &self.buffer.len())
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
