//! Table query builder for the REST API.

use std::fmt::Display;

use url::Url;

/// A `GET /rest/v1/<table>` query: equality filters, ordering and a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: &'static str,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl TableQuery {
    /// Select every column of `table`.
    #[must_use]
    pub const fn new(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Table being queried.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Keep rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Sort descending by `column`. Calls accumulate, first call sorts first.
    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(format!("{column}.desc"));
        self
    }

    /// Sort newest first.
    #[must_use]
    pub fn newest_first(self) -> Self {
        self.order_desc("created_at")
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Full request URL under `rest_base` (which must end in `/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the table name does not form a valid URL.
    pub fn url(&self, rest_base: &Url) -> Result<Url, url::ParseError> {
        let mut url = rest_base.join(self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, condition) in &self.filters {
                pairs.append_pair(column, condition);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }
}
