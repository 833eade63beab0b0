//! Relay-style cursor pagination
//!
//! One call is one page. The paginator fetches `first + 1` rows ordered
//! descending on the collection's pagination field, keeps `first` of them,
//! and reports whether the extra row existed as `hasNextPage`. Position is
//! carried entirely by the `after` cursor, so every call is independent.
//!
//! Rows with equal pagination values have no defined relative order. Paginate
//! on a monotonic field (an auto-increment key or a creation timestamp).

use crate::cursor::CursorCodec;
use crate::errors::RelayError;
use cache_system::{CacheKey, ResultCache};
use config::PaginationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use store_object::{
    FetchRequest, FilterExpression, Predicate, PredicateBuilder, QueryExecutor, SchemaDescriptor,
    SearchPredicateBuilder,
};
use type_mapping::{FieldValue, Row};

/// Arguments a resolver receives from its caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub filter: Option<FilterExpression>,
    pub search: Option<String>,
}

impl PaginationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<N> {
    pub cursor: String,
    pub node: N,
}

/// Serializes as `{__typename, edges: [{cursor, node}], pageInfo}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<N> {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub edges: Vec<Edge<N>>,
    pub page_info: PageInfo,
}

impl<N> Page<N> {
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// What a cached page fetch is keyed on. The source keeps two executors over
/// different data from sharing entries.
#[derive(Serialize)]
struct FetchScope<'a> {
    source: String,
    request: &'a FetchRequest,
}

#[derive(Debug, Clone)]
pub struct RelayPaginator {
    schema: Arc<SchemaDescriptor>,
    typename: String,
    default_first: i64,
    max_first: Option<i64>,
    cache: Option<(ResultCache, u64)>,
}

impl RelayPaginator {
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        let defaults = PaginationConfig::default();
        Self {
            typename: schema.collection().to_string(),
            schema,
            default_first: defaults.default_first,
            max_first: defaults.max_first,
            cache: None,
        }
    }

    /// Name reported as `__typename` (the collection name by default)
    pub fn with_typename(mut self, typename: &str) -> Self {
        self.typename = typename.to_string();
        self
    }

    pub fn with_config(mut self, config: &PaginationConfig) -> Self {
        self.default_first = config.default_first;
        self.max_first = config.max_first;
        self
    }

    /// Route fetches through `cache`, keeping fetched rows for `ttl_seconds`
    pub fn with_cache(mut self, cache: ResultCache, ttl_seconds: u64) -> Self {
        self.cache = Some((cache, ttl_seconds));
        self
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Page size for a requested `first`: absent or zero means the default,
    /// negative is rejected, anything above `max_first` is capped
    pub fn page_size(&self, first: Option<i64>) -> Result<i64, RelayError> {
        let size = match first {
            Some(n) if n < 0 => {
                return Err(RelayError::InvalidArgument(format!(
                    "first must not be negative, got {}",
                    n
                )));
            }
            Some(0) | None => self.default_first,
            Some(n) => n,
        };
        Ok(self.max_first.map_or(size, |max| size.min(max)))
    }

    /// The one-page-ahead fetch these arguments translate to
    pub fn build_request(&self, args: &PaginationArgs) -> Result<FetchRequest, RelayError> {
        let first = self.page_size(args.first)?;
        let field = self.schema.pagination_field();

        let mut predicate = match (&args.filter, args.search.as_deref()) {
            (Some(filter), _) if !filter.is_empty() => Some(PredicateBuilder::build(&self.schema, filter)?),
            (_, Some(term)) if !term.is_empty() => Some(SearchPredicateBuilder::build(&self.schema, term)),
            _ => None,
        };

        if let Some(cursor) = &args.after {
            let position = CursorCodec::decode(cursor, self.schema.collection(), field.field_type())?;
            crate::trace_log!(collection = self.schema.collection(), after = %position, "decoded cursor");

            let bound = Predicate::lt(field.name(), position);
            predicate = Some(match predicate {
                Some(p) => p.and_also(bound),
                None => bound,
            });
        }

        let mut request = FetchRequest::new(field.name(), first.saturating_add(1));
        request.predicate = predicate;
        Ok(request)
    }

    pub async fn paginate<E, F, N>(
        &self,
        executor: &E,
        args: &PaginationArgs,
        formatter: F,
    ) -> Result<Page<N>, RelayError>
    where
        E: QueryExecutor + ?Sized,
        F: Fn(&Row) -> N,
    {
        self.paginate_with_params(executor, args, BTreeMap::new(), formatter)
            .await
    }

    /// Paginate with named parameters for the executor (raw-query placeholders,
    /// or equality conditions for the structured and in-memory executors)
    pub async fn paginate_with_params<E, F, N>(
        &self,
        executor: &E,
        args: &PaginationArgs,
        params: BTreeMap<String, FieldValue>,
        formatter: F,
    ) -> Result<Page<N>, RelayError>
    where
        E: QueryExecutor + ?Sized,
        F: Fn(&Row) -> N,
    {
        let first = self.page_size(args.first)?;
        let request = self.build_request(args)?.with_params(params);
        let rows = self.fetch(executor, &request).await?;

        crate::debug_log!(
            collection = self.schema.collection(),
            requested = first,
            fetched = rows.len(),
            "fetched page"
        );

        Ok(self.assemble(rows, first, formatter))
    }

    async fn fetch<E>(&self, executor: &E, request: &FetchRequest) -> Result<Vec<Row>, RelayError>
    where
        E: QueryExecutor + ?Sized,
    {
        match &self.cache {
            None => Ok(executor.execute(request).await?),
            Some((cache, ttl)) => {
                let key = CacheKey::derive(
                    self.schema.collection(),
                    &FetchScope {
                        source: executor.source(),
                        request,
                    },
                )?;
                cache
                    .get_or_compute(&key, *ttl, move || async move {
                        executor.execute(request).await.map_err(RelayError::from)
                    })
                    .await
            }
        }
    }

    fn assemble<F, N>(&self, mut rows: Vec<Row>, first: i64, formatter: F) -> Page<N>
    where
        F: Fn(&Row) -> N,
    {
        let keep = usize::try_from(first).unwrap_or(usize::MAX);
        let has_next_page = rows.len() > keep;
        rows.truncate(keep);

        let collection = self.schema.collection();
        let field = self.schema.pagination_field().name();

        let edges: Vec<Edge<N>> = rows
            .iter()
            .map(|row| Edge {
                cursor: CursorCodec::encode_row(collection, row, field),
                node: formatter(row),
            })
            .collect();

        let page_info = PageInfo {
            has_next_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Page {
            typename: self.typename.clone(),
            edges,
            page_info,
        }
    }
}
