use serde_json::Value;

use crate::{
    analyze, build_from_cache, join_responses, load_records, normalize, resolve_fragments, DiffQuery, GraphqlRequest,
    OperationKind, Options, Prototype, QuellError, Response, Store, Transport, TypeMap,
};

/// Resolves queries against a normalized cache, fetching whatever is missing from a GraphQL
/// server.
///
/// The store & transport are handed in by the integrator, so a client can share a store with
/// other clients or persist it however it likes.
#[derive(Clone)]
pub struct QuellClient {
    store: Store,
    transport: Transport,
    type_map: TypeMap,
    options: Options,
}

impl QuellClient {
    pub fn new(store: Store, transport: Transport, type_map: TypeMap, options: Options) -> Self {
        QuellClient {
            store,
            transport,
            type_map,
            options,
        }
    }

    /// Resolves a query, using the cache where possible.
    ///
    /// Operations that can't be cached (mutations, queries with variables, etc.) are sent to
    /// the server untouched, and the servers response is returned as is.
    pub async fn resolve(&self, endpoint: &str, query: &str) -> Result<Response, QuellError> {
        let document = async_graphql_parser::parse_query(query)?;
        let analysis = analyze(&document, &self.type_map, &self.options.identifier_field)?;

        if analysis.kind == OperationKind::PassThrough {
            return self.pass_through(endpoint, query).await;
        }

        let mut prototype = match resolve_fragments(analysis.prototype, &analysis.fragments) {
            Ok(prototype) => prototype,
            Err(error) if error.forces_pass_through() => {
                tracing::warn!("{error}, the query will be passed through");
                return self.pass_through(endpoint, query).await;
            }
            Err(error) => return Err(error),
        };

        let records = load_records(&self.store, &prototype).await?;
        let read = build_from_cache(&mut prototype, &records);

        if read.is_miss() {
            tracing::debug!("nothing usable in the cache, fetching the full query");

            let data = self.fetch(endpoint, query).await?;
            self.write(&data, &prototype).await;

            return Ok(Response::miss(data));
        }

        let diff = DiffQuery::from_prototype(&prototype);
        if diff.is_empty() {
            tracing::debug!(hits = read.hits, "query resolved entirely from the cache");
            return Ok(Response::hit(read.data));
        }

        let diff = diff.to_string();
        tracing::debug!(hits = read.hits, "partial cache hit, fetching the missing fields:\n{diff}");

        let fetched = self.fetch(endpoint, &diff).await?;
        let joined = join_responses(&read.data, &fetched, &prototype);
        self.write(&joined, &prototype).await;

        Ok(Response::partial_hit(joined))
    }

    /// Removes everything from the store
    pub async fn clear_cache(&self) -> Result<(), QuellError> {
        self.store.clear().await?;
        Ok(())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    async fn pass_through(&self, endpoint: &str, query: &str) -> Result<Response, QuellError> {
        let body = self.transport.send(self.request(endpoint, query)).await?;
        Ok(Response::pass_through(body))
    }

    async fn fetch(&self, endpoint: &str, query: &str) -> Result<Value, QuellError> {
        Ok(self.transport.fetch_data(self.request(endpoint, query)).await?)
    }

    fn request<'a>(&'a self, endpoint: &'a str, query: &'a str) -> GraphqlRequest<'a> {
        GraphqlRequest {
            endpoint,
            query,
            headers: &self.options.headers,
        }
    }

    /// Writes data into the store.
    ///
    /// Failures are logged rather than returned, the caller already has its data.
    async fn write(&self, data: &Value, prototype: &Prototype) {
        let records = normalize(data, prototype, &self.options.identifier_field);

        if let Err(error) = self.store.write_records(records).await {
            tracing::warn!("could not write to the cache: {error}");
        }
    }
}
