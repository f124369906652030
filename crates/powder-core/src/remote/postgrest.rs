//! Supabase PostgREST implementation of the remote gateway.

use reqwest::{Client, RequestBuilder};

use super::{Collection, RemoteError, RemoteGateway, RemoteResult, Row, Scope};
use crate::auth::SessionHandle;
use crate::util::{api_error_message, normalize_base_url};

/// REST client for the `resorts`/`trips` tables
#[derive(Clone)]
pub struct PostgrestGateway {
    rest_url: String,
    anon_key: String,
    client: Client,
    session: SessionHandle,
}

impl std::fmt::Debug for PostgrestGateway {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PostgrestGateway")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PostgrestGateway {
    /// Build a gateway for the Supabase project at `url`.
    ///
    /// Requests are authorized with the access token of whatever session
    /// `session` holds at request time.
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        session: SessionHandle,
    ) -> RemoteResult<Self> {
        let base = normalize_base_url(url.as_ref(), "Supabase URL")
            .map_err(RemoteError::InvalidConfiguration)?;
        let rest_url = if base.ends_with("/rest/v1") {
            base
        } else {
            format!("{base}/rest/v1")
        };
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            client: Client::builder().build()?,
            session,
        })
    }

    #[must_use]
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.rest_url, collection.table_name())
    }

    fn row_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}?id=eq.{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn list_url(&self, collection: Collection, scope: &Scope) -> String {
        format!(
            "{}?select=*&group_id=eq.{}&order=created_at.asc",
            self.collection_url(collection),
            urlencoding::encode(scope.as_str())
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RemoteResult<RequestBuilder> {
        let access_token = self
            .session
            .access_token()
            .ok_or(RemoteError::Unauthenticated)?;
        Ok(request
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("Accept", "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = self.authorized(request)?.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(api_error_message(status.as_u16(), &body)));
        }
        Ok(response)
    }
}

impl RemoteGateway for PostgrestGateway {
    async fn create(&self, collection: Collection, row: Row) -> RemoteResult<Row> {
        let request = self
            .client
            .post(self.collection_url(collection))
            .header("Prefer", "return=representation")
            .json(&row);
        let mut rows = self.send(request).await?.json::<Vec<Row>>().await?;
        if rows.is_empty() {
            return Err(RemoteError::InvalidPayload(format!(
                "insert into {collection} returned no rows"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, collection: Collection, id: &str, row: Row) -> RemoteResult<()> {
        let request = self
            .client
            .patch(self.row_url(collection, id))
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
        let request = self
            .client
            .delete(self.row_url(collection, id))
            .header("Prefer", "return=minimal");
        self.send(request).await?;
        Ok(())
    }

    async fn list(&self, collection: Collection, scope: &Scope) -> RemoteResult<Vec<Row>> {
        let request = self.client.get(self.list_url(collection, scope));
        Ok(self.send(request).await?.json::<Vec<Row>>().await?)
    }
}
