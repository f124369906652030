//! Supabase Storage client

use reqwest::Client;

use super::ObjectStorage;
use crate::auth::SessionHandle;
use crate::util::{api_error_message, normalize_base_url};
use crate::{Error, Result};

/// Uploads to one public bucket of a Supabase project
#[derive(Clone)]
pub struct SupabaseStorage {
    storage_url: String,
    bucket: String,
    anon_key: String,
    client: Client,
    session: SessionHandle,
}

impl SupabaseStorage {
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
        session: SessionHandle,
    ) -> Result<Self> {
        let base = normalize_base_url(url.as_ref(), "Supabase URL").map_err(Error::InvalidInput)?;
        let bucket = super::sanitize_segment(&bucket.into());
        if bucket.is_empty() {
            return Err(Error::InvalidInput(
                "Storage bucket must not be empty".to_string(),
            ));
        }

        Ok(Self {
            storage_url: format!("{base}/storage/v1"),
            bucket,
            anon_key: anon_key.into().trim().to_string(),
            client: Client::builder()
                .build()
                .map_err(|error| Error::Storage(error.to_string()))?,
            session,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            self.bucket,
            path.trim_matches('/')
        )
    }
}

impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let access_token = self
            .session
            .access_token()
            .ok_or_else(|| Error::Storage("upload requires a signed-in session".to_string()))?;
        let path = path.trim_matches('/').to_string();

        let response = self
            .client
            .post(self.object_url(&path))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|error| Error::Storage(format!("Upload request failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Upload failed: {}",
                api_error_message(status.as_u16(), &body)
            )));
        }
        Ok(path)
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            self.bucket,
            path.trim_matches('/')
        )
    }
}
