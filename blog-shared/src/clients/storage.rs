use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("bucket unreachable: {0}")]
    Unreachable(String),
}

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub public_url: String,
}

/// Media bucket on an S3-compatible object store.
///
/// Public URLs have the shape `{public_url}/{bucket}/{key}`; the same prefix
/// is used to map a stored URL back to its key.
#[derive(Clone)]
pub struct ObjectStorage {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl ObjectStorage {
    pub fn new(settings: &StorageSettings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "blog-storage",
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&settings.endpoint)
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        tracing::info!(endpoint = %settings.endpoint, bucket = %settings.bucket, "object storage client initialized");

        Self {
            client: S3Client::from_conf(config),
            bucket: settings.bucket.clone(),
            public_url: settings.public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create the bucket when missing. Failures are logged; an existing bucket
    /// owned by us is the common case.
    pub async fn ensure_bucket(&self) {
        if self.check().await.is_ok() {
            return;
        }
        if let Err(e) = self.client.create_bucket().bucket(&self.bucket).send().await {
            tracing::warn!(bucket = %self.bucket, error = %e, "could not create media bucket");
        }
    }

    /// Cheap reachability check used by the health endpoint.
    pub async fn check(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;
        Ok(())
    }

    /// Upload a file and return the public URL
    pub async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(self.public_url_for(key))
    }

    /// Delete an object
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;

        Ok(())
    }

    /// Delete every object behind `urls` that lives in this bucket. URLs
    /// pointing elsewhere are skipped. Returns how many objects were removed.
    pub async fn delete_urls<'a, I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut removed = 0;
        for key in urls.into_iter().filter_map(|u| self.key_from_url(u)) {
            match self.delete(&key).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(key = %key, error = %e, "media object not removed"),
            }
        }
        removed
    }

    pub fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }

    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.public_url, self.bucket);
        url.strip_prefix(&prefix)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> ObjectStorage {
        ObjectStorage::new(&StorageSettings {
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            access_key: "key".into(),
            secret_key: "secret".into(),
            bucket: "blog-media".into(),
            public_url: "https://cdn.example.com/".into(),
        })
    }

    #[test]
    fn public_url_and_key_round_trip() {
        let s = storage();
        let url = s.public_url_for("images/abc.jpg");
        assert_eq!(url, "https://cdn.example.com/blog-media/images/abc.jpg");
        assert_eq!(s.key_from_url(&url).as_deref(), Some("images/abc.jpg"));
    }

    #[test]
    fn foreign_urls_have_no_key() {
        let s = storage();
        assert!(s.key_from_url("https://elsewhere.example.com/blog-media/x.jpg").is_none());
        assert!(s.key_from_url("https://cdn.example.com/other-bucket/x.jpg").is_none());
        assert!(s.key_from_url("https://cdn.example.com/blog-media/").is_none());
    }
}
