use aws_sdk_s3::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::StorageError;
use crate::objects::{self, Precondition};

const JSON: Option<&str> = Some("application/json");

/// Load a JSON document from S3. Returns the value and its ETag.
pub async fn load_state<T: DeserializeOwned>(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<(T, String), StorageError> {
    let output = objects::get_object(client, bucket, key).await?;
    let value: T = serde_json::from_slice(&output.body)?;
    let etag = output.etag.unwrap_or_default();
    Ok((value, etag))
}

/// Like [`load_state`], but a missing key is `Ok(None)`.
pub async fn load_state_opt<T: DeserializeOwned>(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Option<(T, String)>, StorageError> {
    match load_state(client, bucket, key).await {
        Ok(found) => Ok(Some(found)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Create a JSON document. Fails with `Conflict` if the key already exists.
pub async fn create_state<T: Serialize>(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<String, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    objects::put_object(client, bucket, key, body, JSON, Precondition::IfAbsent)
        .await
        .map_err(|e| match e {
            StorageError::PreconditionFailed { key } => StorageError::Conflict { key },
            other => other,
        })
}

/// Save a JSON document with ETag optimistic locking.
pub async fn save_state_if_match<T: Serialize>(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &T,
    expected_etag: &str,
) -> Result<String, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    objects::put_object(
        client,
        bucket,
        key,
        body,
        JSON,
        Precondition::IfMatch(expected_etag),
    )
    .await
}
