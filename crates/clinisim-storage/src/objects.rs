use aws_sdk_s3::Client;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_smithy_types::byte_stream::ByteStream;

use crate::error::StorageError;

/// An object's bytes and the ETag that identifies this version.
pub struct GetObjectOutput {
    pub body: Vec<u8>,
    pub etag: Option<String>,
}

/// Fetch an object. A missing key is `NotFound`.
pub async fn get_object(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<GetObjectOutput, StorageError> {
    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_no_such_key() {
                StorageError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StorageError::GetObject(err.to_string())
            }
        })?;

    let etag = resp.e_tag().map(|s| s.to_string());
    let body = resp
        .body
        .collect()
        .await
        .map_err(|e| StorageError::GetObject(e.to_string()))?
        .into_bytes()
        .to_vec();

    Ok(GetObjectOutput { body, etag })
}

/// Which conditional header, if any, guards a PUT.
#[derive(Debug, Clone, Copy)]
pub enum Precondition<'a> {
    None,
    /// Overwrite only the version with this ETag.
    IfMatch(&'a str),
    /// Create only; fail if any version exists.
    IfAbsent,
}

/// Put an object to S3. Returns the new ETag.
///
/// A failed precondition maps to `StorageError::PreconditionFailed`. S3
/// reports this as 412, or as 409 `ConditionalRequestConflict` when another
/// conditional write to the same key is in flight.
pub async fn put_object(
    client: &Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: Option<&str>,
    precondition: Precondition<'_>,
) -> Result<String, StorageError> {
    let mut req = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body));

    if let Some(ct) = content_type {
        req = req.content_type(ct);
    }
    req = match precondition {
        Precondition::None => req,
        Precondition::IfMatch(etag) => req.if_match(etag),
        Precondition::IfAbsent => req.if_none_match("*"),
    };

    let resp = req.send().await.map_err(|e| {
        let err = e.into_service_error();
        let message = err.to_string();
        if message.contains("PreconditionFailed") || message.contains("ConditionalRequestConflict")
        {
            StorageError::PreconditionFailed {
                key: key.to_string(),
            }
        } else {
            StorageError::PutObject(message)
        }
    })?;

    Ok(resp.e_tag().unwrap_or_default().to_string())
}

/// Delete one object. Deleting a missing key succeeds.
pub async fn delete_object(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<(), StorageError> {
    client
        .delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| StorageError::DeleteObject(e.into_service_error().to_string()))?;

    Ok(())
}

/// DeleteObjects accepts at most this many keys per request.
const DELETE_BATCH: usize = 1000;

/// Delete all objects under a prefix, in batches. Returns the number
/// deleted.
pub async fn delete_objects_by_prefix(
    client: &Client,
    bucket: &str,
    prefix: &str,
) -> Result<usize, StorageError> {
    let keys = list_objects(client, bucket, prefix).await?;
    for batch in keys.chunks(DELETE_BATCH) {
        let objects = batch
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::DeleteObject(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::DeleteObject(e.to_string()))?;
        client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| StorageError::DeleteObject(e.into_service_error().to_string()))?;
    }
    Ok(keys.len())
}

/// Keys under a prefix, across all result pages.
pub async fn list_objects(
    client: &Client,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>, StorageError> {
    let mut pages = client
        .list_objects_v2()
        .bucket(bucket)
        .prefix(prefix)
        .into_paginator()
        .send();

    let mut keys = Vec::new();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| StorageError::ListObjects(e.into_service_error().to_string()))?;
        keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_string)));
    }
    Ok(keys)
}
