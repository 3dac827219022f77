use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Client;

use super::{ObjectInfo, ObjectStore, ObjectStoreError};

/// S3-compatible object store backend (MinIO, AWS S3).
///
/// Talks plain HTTP with hand-built SigV4 request signing and path-style
/// URLs, so it works against any S3-compatible endpoint without pulling in
/// a full SDK. The object description is stored as `x-amz-meta-description`.
pub struct S3Store {
    endpoint: String,
    host: String,
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
    client: Client,
}

const DESCRIPTION_HEADER: &str = "x-amz-meta-description";

impl S3Store {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();

        // The Host header participates in the signature, so derive it from
        // the endpoint exactly as reqwest will send it.
        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(&endpoint)
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if host.is_empty() {
            anyhow::bail!("invalid S3 endpoint: {endpoint}");
        }

        Ok(Self {
            endpoint,
            host,
            bucket: bucket.to_string(),
            region: region.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            client,
        })
    }

    fn object_uri(&self, name: &str) -> String {
        format!("/{}/{}", self.bucket, uri_encode(name, false))
    }

    fn bucket_uri(&self) -> String {
        format!("/{}", self.bucket)
    }

    /// Build the SigV4 Authorization header plus the x-amz-* headers that
    /// must accompany it. `extra_headers` are additional signed headers
    /// (lowercase names, already-valid values).
    fn sign(
        &self,
        method: &str,
        uri: &str,
        query: &str,
        body: &[u8],
        extra_headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex(ring::digest::digest(&ring::digest::SHA256, body).as_ref());

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), self.host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        for (k, v) in extra_headers {
            headers.push((k.to_string(), v.to_string()));
        }
        headers.sort();

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{}\n", v.trim()))
            .collect();
        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let scope = format!("{date_stamp}/{}/s3/aws4_request", self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex(ring::digest::digest(&ring::digest::SHA256, canonical_request.as_bytes()).as_ref())
        );

        // Derive the signing key: HMAC chain over date, region, service.
        let mut key = format!("AWS4{}", self.secret_key).into_bytes();
        for part in [date_stamp.as_str(), self.region.as_str(), "s3", "aws4_request"] {
            key = hmac_sha256(&key, part.as_bytes());
        }
        let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        );

        let mut out: Vec<(String, String)> = headers
            .into_iter()
            .filter(|(k, _)| k != "host")
            .collect();
        out.push(("authorization".to_string(), authorization));
        out
    }

    async fn send(
        &self,
        method: reqwest::Method,
        uri: &str,
        query: &str,
        body: Option<Bytes>,
        extra_headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let url = if query.is_empty() {
            format!("{}{uri}", self.endpoint)
        } else {
            format!("{}{uri}?{query}", self.endpoint)
        };

        let payload = body.clone().unwrap_or_default();
        let signed = self.sign(
            method.as_str(),
            uri,
            query,
            &payload,
            extra_headers,
            Utc::now(),
        );

        let mut req = self.client.request(method, url);
        for (k, v) in signed {
            req = req.header(k, v);
        }
        if let Some(data) = body {
            req = req.body(data);
        }

        req.send()
            .await
            .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))
    }

    fn info_from_headers(
        &self,
        name: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        let last_modified = headers
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                ObjectStoreError::Unavailable(format!("missing Last-Modified for {name}"))
            })?;

        let description = headers
            .get(DESCRIPTION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Ok(ObjectInfo {
            name: name.to_string(),
            last_modified,
            description,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        name: &str,
        data: Bytes,
        description: &str,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        if description.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) {
            return Err(ObjectStoreError::Unavailable(
                "description must be printable ASCII to travel as object metadata".to_string(),
            ));
        }

        let content_type = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let resp = self
            .send(
                reqwest::Method::PUT,
                &self.object_uri(name),
                "",
                Some(data),
                &[
                    ("content-type", content_type),
                    (DESCRIPTION_HEADER, description),
                ],
            )
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Unavailable(format!(
                "S3 upload failed ({status}): {body}"
            )));
        }

        // Read the object back for the backend's own last-modified. A put
        // whose outcome cannot be confirmed is reported as failed.
        self.stat(name)
            .await
            .map_err(|e| ObjectStoreError::WriteUnconfirmed(e.to_string()))
    }

    async fn stat(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError> {
        let resp = self
            .send(reqwest::Method::HEAD, &self.object_uri(name), "", None, &[])
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(name.to_string()));
        }
        if !resp.status().is_success() {
            return Err(ObjectStoreError::Unavailable(format!(
                "S3 stat failed ({})",
                resp.status()
            )));
        }

        self.info_from_headers(name, resp.headers())
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        let resp = self
            .send(
                reqwest::Method::GET,
                &self.bucket_uri(),
                "list-type=2",
                None,
                &[],
            )
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Unavailable(format!(
                "S3 list failed ({status}): {body}"
            )));
        }

        let xml = resp
            .text()
            .await
            .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))?;

        let mut infos = Vec::new();
        for key in extract_keys(&xml) {
            infos.push(self.stat(&key).await?);
        }
        Ok(infos)
    }

    async fn delete(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError> {
        let info = self.stat(name).await?;

        let resp = self
            .send(
                reqwest::Method::DELETE,
                &self.object_uri(name),
                "",
                None,
                &[],
            )
            .await?;

        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Unavailable(format!(
                "S3 delete failed ({status}): {body}"
            )));
        }

        Ok(info)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key);
    ring::hmac::sign(&key, data).as_ref().to_vec()
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Percent-encode per the SigV4 rules: unreserved characters pass through,
/// everything else is encoded. `encode_slash` controls whether `/` is kept
/// (paths) or escaped (query values).
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Pull the `<Key>` values out of a ListObjectsV2 response without a full
/// XML parser. S3 XML-escapes key contents, so unescape the five entities.
fn extract_keys(xml: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<Key>") {
        rest = &rest[start + 5..];
        if let Some(end) = rest.find("</Key>") {
            let raw = &rest[..end];
            keys.push(
                raw.replace("&lt;", "<")
                    .replace("&gt;", ">")
                    .replace("&quot;", "\"")
                    .replace("&apos;", "'")
                    .replace("&amp;", "&"),
            );
            rest = &rest[end + 6..];
        } else {
            break;
        }
    }
    keys
}
