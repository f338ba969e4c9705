//! Filesystem-backed object storage with signed, time-boxed URLs.
//!
//! Objects live under `root` at their object name. Access URLs look like
//! `{public_url}/{object}?expires=<unix>&signature=<hex>` where the signature is
//! `HMAC-SHA256(key, object|expires)`. The `/files` route checks them with [`LocalObjectStorage::verify`].

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::BaseObjectStorage;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    /// Base URL the `/files` route is reachable at
    pub public_url: String,
    pub signing_key: String,
    /// Lifetime of URLs handed to the extraction provider
    pub url_ttl: Duration,
}

pub struct LocalObjectStorage {
    config: StorageConfig,
}

impl LocalObjectStorage {
    pub fn new(mut config: StorageConfig) -> Self {
        config.public_url = config.public_url.trim_end_matches('/').to_string();
        Self { config }
    }

    pub fn url_ttl(&self) -> Duration {
        self.config.url_ttl
    }

    /// On-disk location of an object. Rejects names that could escape `root`.
    pub fn path_for(&self, object_name: &str) -> Result<PathBuf> {
        let relative = Path::new(object_name);
        let safe = !object_name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            bail!("invalid object name: {}", object_name);
        }
        Ok(self.config.root.join(relative))
    }

    fn mac(&self, object_name: &str, expires: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.config.signing_key.as_bytes())
            .context("invalid URL signing key")?;
        mac.update(object_name.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    /// Signed URL for `object_name` valid until the unix timestamp `expires`.
    pub fn signed_url(&self, object_name: &str, expires: i64) -> Result<String> {
        let signature = hex::encode(self.mac(object_name, expires)?.finalize().into_bytes());
        let encoded: Vec<_> = object_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.config.public_url,
            encoded.join("/"),
            expires,
            signature
        ))
    }

    /// Whether a download request carries a valid, unexpired signature.
    pub fn verify(&self, object_name: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        let Ok(tag) = hex::decode(signature) else {
            return false;
        };
        self.mac(object_name, expires)
            .map(|mac| mac.verify_slice(&tag).is_ok())
            .unwrap_or(false)
    }

    pub async fn read(&self, object_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(object_name)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

#[async_trait]
impl BaseObjectStorage for LocalObjectStorage {
    async fn upload(&self, object_name: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.path_for(object_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let size = data.len();
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!(object = %object_name, size, content_type, "Stored object");
        Ok(())
    }

    async fn presigned_url(&self, object_name: &str, expires_in: Duration) -> Result<String> {
        self.path_for(object_name)?;
        let ttl = chrono::Duration::from_std(expires_in).context("URL lifetime out of range")?;
        let expires = (Utc::now() + ttl).timestamp();
        self.signed_url(object_name, expires)
    }

    async fn delete(&self, object_name: &str) -> Result<()> {
        let path = self.path_for(object_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}
