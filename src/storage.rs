//! Image storage.
//!
//! Upload is one capability: hand over the bytes, get back a publicly
//! fetchable URL. The deployment picks a single implementation at startup;
//! handlers only see the trait object.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn upload(&self, data: Bytes, ext: &str) -> io::Result<String>;
}

/// Local-disk store serving files back under `public_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    pub async fn create(root: PathBuf, public_prefix: &str) -> io::Result<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_prefix: public_prefix.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, data: Bytes, ext: &str) -> io::Result<String> {
        let filename = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(self.root.join(&filename), &data).await?;
        Ok(format!("{}/{filename}", self.public_prefix))
    }
}

/// Accepts the image field only for the supported formats, keyed off the
/// client file name. Returns the normalized extension to store under.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    ALLOWED_EXTENSIONS.iter().find(|e| **e == ext).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("photo.jpg"), Some("jpg"));
        assert_eq!(allowed_extension("photo.JPEG"), Some("jpeg"));
        assert_eq!(allowed_extension("scan.PNG"), Some("png"));
        assert_eq!(allowed_extension("pic.webp"), Some("webp"));
        assert_eq!(allowed_extension("notes.pdf"), None);
        assert_eq!(allowed_extension("noextension"), None);
        assert_eq!(allowed_extension("archive.tar.gz"), None);
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let root = std::env::temp_dir().join(format!("campus-exchange-{}", Uuid::new_v4()));
        let store = LocalImageStore::create(root.clone(), "/uploads/listings/")
            .await
            .unwrap();

        let url = store.upload(Bytes::from_static(b"fake-jpeg"), "jpg").await.unwrap();
        assert!(url.starts_with("/uploads/listings/"), "got: {url}");
        assert!(url.ends_with(".jpg"), "got: {url}");

        let filename = url.rsplit_once('/').unwrap().1;
        let on_disk = tokio::fs::read(root.join(filename)).await.unwrap();
        assert_eq!(on_disk, b"fake-jpeg");

        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
