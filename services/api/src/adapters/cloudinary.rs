//! services/api/src/adapters/cloudinary.rs
//!
//! This module contains the adapter for Cloudinary's unsigned image upload API.
//! It implements the `MediaHost` port from the `core` crate.

use async_trait::async_trait;
use huella_core::domain::PhotoUpload;
use huella_core::ports::{MediaHost, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MediaHost` port using an unsigned upload preset.
#[derive(Clone)]
pub struct CloudinaryAdapter {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryAdapter {
    /// Creates a new `CloudinaryAdapter` for the given cloud and preset.
    pub fn new(client: reqwest::Client, cloud_name: &str, upload_preset: &str) -> Self {
        Self {
            client,
            upload_url: format!("https://api.cloudinary.com/v1_1/{}/image/upload", cloud_name),
            upload_preset: upload_preset.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

//=========================================================================================
// `MediaHost` Trait Implementation
//=========================================================================================

#[async_trait]
impl MediaHost for CloudinaryAdapter {
    /// Uploads one image and returns its `secure_url`.
    async fn upload(&self, photo: &PhotoUpload) -> PortResult<String> {
        let part = Part::bytes(photo.bytes.to_vec())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.content_type)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Image host answered {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(body.secure_url)
    }
}
