use kiln_core::ControlPlaneConfig;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::error::ControlPlaneError;
use crate::resource::{RemoteResource, SandboxResource, UploadTicket};

/// Abstraction over the remote control plane for testability.
///
/// Production code uses [`HttpControlPlane`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ControlPlane: Send + Sync {
    /// Update an existing sandbox and request an upload destination.
    ///
    /// Returns [`ControlPlaneError::NotFound`] when no sandbox has that name.
    async fn update(
        &self,
        name: &str,
        resource: &SandboxResource,
    ) -> Result<UploadTicket, ControlPlaneError>;

    /// Create a sandbox and request an upload destination.
    async fn create(&self, resource: &SandboxResource) -> Result<UploadTicket, ControlPlaneError>;

    /// PUT a packaged build context to an upload destination.
    async fn upload(&self, url: &str, archive: Vec<u8>) -> Result<(), ControlPlaneError>;

    /// Fetch the current remote representation of a sandbox.
    async fn get(&self, name: &str) -> Result<RemoteResource, ControlPlaneError>;
}

/// Control plane reached over HTTPS.
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
    upload_url_header: String,
    token: Option<SecretString>,
}

impl HttpControlPlane {
    pub fn new(config: &ControlPlaneConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_owned(),
            upload_url_header: config.upload_url_header.clone(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on control-plane requests.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn sandbox_url(&self, name: &str) -> String {
        format!("{}/sandboxes/{name}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn request_upload(
        &self,
        name: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<UploadTicket, ControlPlaneError> {
        let response = self
            .authorize(request)
            .query(&[("upload", "true")])
            .send()
            .await
            .map_err(|e| ControlPlaneError::Request { source: e })?;

        let response = check_status(name, response).await?;
        let upload_url = response
            .headers()
            .get(self.upload_url_header.as_str())
            // arch-lint: allow(no-silent-result-drop) reason="a non-ASCII header is not a usable URL; reported as missing upload URL"
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(UploadTicket { upload_url })
    }
}

impl ControlPlane for HttpControlPlane {
    async fn update(
        &self,
        name: &str,
        resource: &SandboxResource,
    ) -> Result<UploadTicket, ControlPlaneError> {
        let request = self.http.put(self.sandbox_url(name)).json(resource);
        self.request_upload(name, request).await
    }

    async fn create(&self, resource: &SandboxResource) -> Result<UploadTicket, ControlPlaneError> {
        let request = self
            .http
            .post(format!("{}/sandboxes", self.base_url))
            .json(resource);
        self.request_upload(&resource.metadata.name, request).await
    }

    async fn upload(&self, url: &str, archive: Vec<u8>) -> Result<(), ControlPlaneError> {
        // Pre-signed destination: no bearer token
        let response = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(archive)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Request { source: e })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn get(&self, name: &str) -> Result<RemoteResource, ControlPlaneError> {
        let response = self
            .authorize(self.http.get(self.sandbox_url(name)))
            .send()
            .await
            .map_err(|e| ControlPlaneError::Request { source: e })?;

        check_status(name, response)
            .await?
            .json()
            .await
            .map_err(|e| ControlPlaneError::Decode { source: e })
    }
}

async fn check_status(
    name: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ControlPlaneError> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(ControlPlaneError::NotFound {
            name: name.to_owned(),
        }),
        _ => Err(status_error(response).await),
    }
}

async fn status_error(response: reqwest::Response) -> ControlPlaneError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {e}>"),
    };
    ControlPlaneError::Status { status, body }
}
