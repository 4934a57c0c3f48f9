//! App-level (JWT authenticated) request layer.

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::{GitHubAppId, JwtGenerator};
use crate::client::{absolute_url, ApiClient, HttpRequest, HttpResponse, HttpTransport, Method, Params};
use crate::error::ApiError;

/// Sends requests as the app itself.
///
/// A new JWT is signed for every request; none is kept between calls.
pub(crate) struct AppConnection {
    app_id: GitHubAppId,
    signer: Arc<dyn JwtGenerator>,
    transport: Arc<dyn HttpTransport>,
    api_url: String,
}

impl AppConnection {
    pub(crate) fn new(
        app_id: GitHubAppId,
        signer: Arc<dyn JwtGenerator>,
        transport: Arc<dyn HttpTransport>,
        api_url: String,
    ) -> Self {
        Self {
            app_id,
            signer,
            transport,
            api_url,
        }
    }

    pub(crate) fn app_id(&self) -> GitHubAppId {
        self.app_id
    }
}

#[async_trait]
impl ApiClient for AppConnection {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Params,
    ) -> Result<HttpResponse, ApiError> {
        let jwt = self.signer.generate_jwt(self.app_id)?;

        let request = HttpRequest::new(method, absolute_url(&self.api_url, url))
            .with_header("Authorization", format!("Bearer {}", jwt.token()))
            .with_data(data);

        self.transport.send(request).await
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
