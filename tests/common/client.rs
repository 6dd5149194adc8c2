//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per route. Redirects are not followed so tests
//! can assert on them.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Pages
    // ========================================================================

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    // ========================================================================
    // Submissions
    // ========================================================================

    /// Posts `data` as the `field` of a multipart form to `path`.
    pub async fn submit(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        data: Vec<u8>,
        json: bool,
    ) -> Response {
        let part = Part::bytes(data).file_name(file_name.to_string());
        let form = Form::new().part(field.to_string(), part);
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form);
        if json {
            request = request.header("Accept", "application/json");
        }
        request.send().await.expect("POST request failed")
    }

    pub async fn process_file(&self, file_name: &str, data: Vec<u8>) -> Response {
        self.submit("/process_file", "file", file_name, data, true)
            .await
    }

    pub async fn process_camera(&self, data: Vec<u8>) -> Response {
        self.submit("/process_camera", "camera_image", "capture.jpg", data, true)
            .await
    }

    /// Posts a form that carries no image at all.
    pub async fn submit_without_image(&self, path: &str) -> Response {
        let form = Form::new().text("note", "nothing attached");
        self.client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await
            .expect("POST request failed")
    }
}
