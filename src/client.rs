use reqwest::header::REFERER;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while asking a question. The widget treats
/// all of them the same way; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("malformed response body: {0}")]
    Body(String),
}

#[derive(Deserialize)]
struct AskResponse {
    response: String,
}

/// Body of the scoring endpoint: one query and the three answers to grade
#[derive(Serialize)]
struct ScoreRequest<'a> {
    query: &'a str,
    response_1: &'a str,
    response_2: &'a str,
    response_3: &'a str,
}

#[derive(Deserialize)]
struct ScoreResponse {
    deepseek_scoring: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for the question endpoint and the landing page it lives behind.
///
/// Cookies are kept between calls so the `csrftoken` cookie handed out with
/// the landing page goes back with every question.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl AskClient {
    pub fn new(base_url: &str) -> Result<Self, AskError> {
        let client = Client::builder().cookie_store(true).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
        })
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Fetch the landing page markup
    pub async fn fetch_page(&self) -> Result<String, AskError> {
        let url = format!("{}/", self.base_url);

        let response = self.client.get(&url).send().await?;
        success_body(response).await
    }

    /// POST one question to `/ask/` and return the answer text
    pub async fn ask(&self, question: &str) -> Result<String, AskError> {
        let url = format!("{}/ask/", self.base_url);

        // form() sets Content-Type: application/x-www-form-urlencoded
        let mut request = self
            .client
            .post(&url)
            .header(REFERER, format!("{}/", self.base_url))
            .form(&[("question", question)]);

        if let Some(token) = &self.csrf_token {
            request = request.header("X-CSRFToken", token.as_str());
        }

        let body = success_body(request.send().await?).await?;

        let answer: AskResponse =
            serde_json::from_str(&body).map_err(|e| AskError::Body(e.to_string()))?;
        Ok(answer.response)
    }

    /// Have the server grade three candidate answers to `query`. The endpoint
    /// takes JSON and is exempt from the CSRF check, so no token is sent.
    pub async fn score(&self, query: &str, responses: [&str; 3]) -> Result<String, AskError> {
        let url = format!("{}/deepseek-score/", self.base_url);
        let [response_1, response_2, response_3] = responses;

        let request = ScoreRequest {
            query,
            response_1,
            response_2,
            response_3,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let body = success_body(response).await?;

        let scored: ScoreResponse =
            serde_json::from_str(&body).map_err(|e| AskError::Body(e.to_string()))?;
        Ok(scored.deepseek_scoring)
    }
}

async fn success_body(response: Response) -> Result<String, AskError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(AskError::Status {
            status,
            message: error_message(&body),
        });
    }

    Ok(body)
}

/// Pull the server's `{"error": ...}` text out of a failed response, falling
/// back to the start of the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.chars().take(200).collect(),
    }
}
