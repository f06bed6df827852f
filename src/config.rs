//! Client configuration for the NCBI E-utilities endpoints
//!
//! Holds credentials, numeric limits and the retry policy, and builds the two
//! request URLs the retriever issues.

use std::env;
use std::time::Duration;

use crate::retry::RetryConfig;

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_EMAIL: &str = "your_email@example.com";
const DEFAULT_TOOL: &str = "pubmed-retriever";

/// Configuration for [`PubMedClient`](crate::PubMedClient)
///
/// # Example
///
/// ```
/// use pubmed_retriever::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_api_key("your_api_key_here")
///     .with_email("researcher@university.edu")
///     .with_top_k_results(5)
///     .with_initial_backoff(Duration::from_millis(500));
///
/// assert_eq!(config.top_k_results, 5);
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// NCBI API key; omitted from requests when unset or empty
    pub api_key: Option<String>,
    /// Contact address sent with every request
    pub email: Option<String>,
    /// Tool name sent with every request
    pub tool: Option<String>,
    /// Override for the E-utilities base URL (used by tests)
    pub base_url: Option<String>,
    /// Custom User-Agent header
    pub user_agent: Option<String>,
    /// Number of identifiers requested from the search endpoint
    pub top_k_results: usize,
    /// Queries longer than this many characters are truncated
    pub max_query_length: usize,
    /// Formatted output of `run` is truncated to this many characters
    pub doc_content_chars_max: usize,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Retry policy for the transport
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            api_key: None,
            email: None,
            tool: None,
            base_url: None,
            user_agent: None,
            top_k_results: 3,
            max_query_length: 300,
            doc_content_chars_max: 2000,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }

    /// Create a configuration from `NCBI_API_KEY`, `NCBI_EMAIL` and `NCBI_TOOL`
    ///
    /// Unset or empty variables fall back to the defaults.
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());

        let mut config = Self::new();
        config.api_key = read("NCBI_API_KEY");
        config.email = read("NCBI_EMAIL");
        config.tool = read("NCBI_TOOL");
        config
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Point the client at a different E-utilities host, e.g. a mock server
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_top_k_results(mut self, top_k_results: usize) -> Self {
        self.top_k_results = top_k_results;
        self
    }

    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    pub fn with_doc_content_chars_max(mut self, doc_content_chars_max: usize) -> Self {
        self.doc_content_chars_max = doc_content_chars_max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the whole retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Number of retries after the first attempt
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.retry_config.max_retry = max_retry;
        self
    }

    /// Nominal delay before the first retry; doubles after each retry
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.retry_config.initial_delay = initial_backoff;
        self
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("pubmed-retriever/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn effective_email(&self) -> &str {
        self.email.as_deref().unwrap_or(DEFAULT_EMAIL)
    }

    pub fn effective_tool(&self) -> &str {
        self.tool.as_deref().unwrap_or(DEFAULT_TOOL)
    }

    /// Parameters appended to every request
    ///
    /// `api_key` is left out entirely when no key is configured.
    pub fn build_api_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("email".to_string(), self.effective_email().to_string()),
            ("tool".to_string(), self.effective_tool().to_string()),
        ];

        if let Some(api_key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            params.push(("api_key".to_string(), api_key.to_string()));
        }

        params
    }

    /// ESearch URL with history enabled so the response carries a WebEnv
    pub fn esearch_url(&self, query: &str) -> String {
        let url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmode=json&retmax={}&usehistory=y",
            self.effective_base_url(),
            urlencoding::encode(query),
            self.top_k_results
        );
        self.append_api_params(url)
    }

    /// EFetch URL for a single identifier within a search session
    pub fn efetch_url(&self, uid: &str, webenv: &str) -> String {
        let url = format!(
            "{}/efetch.fcgi?db=pubmed&retmode=xml&id={}&WebEnv={}",
            self.effective_base_url(),
            urlencoding::encode(uid),
            urlencoding::encode(webenv)
        );
        self.append_api_params(url)
    }

    fn append_api_params(&self, mut url: String) -> String {
        for (key, value) in self.build_api_params() {
            url.push('&');
            url.push_str(&key);
            url.push('=');
            url.push_str(&urlencoding::encode(&value));
        }
        url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
