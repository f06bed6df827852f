use std::vec;

use futures_util::{Stream, StreamExt, TryStreamExt, stream};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{PubMedError, Result};
use crate::pubmed::models::{ArticleMetadata, Document, SearchResult};
use crate::pubmed::parser::parse_metadata_from_xml;
use crate::pubmed::responses::ESearchResult;
use crate::transport::Transport;

/// Returned by [`PubMedClient::run`] when the search matches nothing
pub const NO_RESULTS: &str = "No good PubMed Result was found";

/// State machine behind [`PubMedClient::lazy_fetch`]
enum LazyFetchState {
    /// Search not issued yet
    Initial { query: String },
    /// Fetching one identifier per poll
    Fetching {
        webenv: String,
        pending: vec::IntoIter<String>,
    },
    /// Exhausted or failed
    Done,
}

/// Search-then-fetch client for PubMed
///
/// # Example
///
/// ```no_run
/// use pubmed_retriever::PubMedClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = PubMedClient::new();
///     let articles = client.collect("covid-19 treatment").await?;
///     for article in articles {
///         println!("{}: {}", article.uid, article.title);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PubMedClient {
    transport: Transport,
    config: ClientConfig,
}

impl PubMedClient {
    /// Create a new PubMed client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new())
    }

    /// Create a new PubMed client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_retriever::{ClientConfig, PubMedClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu")
    ///     .with_top_k_results(10);
    ///
    /// let client = PubMedClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.effective_user_agent())
            .build()
            .expect("Failed to create HTTP client");

        Self::with_client_and_config(client, config)
    }

    /// Create a new PubMed client around an existing reqwest client
    pub fn with_client_and_config(client: Client, config: ClientConfig) -> Self {
        let transport = Transport::new(client, config.retry_config.clone());
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the search phase
    ///
    /// The query is truncated to `max_query_length` characters first.
    ///
    /// # Errors
    ///
    /// * `PubMedError::InvalidResponse` - the response carries no WebEnv
    /// * `PubMedError::ApiError` - NCBI reported an error in the response body
    /// * transport errors from [`Transport::fetch_with_retry`]
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let query = self.truncate_query(query);
        let url = self.config.esearch_url(&query);

        debug!("Making ESearch API request");
        let response = self.transport.fetch_with_retry(&url, Some("esearch")).await?;
        let body = response.text().await?;
        let search_result: ESearchResult = serde_json::from_str(&body)?;
        let data = search_result.esearchresult;

        if let Some(error_msg) = data.error {
            return Err(PubMedError::ApiError {
                message: format!("NCBI ESearch API error: {}", error_msg),
            });
        }

        let webenv = data.webenv.ok_or_else(|| PubMedError::InvalidResponse {
            message: "ESearch response is missing the WebEnv history token".to_string(),
        })?;

        let mut pmids = data.idlist;
        if pmids.len() > self.config.top_k_results {
            warn!(
                returned = pmids.len(),
                requested = self.config.top_k_results,
                "ESearch returned more identifiers than requested"
            );
            pmids.truncate(self.config.top_k_results);
        }

        let total_count = data.count.as_deref().and_then(|c| c.parse().ok());
        info!(
            total_count = ?total_count,
            pmids = pmids.len(),
            "Search completed"
        );

        Ok(SearchResult {
            webenv,
            pmids,
            total_count,
            query_translation: data.querytranslation,
        })
    }

    /// Fetch and normalize a single document within a search session
    #[instrument(skip(self, webenv), fields(uid = %uid))]
    pub async fn retrieve_article(&self, uid: &str, webenv: &str) -> Result<ArticleMetadata> {
        let url = self.config.efetch_url(uid, webenv);
        let context = format!("efetch id={}", uid);

        let response = self.transport.fetch_with_retry(&url, Some(&context)).await?;
        let xml = response.text().await?;

        Ok(parse_metadata_from_xml(uid, &xml))
    }

    /// Search, then fetch each result one at a time as the stream is polled
    ///
    /// The stream is single pass; calling this again issues a new search.
    /// Nothing is fetched ahead of the consumer, so dropping the stream stops
    /// all further requests. The first error ends the stream.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use pubmed_retriever::PubMedClient;
    /// use std::pin::pin;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new();
    ///     let mut stream = pin!(client.lazy_fetch("cancer biomarker"));
    ///
    ///     while let Some(article) = stream.next().await {
    ///         let article = article?;
    ///         println!("{}: {}", article.uid, article.title);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn lazy_fetch<'a>(
        &'a self,
        query: &str,
    ) -> impl Stream<Item = Result<ArticleMetadata>> + use<'a> {
        let query = query.to_string();

        stream::unfold(
            LazyFetchState::Initial { query },
            move |state| async move {
                match state {
                    LazyFetchState::Initial { query } => match self.search(&query).await {
                        Ok(result) => {
                            if result.pmids.is_empty() {
                                debug!("Search returned no identifiers");
                                return None;
                            }
                            self.fetch_next(result.webenv, result.pmids.into_iter())
                                .await
                        }
                        Err(e) => Some((Err(e), LazyFetchState::Done)),
                    },
                    LazyFetchState::Fetching { webenv, pending } => {
                        self.fetch_next(webenv, pending).await
                    }
                    LazyFetchState::Done => None,
                }
            },
        )
    }

    /// Fetch the next pending identifier, if any
    async fn fetch_next(
        &self,
        webenv: String,
        mut pending: vec::IntoIter<String>,
    ) -> Option<(Result<ArticleMetadata>, LazyFetchState)> {
        let uid = pending.next()?;

        match self.retrieve_article(&uid, &webenv).await {
            Ok(article) => Some((Ok(article), LazyFetchState::Fetching { webenv, pending })),
            Err(e) => Some((Err(e), LazyFetchState::Done)),
        }
    }

    /// Collect every result of [`lazy_fetch`](Self::lazy_fetch)
    pub async fn collect(&self, query: &str) -> Result<Vec<ArticleMetadata>> {
        self.lazy_fetch(query).try_collect().await
    }

    /// [`lazy_fetch`](Self::lazy_fetch) mapped to documents
    pub fn lazy_fetch_as_documents<'a>(
        &'a self,
        query: &str,
    ) -> impl Stream<Item = Result<Document>> + use<'a> {
        self.lazy_fetch(query)
            .map(|article| article.map(ArticleMetadata::into_document))
    }

    /// [`collect`](Self::collect) mapped to documents
    pub async fn collect_as_documents(&self, query: &str) -> Result<Vec<Document>> {
        self.lazy_fetch_as_documents(query).try_collect().await
    }

    /// Search, fetch and format the results as plain text
    ///
    /// Never fails: no hits give [`NO_RESULTS`], and any error is returned as
    /// `"PubMed exception: <message>"`. Output is cut to
    /// `doc_content_chars_max` characters.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn run(&self, query: &str) -> String {
        match self.collect(query).await {
            Ok(articles) if articles.is_empty() => NO_RESULTS.to_string(),
            Ok(articles) => {
                let text = articles
                    .iter()
                    .map(ArticleMetadata::to_text_block)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                truncate_chars(&text, self.config.doc_content_chars_max)
            }
            Err(e) => {
                warn!("PubMed retrieval failed: {}", e);
                format!("PubMed exception: {}", e)
            }
        }
    }

    fn truncate_query(&self, query: &str) -> String {
        truncate_chars(query, self.config.max_query_length)
    }
}

impl Default for PubMedClient {
    fn default() -> Self {
        Self::new()
    }
}

/// First `max` characters of `text`
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
