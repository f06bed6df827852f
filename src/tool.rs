//! Single-string tool adapter for agent frameworks

use crate::pubmed::PubMedClient;

/// Wraps [`PubMedClient::run`] as a named tool taking one query string
#[derive(Clone, Default)]
pub struct PubMedQueryRun {
    client: PubMedClient,
}

impl PubMedQueryRun {
    pub const NAME: &'static str = "pubmed";

    pub const DESCRIPTION: &'static str = "A wrapper around PubMed. \
        Useful for when you need to answer questions about medicine, health, \
        and biomedical topics from biomedical literature, MEDLINE, life science \
        journals, and online books. Input should be a search query.";

    pub fn new(client: PubMedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PubMedClient {
        &self.client
    }

    /// Answer `query` with formatted results; never fails
    pub async fn call(&self, query: &str) -> String {
        self.client.run(query).await
    }
}
