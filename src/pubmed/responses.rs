use serde::{Deserialize, Serialize};

// ESearch API response structures (retmode=json)

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchResult {
    pub esearchresult: ESearchData,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchData {
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub idlist: Vec<String>,
    /// WebEnv session identifier for history server
    #[serde(default)]
    pub webenv: Option<String>,
    /// How PubMed interpreted and translated the search query
    #[serde(default)]
    pub querytranslation: Option<String>,
}
