//! End-to-end search-then-fetch tests using mocked E-utilities responses

mod common;

use std::pin::pin;

use common::{WEBENV, article_date, article_xml, esearch_body, mock_client, mock_config};
use futures_util::StreamExt;
use pubmed_retriever::{NO_ABSTRACT, NO_RESULTS, PubMedClient, PubMedError};
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_esearch(mock_server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
        )
        .mount(mock_server)
        .await;
}

async fn mount_efetch(mock_server: &MockServer, pmid: &str, xml: String) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", pmid))
        .and(query_param("WebEnv", WEBENV))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(xml)
                .insert_header("content-type", "text/xml"),
        )
        .mount(mock_server)
        .await;
}

async fn efetch_ids(mock_server: &MockServer) -> Vec<String> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/efetch.fcgi")
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "id")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

async fn setup_two_articles() -> MockServer {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["31978945", "33515491"])).await;
    mount_efetch(
        &mock_server,
        "31978945",
        article_xml(
            "31978945",
            "A pneumonia outbreak associated with a new coronavirus",
            &article_date("2020", "02", "03"),
            "<Abstract><AbstractText>In December 2019, a cluster of patients with pneumonia...</AbstractText>\
             <CopyrightInformation>© 2020 The Author(s)</CopyrightInformation></Abstract>",
        ),
    )
    .await;
    mount_efetch(
        &mock_server,
        "33515491",
        article_xml(
            "33515491",
            "Cancer treatment advances in 2020",
            "<ArticleDate><Year>2021</Year><Month>1</Month></ArticleDate>",
            r#"<Abstract>
                <AbstractText Label="BACKGROUND" NlmCategory="BACKGROUND">Cancer remains a leading cause of death.</AbstractText>
                <AbstractText Label="RESULTS" NlmCategory="RESULTS">Survival improved.</AbstractText>
            </Abstract>"#,
        ),
    )
    .await;
    mock_server
}

#[tokio::test]
#[traced_test]
async fn test_collect_preserves_search_order_and_attribution() {
    let mock_server = setup_two_articles().await;
    let client = mock_client(&mock_server);

    let articles = client.collect("coronavirus").await.expect("collect should succeed");

    assert_eq!(articles.len(), 2);

    assert_eq!(articles[0].uid, "31978945");
    assert_eq!(
        articles[0].title,
        "A pneumonia outbreak associated with a new coronavirus"
    );
    assert_eq!(articles[0].published, "2020-02-03");
    assert_eq!(articles[0].copyright_information, "© 2020 The Author(s)");
    assert_eq!(
        articles[0].summary,
        "In December 2019, a cluster of patients with pneumonia..."
    );

    assert_eq!(articles[1].uid, "33515491");
    assert_eq!(articles[1].title, "Cancer treatment advances in 2020");
    assert_eq!(articles[1].published, "2021-01");
    assert_eq!(articles[1].copyright_information, "");
    assert_eq!(
        articles[1].summary,
        "BACKGROUND: Cancer remains a leading cause of death.\nRESULTS: Survival improved."
    );

    assert_eq!(efetch_ids(&mock_server).await, vec!["31978945", "33515491"]);
}

#[tokio::test]
async fn test_search_request_parameters() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("term", "heart failure"))
        .and(query_param("retmode", "json"))
        .and(query_param("retmax", "3"))
        .and(query_param("usehistory", "y"))
        .and(query_param("email", "tester@example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(Some(WEBENV), &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = mock_client(&mock_server)
        .search("heart failure")
        .await
        .expect("search should succeed");

    assert_eq!(result.webenv, WEBENV);
    assert!(result.pmids.is_empty());
    assert_eq!(result.total_count, Some(0));
    assert_eq!(
        result.query_translation.as_deref(),
        Some("\"test\"[All Fields]")
    );

    let requests = mock_server.received_requests().await.unwrap();
    assert!(
        requests[0].url.query_pairs().all(|(key, _)| key != "api_key"),
        "api_key must be omitted when not configured"
    );
}

#[tokio::test]
async fn test_api_key_is_sent_when_configured() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("api_key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(Some(WEBENV), &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = PubMedClient::with_config(mock_config(&mock_server).with_api_key("secret-key"));
    assert!(client.search("asthma").await.is_ok());
}

#[tokio::test]
async fn test_query_truncated_before_search() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", "covid"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_body(Some(WEBENV), &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        PubMedClient::with_config(mock_config(&mock_server).with_max_query_length(5));
    assert_eq!(client.run("covid-19 vaccine efficacy").await, NO_RESULTS);
}

#[tokio::test]
async fn test_empty_search_yields_sentinel_without_fetching() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &[])).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = mock_client(&mock_server);

    assert_eq!(client.run("no such topic").await, NO_RESULTS);
    assert!(client.collect("no such topic").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_webenv_is_invalid_response() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(None, &["31978945"])).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = mock_client(&mock_server);

    let result = client.collect("coronavirus").await;
    assert!(matches!(result, Err(PubMedError::InvalidResponse { .. })));

    let mut stream = pin!(client.lazy_fetch("coronavirus"));
    assert!(matches!(
        stream.next().await,
        Some(Err(PubMedError::InvalidResponse { .. }))
    ));
    assert!(stream.next().await.is_none());

    let output = client.run("coronavirus").await;
    assert!(output.starts_with("PubMed exception:"), "{output}");
    assert!(output.contains("WebEnv"));
}

#[tokio::test]
async fn test_esearch_error_field_is_api_error() {
    let mock_server = MockServer::start().await;
    mount_esearch(
        &mock_server,
        r#"{"esearchresult": {"ERROR": "Empty term and query_key - nothing todo"}}"#.to_string(),
    )
    .await;

    let result = mock_client(&mock_server).search("").await;
    match result {
        Err(PubMedError::ApiError { message }) => assert!(message.contains("nothing todo")),
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_search_json_is_json_error() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, "<html>maintenance</html>".to_string()).await;

    let result = mock_client(&mock_server).collect("asthma").await;
    assert!(matches!(result, Err(PubMedError::JsonError(_))));
}

#[tokio::test]
async fn test_early_stop_abandons_remaining_fetches() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["111", "222", "333"])).await;
    for pmid in ["111", "222", "333"] {
        mount_efetch(
            &mock_server,
            pmid,
            article_xml(pmid, &format!("Title {pmid}"), "", ""),
        )
        .await;
    }

    let client = mock_client(&mock_server);
    let first: Vec<_> = client.lazy_fetch("anything").take(1).collect().await;

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].as_ref().unwrap().uid, "111");
    assert_eq!(efetch_ids(&mock_server).await, vec!["111"]);
}

#[tokio::test]
async fn test_stream_fetches_one_document_per_poll() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["111", "222"])).await;
    for pmid in ["111", "222"] {
        mount_efetch(&mock_server, pmid, article_xml(pmid, "T", "", "")).await;
    }

    let client = mock_client(&mock_server);
    let mut stream = pin!(client.lazy_fetch("anything"));

    assert!(efetch_ids(&mock_server).await.is_empty());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.uid, "111");
    assert_eq!(efetch_ids(&mock_server).await, vec!["111"]);

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.uid, "222");
    assert_eq!(efetch_ids(&mock_server).await, vec!["111", "222"]);

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_fetch_error_ends_stream_after_partial_results() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["111", "222", "333"])).await;
    mount_efetch(&mock_server, "111", article_xml("111", "First", "", "")).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "222"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server, "333", article_xml("333", "Third", "", "")).await;

    let client = mock_client(&mock_server);
    let items: Vec<_> = client.lazy_fetch("anything").collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().title, "First");
    assert!(matches!(
        items[1],
        Err(PubMedError::HttpError { status: 404, .. })
    ));
    assert!(!efetch_ids(&mock_server).await.contains(&"333".to_string()));

    assert!(client.collect("anything").await.is_err());
    assert!(client.run("anything").await.starts_with("PubMed exception: HTTP error 404"));
}

#[tokio::test]
async fn test_run_formats_and_truncates() {
    let mock_server = setup_two_articles().await;

    let full = mock_client(&mock_server).run("coronavirus").await;
    assert!(full.starts_with(
        "Published: 2020-02-03\nTitle: A pneumonia outbreak associated with a new coronavirus\n\
         Copyright Information: © 2020 The Author(s)\nSummary: In December 2019"
    ));
    assert!(full.contains("pneumonia...\n\nPublished: 2021-01\n"));
    assert!(full.ends_with("RESULTS: Survival improved."));

    let client = PubMedClient::with_config(mock_config(&mock_server).with_doc_content_chars_max(30));
    let truncated = client.run("coronavirus").await;
    assert_eq!(truncated.chars().count(), 30);
    assert_eq!(truncated, "Published: 2020-02-03\nTitle: A");
}

#[tokio::test]
async fn test_documents_split_summary_from_metadata() {
    let mock_server = setup_two_articles().await;
    let client = mock_client(&mock_server);

    let documents = client
        .collect_as_documents("coronavirus")
        .await
        .expect("documents should be collected");

    assert_eq!(documents.len(), 2);
    assert_eq!(
        documents[0].page_content,
        "In December 2019, a cluster of patients with pneumonia..."
    );
    assert_eq!(documents[0].metadata.uid, "31978945");
    assert_eq!(documents[0].metadata.published, "2020-02-03");
    assert_eq!(documents[1].metadata.title, "Cancer treatment advances in 2020");

    let streamed: Vec<_> = client
        .lazy_fetch_as_documents("coronavirus")
        .map(|document| document.unwrap().metadata.uid)
        .collect()
        .await;
    assert_eq!(streamed, vec!["31978945", "33515491"]);
}

#[tokio::test]
async fn test_book_chapter_and_missing_abstract() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["20301295", "12345678"])).await;
    mount_efetch(
        &mock_server,
        "20301295",
        r#"<?xml version="1.0" ?>
<PubmedArticleSet>
    <PubmedBookArticle>
        <BookDocument>
            <PMID Version="1">20301295</PMID>
            <ArticleTitle>Cystic Fibrosis</ArticleTitle>
            <Abstract>
                <AbstractText Label="CLINICAL CHARACTERISTICS">Cystic fibrosis affects the lungs.</AbstractText>
                <AbstractText Label="DIAGNOSIS/TESTING">Diagnosis relies on sweat chloride.</AbstractText>
                <CopyrightInformation>Copyright © 1993-2024, University of Washington</CopyrightInformation>
            </Abstract>
        </BookDocument>
    </PubmedBookArticle>
</PubmedArticleSet>"#
            .to_string(),
    )
    .await;
    mount_efetch(
        &mock_server,
        "12345678",
        article_xml("12345678", "Letter to the editor", "", ""),
    )
    .await;

    let articles = mock_client(&mock_server).collect("cystic fibrosis").await.unwrap();

    assert_eq!(articles[0].title, "Cystic Fibrosis");
    assert_eq!(
        articles[0].summary,
        "CLINICAL CHARACTERISTICS: Cystic fibrosis affects the lungs.\n\
         DIAGNOSIS/TESTING: Diagnosis relies on sweat chloride."
    );
    assert_eq!(
        articles[0].copyright_information,
        "Copyright © 1993-2024, University of Washington"
    );
    assert_eq!(articles[0].published, "");

    assert_eq!(articles[1].title, "Letter to the editor");
    assert_eq!(articles[1].summary, NO_ABSTRACT);
}

#[tokio::test]
#[traced_test]
async fn test_rate_limited_fetch_recovers_within_stream() {
    let mock_server = MockServer::start().await;
    mount_esearch(&mock_server, esearch_body(Some(WEBENV), &["111"])).await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    mount_efetch(&mock_server, "111", article_xml("111", "Recovered", "", "")).await;

    let articles = mock_client(&mock_server).collect("anything").await.unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Recovered");
    assert!(logs_contain("Rate limited (efetch id=111)"));
    assert!(logs_contain("(attempt 2/3)"));
}
