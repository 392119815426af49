//! End-to-end tests for the configuration and query-routing pipeline

mod common;

use common::TestGateway;
use search_ab_gateway::search::{
    FacetClause, RawSearchParams, SearchError, SearchGateway, SearchRequest,
    SearchRequestBuilder,
};

fn builder(gateway: &TestGateway) -> SearchRequestBuilder {
    SearchRequestBuilder::new(gateway.registry.clone(), gateway.rewriter.clone())
}

#[tokio::test]
async fn test_v2_wildfire_request_dispatched_to_v2_index() {
    let gateway = TestGateway::ready().await;
    let params = RawSearchParams::query("wildfire").with_page(1, 5);

    let request = builder(&gateway).build("v2", &params).unwrap();
    assert_eq!(
        request,
        SearchRequest {
            query_text: "wildfire fire".to_string(),
            offset: 0,
            limit: 5,
            filters: vec![],
            sort: None,
        }
    );

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    search.execute("v2", &request).await.unwrap();

    let recorded = gateway.engine.recorded_searches();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "general_index_v2");
    assert_eq!(recorded[0].1.q, "wildfire fire");
    assert_eq!(recorded[0].1.offset, 0);
    assert_eq!(recorded[0].1.limit, 5);
    assert!(recorded[0].1.filter.is_empty());
}

#[tokio::test]
async fn test_v1_sends_query_unchanged() {
    let gateway = TestGateway::ready().await;
    let request = builder(&gateway)
        .build("v1", &RawSearchParams::query("wildfire"))
        .unwrap();

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    search.execute("v1", &request).await.unwrap();

    let recorded = gateway.engine.recorded_searches();
    assert_eq!(recorded[0].0, "general_index_v1");
    assert_eq!(recorded[0].1.q, "wildfire");
}

#[tokio::test]
async fn test_malformed_facets_dropped_end_to_end() {
    let gateway = TestGateway::ready().await;
    let params = RawSearchParams::query("claims").with_facets("state:California, ,invalidsegment");

    let request = builder(&gateway).build("v1", &params).unwrap();
    assert_eq!(request.filters, vec![FacetClause::new("state", "California")]);

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    search.execute("v1", &request).await.unwrap();
    assert_eq!(
        gateway.engine.recorded_searches()[0].1.filter,
        vec![r#"state = "California""#.to_string()]
    );
}

#[tokio::test]
async fn test_identical_settings_pushed_to_engine_on_reapply() {
    let gateway = TestGateway::ready().await;
    let before = gateway.engine.settings("general_index_v2").unwrap();

    gateway.registry.apply_all().await.unwrap();

    assert_eq!(gateway.engine.settings("general_index_v2").unwrap(), before);
    assert_eq!(gateway.engine.settings_updates("general_index_v2"), 2);
    assert_eq!(gateway.engine.document_count("general_index_v2"), 5);
}

#[tokio::test]
async fn test_v2_settings_carry_declared_deltas() {
    let gateway = TestGateway::ready().await;
    let v1 = gateway.engine.settings("general_index_v1").unwrap();
    let v2 = gateway.engine.settings("general_index_v2").unwrap();

    assert_eq!(v2.searchable_attributes[0], "headline");
    assert_ne!(v1.searchable_attributes[0], "headline");
    assert!(v2.synonyms.len() > v1.synonyms.len());
    assert_eq!(v1.ranking_rules, v2.ranking_rules);
}

#[tokio::test]
async fn test_same_corpus_in_every_index() {
    let gateway = TestGateway::ready().await;
    assert_eq!(
        gateway.engine.index_uids(),
        vec!["general_index_v1", "general_index_v2"]
    );
    assert_eq!(gateway.engine.document_count("general_index_v1"), 5);
    assert_eq!(gateway.engine.document_count("general_index_v2"), 5);
}

#[tokio::test]
async fn test_search_before_apply_is_index_not_found() {
    let gateway = TestGateway::registered();
    let request = builder(&gateway)
        .build("v1", &RawSearchParams::default())
        .unwrap();

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    assert!(matches!(
        search.execute("v1", &request).await,
        Err(SearchError::IndexNotFound(_))
    ));
}

#[tokio::test]
async fn test_pagination_reaches_engine() {
    let gateway = TestGateway::ready().await;
    let request = builder(&gateway)
        .build("v1", &RawSearchParams::default().with_page(2, 2))
        .unwrap();
    assert_eq!(request.offset, 2);

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    let body = search.execute("v1", &request).await.unwrap();

    assert_eq!(body["hits"][0]["id"], "3");
    assert_eq!(body["hits"][1]["id"], "4");
    assert_eq!(body["estimatedTotalHits"], 5);
}

#[tokio::test]
async fn test_filter_syntax_in_field_never_reaches_engine() {
    let gateway = TestGateway::ready().await;
    let params = RawSearchParams::query("claims").with_facets("id EXISTS OR state:Texas");

    let request = builder(&gateway).build("v1", &params).unwrap();
    assert!(request.filters.is_empty());

    let search = SearchGateway::new(gateway.engine.clone(), gateway.registry.clone());
    search.execute("v1", &request).await.unwrap();
    assert!(gateway.engine.recorded_searches()[0].1.filter.is_empty());
}
