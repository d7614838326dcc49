mod common;

use common::{config, scraper, MockTransport};
use litscan_common::LitscanError;
use litscan_scrape::counts::Counts;
use litscan_scrape::store::Store;
use litscan_scrape::terms::Dimension;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_single_pair_sweep() {
    let transport = MockTransport::new()
        .count(r#"("N400")"#, 100)
        .count(r#"("language")"#, 50)
        .count(r#"("N400")AND("language")"#, 10);
    let (mut scraper, store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, ["N400"]).unwrap();
    counts.set_terms(Dimension::B, ["language"]).unwrap();
    scraper.collect_counts(&mut counts, "erp_language").await.unwrap();

    let matrix = counts.matrix().unwrap();
    assert_eq!(matrix.count(0, 0), Some(10));
    assert_eq!(matrix.percentage(0, 0), Some(0.1));
    assert_eq!(counts.terms(Dimension::A).counts(), &[Some(100)]);
    assert_eq!(counts.terms(Dimension::B).counts(), &[Some(50)]);

    let meta = counts.meta().unwrap();
    assert_eq!(meta.db_info.dbname.as_deref(), Some("pubmed"));
    assert_eq!(meta.requests.n_requests, 4);
    assert!(!meta.requests.is_active);

    let saved = store.load_counts("erp_language").await.unwrap();
    assert_eq!(saved, counts.snapshot());
}

#[tokio::test]
async fn test_search_target_carries_configured_options() {
    let transport = MockTransport::new().count(r#"("N400")"#, 1);
    let (mut scraper, _store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, ["N400"]).unwrap();
    scraper.collect_counts(&mut counts, "n400").await.unwrap();

    let search = &scraper.transport().calls_to("esearch.fcgi")[0];
    assert_eq!(search.param("db"), Some("pubmed"));
    assert_eq!(search.param("retmax"), Some("0"));
    assert_eq!(search.param("retmode"), Some("xml"));
    assert_eq!(search.param("field"), Some("TIAB"));
    assert_eq!(search.param("usehistory"), None);
}

#[tokio::test]
async fn test_square_sweep_queries_upper_triangle_once() {
    let labels = ["N400", "P600", "MMN"];
    let mut transport = MockTransport::new()
        .count(r#"("N400")"#, 100)
        .count(r#"("P600")"#, 40)
        .count(r#"("MMN")"#, 20);
    let joint = [
        ("N400", "N400", 100),
        ("N400", "P600", 8),
        ("N400", "MMN", 4),
        ("P600", "P600", 40),
        ("P600", "MMN", 2),
        ("MMN", "MMN", 20),
    ];
    for (a, b, n) in joint {
        transport = transport.count(&format!(r#"("{a}")AND("{b}")"#), n);
    }
    let (mut scraper, _store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, labels).unwrap();
    assert!(counts.is_square());
    scraper.collect_counts(&mut counts, "erps").await.unwrap();

    // one single query per group, one joint query per upper-triangle cell
    let searched = scraper.transport().searched_terms();
    let n = labels.len();
    assert_eq!(searched.len(), n + n * (n + 1) / 2);
    for label in labels {
        let single = format!(r#"("{label}")"#);
        assert_eq!(searched.iter().filter(|t| **t == single).count(), 1);
    }

    let matrix = counts.matrix().unwrap();
    assert!(matrix.is_complete());
    for i in 0..n {
        for j in 0..n {
            assert_eq!(matrix.count(i, j), matrix.count(j, i));
        }
    }
    assert_eq!(matrix.count(2, 0), Some(4));
    assert_eq!(matrix.percentage(0, 2), Some(4.0 / 100.0));
    assert_eq!(matrix.percentage(2, 0), Some(4.0 / 20.0));
    assert_eq!(matrix.percentage(1, 1), Some(1.0));
}

#[tokio::test]
async fn test_exclusions_shape_queries() {
    let transport = MockTransport::new();
    let (mut scraper, _store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, vec![vec!["N400", "N4"]]).unwrap();
    counts.set_exclusions(Dimension::A, ["cancer"]).unwrap();
    counts.set_terms(Dimension::B, ["language"]).unwrap();
    scraper.collect_counts(&mut counts, "excl").await.unwrap();

    let searched = scraper.transport().searched_terms();
    assert_eq!(
        searched,
        vec![
            r#"("N400"OR"N4")NOT("cancer")"#.to_string(),
            r#"("language")"#.to_string(),
            r#"("N400"OR"N4")NOT("cancer")AND("language")"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_zero_single_count_leaves_percentage_unset() {
    let transport = MockTransport::new().count(r#"("language")"#, 50);
    let (mut scraper, _store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, ["obscure"]).unwrap();
    counts.set_terms(Dimension::B, ["language"]).unwrap();
    scraper.collect_counts(&mut counts, "zero").await.unwrap();

    let matrix = counts.matrix().unwrap();
    assert_eq!(matrix.count(0, 0), Some(0));
    assert_eq!(matrix.percentage(0, 0), None);
}

#[tokio::test]
async fn test_transient_failure_aborts_with_context() {
    let transport = MockTransport::new()
        .count(r#"("N400")"#, 100)
        .count(r#"("language")"#, 50)
        .failing(r#"("N400")AND("language")"#);
    let (mut scraper, store) = scraper(&config(), transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, ["N400"]).unwrap();
    counts.set_terms(Dimension::B, ["language"]).unwrap();
    let err = scraper.collect_counts(&mut counts, "broken").await.unwrap_err();

    assert!(err.is_transient());
    match &err {
        LitscanError::TermGroup { label, stage, .. } => {
            assert_eq!(label, "N400 AND language");
            assert_eq!(stage, "joint search");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!scraper.request_log().is_active);
    assert!(matches!(store.load_counts("broken").await, Err(LitscanError::NotFound(_))));
}

#[tokio::test]
async fn test_checkpoint_keeps_finished_rows() {
    let mut cfg = config();
    cfg.counts.checkpoint_rows = true;
    let transport = MockTransport::new()
        .count(r#"("N400")"#, 100)
        .count(r#"("language")"#, 50)
        .count(r#"("N400")AND("language")"#, 10)
        .failing(r#"("P600")"#);
    let (mut scraper, store) = scraper(&cfg, transport);

    let mut counts = Counts::new();
    counts.set_terms(Dimension::A, ["N400", "P600"]).unwrap();
    counts.set_terms(Dimension::B, ["language"]).unwrap();
    assert!(scraper.collect_counts(&mut counts, "partial").await.is_err());

    let saved = store.load_counts("partial").await.unwrap();
    let matrix = saved.matrix.unwrap();
    assert_eq!(matrix.count(0, 0), Some(10));
    assert_eq!(matrix.count(1, 0), None);
    assert_eq!(saved.counts_a, vec![Some(100), None]);
    assert!(saved.meta.is_none());
    assert_eq!(store.counts_saves(), 1);
}

#[tokio::test]
async fn test_no_terms_is_configuration_error() {
    let (mut scraper, _store) = scraper(&config(), MockTransport::new());
    let mut counts = Counts::new();
    let err = scraper.collect_counts(&mut counts, "empty").await.unwrap_err();
    assert!(matches!(err, LitscanError::Configuration(_)));
    assert!(scraper.transport().calls().is_empty());
}

#[tokio::test]
async fn test_db_info_in_its_own_session() {
    let (mut scraper, _store) = scraper(&config(), MockTransport::new());

    let info = scraper.db_info().await.unwrap();
    assert_eq!(info.dbname.as_deref(), Some("pubmed"));
    assert_eq!(info.count.as_deref(), Some("1000"));

    let calls = scraper.transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "einfo.fcgi");
    assert_eq!(calls[0].param("db"), Some("pubmed"));
    assert!(!scraper.request_log().is_active);
    assert_eq!(scraper.request_log().n_requests, 1);
}
