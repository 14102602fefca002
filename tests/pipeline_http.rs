//! End-to-end pipeline tests against a stub HTTP service
//!
//! Each test starts a `wiremock` server standing in for the enhancement
//! service and runs real multipart uploads through the orchestrator.

mod common;

use common::{
    config_for, image_response, jpeg_bytes, json_response, mount, png_bytes, png_input,
    MultipartUpload, ENHANCE_PATH, REMOVE_PATH,
};
use imgly_enhance::{
    Endpoint, ErrorKind, ExecutionMode, InputImage, PipelineOrchestrator, ResultAggregator,
    StageLabel, StageOutcome,
};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn failed(outcome: &StageOutcome) -> (ErrorKind, String, Option<u16>) {
    let detail = outcome.error().expect("expected a failed outcome");
    (detail.kind(), detail.message().to_string(), detail.http_status())
}

#[tokio::test]
async fn test_both_stages_decode_returned_bytes() {
    let server = MockServer::start().await;
    let enhanced = png_bytes(8, 6);
    let removed = png_bytes(4, 3);
    mount(&server, ENHANCE_PATH, image_response(enhanced.clone())).await;
    mount(&server, REMOVE_PATH, image_response(removed.clone())).await;

    let orchestrator = PipelineOrchestrator::new(config_for(&server, TIMEOUT)).unwrap();
    let result = orchestrator.process(&png_input()).await;

    let stage1 = result.stage1.decoded().expect("stage 1 should decode");
    let stage2 = result.stage2.decoded().expect("stage 2 should decode");
    assert_eq!(stage1.bytes, enhanced);
    assert_eq!(stage1.dimensions(), (8, 6));
    assert_eq!(stage2.bytes, removed);
    assert_eq!(stage2.dimensions(), (4, 3));
    assert!(result.all_decoded());
    assert_eq!(result.labels, [StageLabel::Enhance, StageLabel::RemoveAndEnhance]);
}

#[tokio::test]
async fn test_remote_error_detail_with_status() {
    let server = MockServer::start().await;
    mount(&server, ENHANCE_PATH, image_response(png_bytes(2, 2))).await;
    mount(
        &server,
        REMOVE_PATH,
        json_response(500, json!({ "detail": "bad input" })),
    )
    .await;

    let orchestrator = PipelineOrchestrator::new(config_for(&server, TIMEOUT)).unwrap();
    let result = orchestrator.process(&png_input()).await;

    assert!(result.stage1.is_decoded());
    assert_eq!(
        failed(&result.stage2),
        (ErrorKind::RemoteError, "bad input".to_string(), Some(500))
    );
}

#[tokio::test]
async fn test_success_status_with_json_is_an_error() {
    let server = MockServer::start().await;
    mount(&server, ENHANCE_PATH, json_response(200, json!({ "error": "x" }))).await;
    mount(&server, REMOVE_PATH, image_response(png_bytes(2, 2))).await;

    let orchestrator = PipelineOrchestrator::new(config_for(&server, TIMEOUT)).unwrap();
    let result = orchestrator.process(&png_input()).await;

    assert_eq!(
        failed(&result.stage1),
        (ErrorKind::RemoteError, "x".to_string(), Some(200))
    );
    assert!(result.stage2.is_decoded());
}

#[tokio::test]
async fn test_corrupt_image_body_never_decodes() {
    let server = MockServer::start().await;
    let mut truncated = png_bytes(16, 16);
    truncated.truncate(truncated.len() / 2);
    mount(&server, ENHANCE_PATH, image_response(truncated)).await;
    mount(
        &server,
        REMOVE_PATH,
        image_response(b"definitely not an image".to_vec()),
    )
    .await;

    let orchestrator = PipelineOrchestrator::new(config_for(&server, TIMEOUT)).unwrap();
    let result = orchestrator.process(&png_input()).await;

    for (_, outcome) in result.stages() {
        let (kind, _, status) = failed(outcome);
        assert_eq!(kind, ErrorKind::ImageDecodeError);
        assert_eq!(status, Some(200));
    }
}

#[tokio::test]
async fn test_second_stage_independent_of_first() {
    for stage2_template in [
        image_response(png_bytes(5, 5)),
        json_response(422, json!({ "detail": "no subject found" })),
    ] {
        let healthy = MockServer::start().await;
        mount(&healthy, ENHANCE_PATH, image_response(png_bytes(3, 3))).await;
        mount(&healthy, REMOVE_PATH, stage2_template.clone()).await;

        let broken = MockServer::start().await;
        mount(&broken, ENHANCE_PATH, json_response(503, json!({ "detail": "down" }))).await;
        mount(&broken, REMOVE_PATH, stage2_template).await;

        for mode in [ExecutionMode::Parallel, ExecutionMode::Sequential] {
            let mut config = config_for(&healthy, TIMEOUT);
            config.execution = mode;
            let with_success = PipelineOrchestrator::new(config)
                .unwrap()
                .process(&png_input())
                .await;

            let mut config = config_for(&broken, TIMEOUT);
            config.execution = mode;
            let with_failure = PipelineOrchestrator::new(config)
                .unwrap()
                .process(&png_input())
                .await;

            assert!(with_success.stage1.is_decoded());
            assert!(with_failure.stage1.is_failed());
            assert_eq!(with_success.stage2, with_failure.stage2, "mode {:?}", mode);
        }
    }
}

#[tokio::test]
async fn test_timeout_does_not_hold_up_sibling() {
    let server = MockServer::start().await;
    mount(
        &server,
        ENHANCE_PATH,
        image_response(png_bytes(2, 2)).set_delay(Duration::from_secs(3)),
    )
    .await;
    mount(&server, REMOVE_PATH, image_response(png_bytes(2, 2))).await;

    let orchestrator =
        PipelineOrchestrator::new(config_for(&server, Duration::from_millis(300))).unwrap();

    let start = Instant::now();
    let result = orchestrator.process(&png_input()).await;
    let elapsed = start.elapsed();

    assert_eq!(failed(&result.stage1).0, ErrorKind::Timeout);
    assert_eq!(failed(&result.stage1).2, None);
    assert!(result.stage2.is_decoded());
    assert!(
        elapsed < Duration::from_secs(2),
        "run took {:?}, longer than the stage budget allows",
        elapsed
    );
    assert!(result.timings.stage2_ms <= result.timings.total_ms);
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let refused_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let server = MockServer::start().await;
    mount(&server, REMOVE_PATH, image_response(png_bytes(2, 2))).await;

    let config = imgly_enhance::ServiceConfig::builder()
        .enhance_url(format!("http://127.0.0.1:{}/enhance/", refused_port))
        .remove_and_enhance_url(format!("{}{}", server.uri(), REMOVE_PATH))
        .timeout(TIMEOUT)
        .build()
        .unwrap();

    let result = PipelineOrchestrator::new(config)
        .unwrap()
        .process(&png_input())
        .await;

    let (kind, message, status) = failed(&result.stage1);
    assert_eq!(kind, ErrorKind::NetworkFailure);
    assert!(!message.is_empty());
    assert_eq!(status, None);
    assert!(result.stage2.is_decoded());

    let aggregator = ResultAggregator::new(&result);
    assert!(aggregator.advisory().is_some());
    assert!(aggregator.views()[0].warnings[0].starts_with("Network or API Error: "));
}

#[tokio::test]
async fn test_upload_is_multipart_png_part_for_any_source_format() {
    let server = MockServer::start().await;
    let jpeg = jpeg_bytes(12, 10);
    let input = InputImage::new(jpeg.clone(), "holiday.jpg", "image/jpeg");

    for route in [ENHANCE_PATH, REMOVE_PATH] {
        Mock::given(method("POST"))
            .and(path(route))
            .and(MultipartUpload {
                filename: "holiday.jpg".to_string(),
                payload: jpeg.clone(),
            })
            .respond_with(image_response(png_bytes(2, 2)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let result = PipelineOrchestrator::new(config_for(&server, TIMEOUT))
        .unwrap()
        .process(&input)
        .await;

    assert!(result.all_decoded(), "unexpected result: {:?}", result);
    assert_eq!(input.bytes(), jpeg.as_slice());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_explicit_endpoints_are_used_as_given() {
    let server = MockServer::start().await;
    mount(&server, "/v2/fast-enhance", image_response(png_bytes(2, 2))).await;
    mount(&server, "/v2/cutout", json_response(400, json!({ "error": "too small" }))).await;

    let orchestrator = PipelineOrchestrator::new(config_for(&server, TIMEOUT)).unwrap();
    let endpoints = [
        Endpoint::new(StageLabel::Enhance, format!("{}/v2/fast-enhance", server.uri())),
        Endpoint::new(StageLabel::RemoveAndEnhance, format!("{}/v2/cutout", server.uri())),
    ];
    let result = orchestrator.run(&png_input(), &endpoints).await;

    assert!(result.stage1.is_decoded());
    assert_eq!(
        failed(&result.stage2),
        (ErrorKind::RemoteError, "too small".to_string(), Some(400))
    );
}

#[tokio::test]
async fn test_unmatched_route_is_unrecognized_response() {
    let server = MockServer::start().await;
    mount(
        &server,
        ENHANCE_PATH,
        ResponseTemplate::new(502).set_body_raw("<html>Bad Gateway</html>", "text/html"),
    )
    .await;
    // No mock for stage 2: wiremock answers 404 with an empty body

    let result = PipelineOrchestrator::new(config_for(&server, TIMEOUT))
        .unwrap()
        .process(&png_input())
        .await;

    assert_eq!(
        failed(&result.stage1),
        (
            ErrorKind::UnrecognizedResponse,
            "non-image response, status 502".to_string(),
            Some(502)
        )
    );
    assert_eq!(failed(&result.stage2).0, ErrorKind::UnrecognizedResponse);
    assert_eq!(failed(&result.stage2).2, Some(404));
}
