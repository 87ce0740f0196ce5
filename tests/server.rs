//! HTTP surface tests: the router runs on an ephemeral port and is called
//! with reqwest; a wiremock server stands in for the deck host.

#![cfg(feature = "server")]

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use serde::de::DeserializeOwned;
use serde_json::Value;
use slidedeck_dl::server::{serve, AppState, InfoResponse, API_PREFIX};
use slidedeck_dl::DeckConfig;
use std::io::Cursor;
use std::net::SocketAddr;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

async fn start() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, AppState::new(DeckConfig::default()))
            .await
            .unwrap();
    });
    addr
}

fn api(addr: SocketAddr, route: &str) -> String {
    format!("http://{addr}{API_PREFIX}{route}")
}

/// The URL-safe alphabet keeps `/` out of the path segment.
fn encode(url: &str) -> String {
    URL_SAFE.encode(urlencoding::encode(url).as_bytes())
}

async fn json<T: DeserializeOwned>(response: reqwest::Response) -> T {
    let bytes = response.bytes().await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn slide_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

async fn mock_deck(slides: u32) -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();
    let html = format!(
        r#"<html><head><title>Roadmap 2025 | SlideShare</title></head><body>
           <span data-cy="page-number">1 of {slides}</span>
           <img id="slide-image-0" srcset="{base}/img/r-1-320.jpg 320w, {base}/img/r-1-1024.jpg 1024w"/>
           </body></html>"#
    );
    Mock::given(method("GET"))
        .and(path("/roadmap"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(&server)
        .await;
    for i in 1..=slides {
        Mock::given(method("GET"))
            .and(path(format!("/img/r-{i}-1024.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(slide_png(144, 72), "image/png"))
            .mount(&server)
            .await;
    }
    server
}

async fn assert_opaque_500(response: reqwest::Response) {
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = json(response).await;
    assert_eq!(body, serde_json::json!({ "detail": "Internal server error" }));
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_answers_pong() {
    let addr = start().await;
    let body = reqwest::get(api(addr, "/ping")).await.unwrap().text().await.unwrap();
    assert_eq!(body, r#""pong""#);
}

#[tokio::test]
async fn info_returns_metadata_and_client_ip() {
    let deck = mock_deck(3).await;
    let addr = start().await;

    let url = format!("{}/roadmap", deck.uri());
    let response = reqwest::get(api(addr, &format!("/info/{}", encode(&url))))
        .await
        .unwrap();
    assert!(response.status().is_success());

    let info: InfoResponse = json(response).await;
    assert_eq!(info.title, "Roadmap 2025");
    assert_eq!(info.slides_number, 3);
    assert_eq!(info.estimated_download_time_seconds, 6);
    assert_eq!(info.template_url, format!("{}/img/r-SLIDE_NUMBER-1024.jpg", deck.uri()));
    assert_eq!(info.client_ip, "127.0.0.1");
}

#[tokio::test]
async fn info_reports_unknown_slide_count_as_minus_one() {
    let deck = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bare"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><title>Bare</title></html>", "text/html"),
        )
        .mount(&deck)
        .await;
    let addr = start().await;

    let url = format!("{}/bare", deck.uri());
    let response = reqwest::get(api(addr, &format!("/info/{}", encode(&url))))
        .await
        .unwrap();
    let info: InfoResponse = json(response).await;
    assert_eq!(info.slides_number, -1);
    assert_eq!(info.template_url, "");
    assert_eq!(info.title, "Bare");
}

#[tokio::test]
async fn download_returns_presentation() {
    let deck = mock_deck(2).await;
    let addr = start().await;

    let url = format!("{}/roadmap", deck.uri());
    let response = reqwest::get(api(addr, &format!("/download/{}", encode(&url))))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    );

    let bytes = response.bytes().await.unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert!(archive.file_names().any(|n| n == "ppt/slides/slide2.xml"));
}

#[tokio::test]
async fn get_slide_returns_jpeg() {
    let deck = mock_deck(3).await;
    let addr = start().await;

    let url = format!("{}/roadmap", deck.uri());
    let response = reqwest::get(api(addr, &format!("/get_slide/{}/2", encode(&url))))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.headers()[reqwest::header::CONTENT_TYPE], "image/jpeg");

    let bytes = response.bytes().await.unwrap();
    let img = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (144, 72));
}

#[tokio::test]
async fn get_slide_out_of_range_is_opaque_error() {
    let deck = mock_deck(3).await;
    let addr = start().await;

    let url = format!("{}/roadmap", deck.uri());
    let response = reqwest::get(api(addr, &format!("/get_slide/{}/9", encode(&url))))
        .await
        .unwrap();
    assert_opaque_500(response).await;
}

#[tokio::test]
async fn bad_address_is_opaque_error() {
    let addr = start().await;
    let response = reqwest::get(api(addr, "/info/not-base64!!")).await.unwrap();
    assert_opaque_500(response).await;
}

#[tokio::test]
async fn failed_download_is_opaque_error() {
    let deck = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&deck)
        .await;
    let addr = start().await;

    let url = format!("{}/gone", deck.uri());
    let response = reqwest::get(api(addr, &format!("/download/{}", encode(&url))))
        .await
        .unwrap();
    assert_opaque_500(response).await;
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let addr = start().await;
    let response = reqwest::Client::new()
        .get(api(addr, "/ping"))
        .header(reqwest::header::ORIGIN, "https://somewhere.example")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()[reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
