//! ChromeDriver as a Surface, against the local test server
//!
//! Tests that launch Chrome are #[ignore]d; run them with
//! `cargo test --test chrome_surface_test -- --ignored` on a machine with Chrome.

mod test_server;

use journey_webdriver::{ChromeDriver, ConnectionMode, JourneyError, RegionDetector, Surface};
use std::time::Duration;
use test_server::{TestServer, CANVAS_OFFSET, HOTSPOT};

/// Helper to create a headless driver for testing
async fn create_headless_driver() -> anyhow::Result<ChromeDriver> {
    ChromeDriver::new(ConnectionMode::Sandboxed {
        chrome_path: None,
        no_sandbox: true,
        headless: true,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to launch Chrome: {}", e))
}

// ===== TEST SERVER =====

#[tokio::test]
async fn test_server_serves_prototype_page() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;

    let body = reqwest::get(server.url()).await?.text().await?;
    assert!(body.contains("<canvas"));
    Ok(())
}

#[tokio::test]
async fn test_servers_are_isolated() {
    let first = TestServer::start().await;
    let second = TestServer::start().await;
    assert_ne!(first.addr().port(), second.addr().port());
}

// ===== CHROME =====

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_navigate_and_current_url() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let mut driver = create_headless_driver().await?;

    let url = format!("{}/page2", server.url());
    Surface::navigate(&driver, &url).await?;
    assert!(Surface::current_url(&driver).await?.ends_with("/page2"));
    assert!(Surface::is_alive(&driver).await);

    Surface::close(&mut driver).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_capture_returns_png() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let mut driver = create_headless_driver().await?;

    Surface::navigate(&driver, &server.url()).await?;
    let png = driver.capture(true).await?;

    // PNG signature
    assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    assert!(png.len() > 1000);

    Surface::close(&mut driver).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_ready_selector_and_origin() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let mut driver = create_headless_driver().await?;

    Surface::navigate(&driver, &server.url()).await?;
    driver
        .wait_for_selector("canvas", Duration::from_secs(5))
        .await?;

    let (x, y) = driver.element_origin("canvas").await?;
    assert!((x - CANVAS_OFFSET.0).abs() < 1.0);
    assert!((y - CANVAS_OFFSET.1).abs() < 1.0);

    let missing = driver
        .wait_for_selector("#does-not-exist", Duration::from_millis(600))
        .await;
    assert!(matches!(missing, Err(JourneyError::ElementNotFound(_))));

    assert!(matches!(
        driver.element_origin("#does-not-exist").await,
        Err(JourneyError::ElementNotFound(_))
    ));

    Surface::close(&mut driver).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_click_flash_is_detected() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let mut driver = create_headless_driver().await?;

    Surface::navigate(&driver, &server.url()).await?;
    driver
        .wait_for_selector("canvas", Duration::from_secs(5))
        .await?;
    let (ox, oy) = driver.element_origin("canvas").await?;

    let before = driver.capture(false).await?;
    driver.click_at(ox + 5.0, oy + 5.0).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let after = driver.capture(false).await?;

    let detection = RegionDetector::default().detect_transition_png(&before, &after)?;
    let rects = detection.rectangles();
    assert_eq!(rects.len(), 1, "expected one flashed hotspot, got {:?}", rects);

    // page coordinates, within a pixel of the drawn hotspot
    let rect = rects[0];
    let expected_min_x = ox as i64 + HOTSPOT.0 as i64;
    let expected_min_y = oy as i64 + HOTSPOT.1 as i64;
    assert!((rect.min_x as i64 - expected_min_x).abs() <= 1);
    assert!((rect.min_y as i64 - expected_min_y).abs() <= 1);
    assert!((rect.width() as i64 - (HOTSPOT.2 - HOTSPOT.0) as i64).abs() <= 1);

    Surface::close(&mut driver).await?;
    Ok(())
}
