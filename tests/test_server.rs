//! Local HTTP server for tests
//!
//! Serves a small "prototype" page: a canvas that flashes a red hotspot for
//! a moment whenever it is clicked, plus a plain second page for navigation.
//!
//! Each server instance runs on a random available port for test isolation.

#![allow(dead_code)]

use std::net::SocketAddr;
use tokio::sync::oneshot;
use warp::Filter;

/// Hotspot drawn on the canvas, canvas-relative `(min_x, min_y, max_x, max_y)`
pub const HOTSPOT: (u32, u32, u32, u32) = (40, 40, 159, 99);

/// Canvas offset inside the page
pub const CANVAS_OFFSET: (f64, f64) = (30.0, 20.0);

pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a new test server on a random available port
    pub async fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let prototype = warp::path::end().map(|| {
            warp::reply::html(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Prototype</title>
    <style>
        body { margin: 0; background: #ffffff; }
        canvas { position: absolute; left: 30px; top: 20px; }
    </style>
</head>
<body>
    <canvas id="stage" width="400" height="300"></canvas>
    <script>
        const stage = document.getElementById('stage');
        const ctx = stage.getContext('2d');
        const clear = () => { ctx.fillStyle = '#f4f4f4'; ctx.fillRect(0, 0, 400, 300); };
        clear();
        stage.addEventListener('click', () => {
            ctx.fillStyle = 'rgb(230, 20, 20)';
            ctx.fillRect(40, 40, 120, 60);
            setTimeout(clear, 1500);
        });
    </script>
</body>
</html>"#,
            )
        });

        let page2 = warp::path("page2").map(|| {
            warp::reply::html(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Test Page 2</title>
</head>
<body>
    <h1>Test Page 2</h1>
    <p><a href="/">Back to the prototype</a></p>
</body>
</html>"#,
            )
        });

        let routes = prototype.or(page2);

        let (addr, server) =
            warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                shutdown_rx.await.ok();
            });

        tokio::spawn(server);

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this server (e.g., "http://127.0.0.1:12345")
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready by making a test request
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let url = self.url();
        let max_attempts = 10;

        for attempt in 1..=max_attempts {
            match reqwest::get(&url).await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    println!(
                        "Attempt {}: server returned status {}",
                        attempt,
                        response.status()
                    );
                }
                Err(e) => {
                    println!("Attempt {}: server not ready - {}", attempt, e);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }

        anyhow::bail!(
            "Server did not become ready after {} attempts",
            max_attempts
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
