//! Guided traversal: replay a path through the UI state graph
//!
//! The design file open in the session is reopened as a prototype, then
//! steered node by node through the `node-id` query parameter, with one
//! screenshot per transition.

use super::AutomationDriver;
use crate::error::{JourneyError, Result};
use crate::graph::{path_edges, require_path, Edge, Graph};
use crate::step::ImageRef;
use url::Url;

/// Turn a design-file URL into the prototype player URL for the same file.
///
/// `https://www.figma.com/design/<key>/<name>?...` becomes
/// `https://www.figma.com/proto/<key>/<name>?...`.
pub fn prototype_url(design_url: &str) -> Result<Url> {
    let mut url = Url::parse(design_url)
        .map_err(|e| JourneyError::InvalidInput(format!("Invalid URL {}: {}", design_url, e)))?;

    let mut segments: Vec<String> = url
        .path_segments()
        .map(|segments| segments.map(str::to_string).collect())
        .unwrap_or_default();
    match segments.first_mut() {
        Some(first) if !first.is_empty() => *first = "proto".to_string(),
        _ => {
            return Err(JourneyError::InvalidInput(format!(
                "URL has no path to rewrite: {}",
                design_url
            )))
        }
    }
    url.set_path(&format!("/{}", segments.join("/")));
    Ok(url)
}

/// Copy of `url` with `node-id` set to `node_id`, other parameters kept
pub fn with_node_id(url: &Url, node_id: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "node-id")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut steered = url.clone();
    {
        let mut query = steered.query_pairs_mut();
        query.clear();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        query.append_pair("node-id", node_id);
    }
    steered
}

impl AutomationDriver {
    /// Walk the first path found from `start_id` to `end_id`, capturing one
    /// screenshot per edge as `<source>_<target>.png`.
    ///
    /// The session must be on a design file. The original location is
    /// restored afterwards, also when the walk fails.
    pub async fn execute_graph(
        &mut self,
        graph: &Graph,
        start_id: &str,
        end_id: &str,
    ) -> Result<Vec<ImageRef>> {
        self.ensure_ready()?;

        let original_url = self.current_url().await?;
        if !original_url.contains(&self.config.supported_surface) {
            log::error!("Guided traversal refused on {}", original_url);
            return Err(JourneyError::UnsupportedSurface(original_url));
        }

        let path = require_path(graph, start_id, end_id)?;
        let edges = path_edges(graph, &path)?;
        log::info!("Replaying path {}", path.join(" -> "));

        let base = prototype_url(&original_url)?;
        let walked = self.walk(&base, start_id, &edges).await;

        if let Err(e) = self.navigate(&original_url).await {
            log::warn!("Could not restore {}: {}", original_url, e);
            if walked.is_ok() {
                return Err(e);
            }
        }
        walked
    }

    async fn walk(&mut self, base: &Url, start_id: &str, edges: &[&Edge]) -> Result<Vec<ImageRef>> {
        self.navigate(with_node_id(base, start_id).as_str()).await?;
        tokio::time::sleep(self.config.navigation_settle()).await;

        let mut screenshots = Vec::with_capacity(edges.len());
        for edge in edges {
            self.navigate(with_node_id(base, &edge.target_id).as_str())
                .await?;
            tokio::time::sleep(self.config.navigation_settle()).await;

            let bytes = self.capture().await?;
            let key = format!("{}_{}.png", edge.source_id, edge.target_id);
            let image = self.store.put(&bytes, &key).await?;
            log::info!("Captured {}", key);
            screenshots.push(image);
        }
        Ok(screenshots)
    }
}
