//! In-memory collaborators for driver tests
//!
//! `FakeSurface` renders a white page that shows a red hotspot square while
//! "flashing"; clicking the flash trigger point starts the flash, any other
//! click stops it. `ScriptedOracle` answers from fixed settings and counts
//! its calls. `MemoryStore` keeps stored images in a map.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use journey_webdriver::oracle::{
    ElementChoice, GoalCheck, JourneyOracle, NextAction, NextActionRequest,
};
use journey_webdriver::{
    CancelHandle, ImageRef, ImageStore, JourneyError, JourneyStep, Rectangle, Region, Result,
    Surface,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PAGE_SIZE: u32 = 100;
pub const HOTSPOT: Rectangle = Rectangle {
    min_x: 20,
    min_y: 20,
    max_x: 49,
    max_y: 49,
};

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub url: String,
    pub navigations: Vec<String>,
    pub clicks: Vec<(f64, f64)>,
    pub captures: usize,
    pub flashing: bool,
    pub closed: bool,
}

#[derive(Clone)]
pub struct FakeSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
    pub origin: (f64, f64),
    pub trigger: (f64, f64),
    pub fail_capture: bool,
}

impl FakeSurface {
    pub fn new(url: &str, origin: (f64, f64), trigger: (f64, f64)) -> Self {
        Self {
            log: Arc::new(Mutex::new(SurfaceLog {
                url: url.to_string(),
                ..SurfaceLog::default()
            })),
            origin,
            trigger,
            fail_capture: false,
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<(f64, f64)> {
        self.log.lock().unwrap().clicks.clone()
    }

    fn render(flashing: bool) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(PAGE_SIZE, PAGE_SIZE, Rgba([255, 255, 255, 255]));
        if flashing {
            for y in HOTSPOT.min_y..=HOTSPOT.max_y {
                for x in HOTSPOT.min_x..=HOTSPOT.max_x {
                    img.put_pixel(x, y, Rgba([230, 20, 20, 255]));
                }
            }
        }
        journey_webdriver::vision::encode_png(&img).unwrap()
    }
}

#[async_trait]
impl Surface for FakeSurface {
    async fn capture(&self, _full_page: bool) -> Result<Vec<u8>> {
        if self.fail_capture {
            return Err(JourneyError::Other("capture failed".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.captures += 1;
        Ok(Self::render(log.flashing))
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.clicks.push((x, y));
        log.flashing = (x, y) == (self.origin.0 + self.trigger.0, self.origin.1 + self.trigger.1);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.navigations.push(url.to_string());
        log.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.log.lock().unwrap().url.clone())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn element_origin(&self, _selector: &str) -> Result<(f64, f64)> {
        Ok(self.origin)
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Oracle answering from fixed settings
#[derive(Default)]
pub struct ScriptedOracle {
    /// Box returned by element selection; `None` means "no match"
    pub choice: Option<Rectangle>,
    /// Goal counts as achieved from this many goal checks on
    pub achieve_after: Option<usize>,
    pub fail_next_action: bool,
    pub fail_summary: bool,
    /// Cancelled during the first goal check
    pub cancel_on_goal_check: Mutex<Option<CancelHandle>>,

    pub next_action_calls: AtomicUsize,
    pub select_calls: AtomicUsize,
    pub goal_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub seen_candidates: Mutex<Vec<Vec<Region>>>,
    pub seen_history_lengths: Mutex<Vec<usize>>,
}

impl ScriptedOracle {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JourneyOracle for ScriptedOracle {
    async fn next_action(&self, request: NextActionRequest<'_>) -> Result<NextAction> {
        self.next_action_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_history_lengths
            .lock()
            .unwrap()
            .push(request.history.len());
        if self.fail_next_action {
            return Err(JourneyError::OracleFailure("next action: Invalid JSON".to_string()));
        }
        Ok(NextAction {
            action_description: format!("Click the hotspot (step {})", request.history.len() + 1),
            rationale: "It is the only thing flashing".to_string(),
        })
    }

    async fn select_element(
        &self,
        _action_description: &str,
        _annotated: &ImageRef,
        candidates: &[Region],
    ) -> Result<ElementChoice> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_candidates.lock().unwrap().push(candidates.to_vec());
        Ok(ElementChoice {
            element_name: "Hotspot".to_string(),
            bounding_box: self.choice,
        })
    }

    async fn goal_achieved(&self, _screenshot: &ImageRef, _task: &str) -> Result<GoalCheck> {
        let calls = self.goal_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cancel) = self.cancel_on_goal_check.lock().unwrap().as_ref() {
            cancel.cancel();
        }
        Ok(GoalCheck {
            achieved: self.achieve_after.is_some_and(|n| calls >= n),
            reason: None,
        })
    }

    async fn summarize(&self, steps: &[JourneyStep], _task: &str) -> Result<String> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_summary {
            return Err(JourneyError::OracleFailure("summary: empty response".to_string()));
        }
        Ok(format!("{} steps taken", steps.len()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub images: Mutex<HashMap<String, Vec<u8>>>,
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn put(&self, bytes: &[u8], key: &str) -> Result<ImageRef> {
        self.images
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self.keys.lock().unwrap().push(key.to_string());
        Ok(ImageRef {
            key: key.to_string(),
            location: format!("memory://{}", key),
            size_bytes: bytes.len(),
            sha256: journey_webdriver::store::compute_hash(bytes),
        })
    }
}
