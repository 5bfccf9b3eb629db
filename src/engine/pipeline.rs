//! Logo post-processing pipeline.
//!
//! Stages run strictly in order, each consuming the previous stage's buffer:
//!   Fetch -> Decode -> Quantize -> Crop -> Export
//!
//! This module provides:
//! - Stage enum with tracing helpers
//! - A PipelineContext that accumulates per-stage timings
//! - The `ImageFetcher` seam and its cache-bypassing HTTP implementation
//! - `PostProcessor`, the orchestrator itself

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use image::RgbaImage;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::Serialize;

use crate::error::AppError;
use crate::http;

use super::color::Color;
use super::crop::auto_crop;
use super::export::{encode_png, trace_svg};
use super::quantize::{quantize, Palette};

// =============================================================================
// Pipeline stages
// =============================================================================

/// The ordered stages of logo post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Download the generated image bytes
    Fetch,
    /// Decode bytes into an RGBA buffer
    Decode,
    /// Snap every pixel to the 4-color palette
    Quantize,
    /// Trim to the content bounding box
    Crop,
    /// Encode PNG (and optionally trace SVG)
    Export,
}

impl PipelineStage {
    /// All stages in order.
    pub const ALL: &'static [PipelineStage] = &[
        PipelineStage::Fetch,
        PipelineStage::Decode,
        PipelineStage::Quantize,
        PipelineStage::Crop,
        PipelineStage::Export,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "Fetch",
            Self::Decode => "Decode",
            Self::Quantize => "Quantize",
            Self::Crop => "Crop",
            Self::Export => "Export",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Pipeline context (per-call tracing)
// =============================================================================

/// A trace entry for a single pipeline stage.
#[derive(Debug, Clone)]
pub struct StageTrace {
    pub stage: PipelineStage,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Accumulated timings for one post-process call.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub locator: String,
    pub started_at: Instant,
    pub stages: Vec<StageTrace>,
    current: Option<(PipelineStage, Instant)>,
}

impl PipelineContext {
    pub fn new(locator: &str) -> Self {
        Self {
            locator: locator.into(),
            started_at: Instant::now(),
            stages: Vec::new(),
            current: None,
        }
    }

    /// Enter a pipeline stage. Closes the previous stage if open.
    pub fn enter_stage(&mut self, stage: PipelineStage) {
        self.close(None);
        tracing::debug!(locator = %self.locator, stage = %stage, "Pipeline: entering stage");
        self.current = Some((stage, Instant::now()));
    }

    /// Mark the current stage as failed with an error.
    pub fn fail_stage(&mut self, error: &AppError) {
        if let Some((stage, _)) = self.current {
            tracing::warn!(locator = %self.locator, stage = %stage, error = %error, "Pipeline: stage failed");
        }
        self.close(Some(error.to_string()));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Log a summary of all stages (useful at pipeline completion).
    pub fn log_summary(&mut self) {
        self.close(None);
        let details: Vec<String> = self
            .stages
            .iter()
            .map(|s| {
                let err = s
                    .error
                    .as_ref()
                    .map(|e| format!(" [ERR: {}]", e))
                    .unwrap_or_default();
                format!("{}={}ms{}", s.stage, s.duration_ms, err)
            })
            .collect();

        tracing::info!(
            locator = %self.locator,
            total_ms = self.elapsed_ms(),
            "Pipeline summary: {}",
            details.join(", "),
        );
    }

    fn close(&mut self, error: Option<String>) {
        if let Some((stage, start)) = self.current.take() {
            self.stages.push(StageTrace {
                stage,
                duration_ms: start.elapsed().as_millis() as u64,
                error,
            });
        }
    }
}

// =============================================================================
// Fetching
// =============================================================================

/// Source of raw image bytes for a locator.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, AppError>;
}

/// HTTP fetcher that always bypasses caches; the generator may return
/// different bytes for the same locator between calls.
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, AppError> {
        let req = self
            .http
            .get(locator)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache");
        let bytes = http::send_checked(req).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Output of one post-process call.
#[derive(Debug, Clone)]
pub struct ProcessedLogo {
    pub png: Vec<u8>,
    /// Omitted when tracing fails or is disabled.
    pub svg: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Top-left of the crop within the decoded image.
    pub crop_origin: (u32, u32),
}

/// Drives fetch → decode → quantize → crop → export.
pub struct PostProcessor<F> {
    fetcher: F,
    vectorize: bool,
}

impl<F: ImageFetcher> PostProcessor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            vectorize: true,
        }
    }

    pub fn with_vectorize(mut self, vectorize: bool) -> Self {
        self.vectorize = vectorize;
        self
    }

    /// Process the image at `locator` into the team palette. Color text is
    /// sanitized first (invalid → white). Fetch and decode failures are returned.
    pub async fn process(
        &self,
        locator: &str,
        primary: &str,
        secondary: &str,
    ) -> Result<ProcessedLogo, AppError> {
        self.process_traced(locator, primary, secondary).await.0
    }

    /// Like [`process`](Self::process), also returning the stage trace. The
    /// summary is logged on every exit, failed or not.
    pub async fn process_traced(
        &self,
        locator: &str,
        primary: &str,
        secondary: &str,
    ) -> (Result<ProcessedLogo, AppError>, PipelineContext) {
        let palette = Palette::new(Color::from_user_input(primary), Color::from_user_input(secondary));
        let mut ctx = PipelineContext::new(locator);

        let result = self.run_stages(&mut ctx, locator, &palette).await;
        if let Err(e) = &result {
            ctx.fail_stage(e);
        }
        ctx.log_summary();
        (result, ctx)
    }

    async fn run_stages(
        &self,
        ctx: &mut PipelineContext,
        locator: &str,
        palette: &Palette,
    ) -> Result<ProcessedLogo, AppError> {
        ctx.enter_stage(PipelineStage::Fetch);
        let bytes = self.fetcher.fetch(locator).await?;

        ctx.enter_stage(PipelineStage::Decode);
        let decoded = decode(&bytes)?;

        self.process_pixels(ctx, &decoded, palette)
    }

    /// Quantize, crop and export an already-decoded buffer.
    pub fn process_image(&self, img: &RgbaImage, palette: &Palette) -> Result<ProcessedLogo, AppError> {
        let mut ctx = PipelineContext::new("<memory>");
        self.process_pixels(&mut ctx, img, palette)
    }

    fn process_pixels(
        &self,
        ctx: &mut PipelineContext,
        img: &RgbaImage,
        palette: &Palette,
    ) -> Result<ProcessedLogo, AppError> {
        ctx.enter_stage(PipelineStage::Quantize);
        let quantized = quantize(img, palette);

        ctx.enter_stage(PipelineStage::Crop);
        let cropped = auto_crop(&quantized);

        ctx.enter_stage(PipelineStage::Export);
        let png = encode_png(&cropped.image)?;
        let svg = if self.vectorize {
            match trace_svg(&cropped.image) {
                Ok(svg) => Some(svg),
                Err(e) => {
                    tracing::warn!(locator = %ctx.locator, error = %e, "Vector export skipped");
                    None
                }
            }
        } else {
            None
        };

        Ok(ProcessedLogo {
            png,
            svg,
            width: cropped.image.width(),
            height: cropped.image.height(),
            crop_origin: cropped.origin,
        })
    }
}

fn decode(bytes: &[u8]) -> Result<RgbaImage, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Decode("empty response body".into()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}
