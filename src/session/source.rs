use std::{fmt, sync::Arc};

use crate::error::{CaptureError, CaptureResult};
use crate::media::{CameraProvider, VideoDecoder};
use crate::models::{Frame, Prompt, SourceType};
use crate::settings::InferenceSettings;

/// The media a session runs against.
pub enum SourceInput {
    Image(Frame),
    Batch(Vec<Frame>),
    Video(Box<dyn VideoDecoder>),
    Webcam(Arc<dyn CameraProvider>),
    /// Decoded server-side; the engine only forwards the URL.
    Rtsp(String),
}

impl SourceInput {
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceInput::Image(_) => SourceType::Image,
            SourceInput::Batch(_) => SourceType::Batch,
            SourceInput::Video(_) => SourceType::Video,
            SourceInput::Webcam(_) => SourceType::Webcam,
            SourceInput::Rtsp(_) => SourceType::Rtsp,
        }
    }

    /// Local readiness checks; nothing here touches the network.
    pub(crate) fn check_ready(&self) -> CaptureResult<()> {
        match self {
            SourceInput::Image(frame) => check_frame(frame),
            SourceInput::Batch(frames) => {
                if frames.is_empty() {
                    return Err(CaptureError::precondition("no images selected"));
                }
                frames.iter().try_for_each(check_frame)
            }
            SourceInput::Video(decoder) => {
                if decoder.path().as_os_str().is_empty() {
                    return Err(CaptureError::precondition("no video file selected"));
                }
                Ok(())
            }
            SourceInput::Webcam(_) => Ok(()),
            SourceInput::Rtsp(url) => check_stream_url(url),
        }
    }
}

impl fmt::Debug for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInput::Image(frame) => f.debug_tuple("Image").field(&frame.file_name).finish(),
            SourceInput::Batch(frames) => f.debug_tuple("Batch").field(&frames.len()).finish(),
            SourceInput::Video(decoder) => f.debug_tuple("Video").field(&decoder.path()).finish(),
            SourceInput::Webcam(_) => f.write_str("Webcam"),
            SourceInput::Rtsp(url) => f.debug_tuple("Rtsp").field(url).finish(),
        }
    }
}

fn check_frame(frame: &Frame) -> CaptureResult<()> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::precondition(format!(
            "image {} is empty",
            frame.file_name.as_deref().unwrap_or("<unnamed>")
        )));
    }
    Ok(())
}

fn check_stream_url(url: &str) -> CaptureResult<()> {
    let url = url.trim();
    let rest = url
        .strip_prefix("rtsp://")
        .or_else(|| url.strip_prefix("rtsps://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(CaptureError::precondition(format!("invalid stream URL: {url:?}"))),
    }
}

/// Everything `start` needs besides the controller's own wiring.
#[derive(Debug)]
pub struct StartRequest {
    pub model_id: Option<String>,
    pub inference: InferenceSettings,
    pub prompts: Vec<Prompt>,
    pub source: Option<SourceInput>,
}

impl StartRequest {
    pub fn new(source: SourceInput) -> Self {
        Self {
            model_id: None,
            inference: InferenceSettings::default(),
            prompts: Vec::new(),
            source: Some(source),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_inference(mut self, inference: InferenceSettings) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_prompts(mut self, prompts: Vec<Prompt>) -> Self {
        self.prompts = prompts;
        self
    }
}
