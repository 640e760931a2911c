//! Image-to-video animation through the Veo long-running operations API.
//!
//! Video generation is the one flow behind a paid-tier credential, so it is
//! guarded by a [`CapabilityProvider`] gate that runs before any request is
//! built. Submission starts a long-running operation; the client then polls
//! the operation resource at a fixed interval until it reports done.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::client::{ClientConfig, GeminiClient, GeminiError};

/// Model used for image-to-video animation.
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Animation prompt used when the caller provides none.
pub const DEFAULT_ANIMATION_PROMPT: &str = "Animate this image cinematically";

/// Fixed delay between polls of a running operation (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default limit on how long to poll before giving up (10 minutes).
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Aspect ratio requested for generated videos.
pub const VIDEO_ASPECT_RATIO: &str = "9:16";

/// Resolution requested for generated videos.
pub const VIDEO_RESOLUTION: &str = "720p";

/// Number of videos requested per submission.
const VIDEO_COUNT: u32 = 1;

/// Gate for the paid-tier video capability.
///
/// Checked before any video request is built, and again by the CLI before
/// the command even starts, so a missing credential never costs a network
/// round trip.
pub trait CapabilityProvider {
    /// Whether a credential sufficient for video generation is present.
    fn has_credential(&self) -> bool;

    /// Ask the user to supply a credential, where the environment has a way
    /// to do that. Implementations without one do nothing.
    fn request_credential(&self);
}

/// Capability provider for environments with no gating, such as tests or
/// callers that manage credentials themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapabilityCheck;

impl CapabilityProvider for NoCapabilityCheck {
    fn has_credential(&self) -> bool {
        true
    }

    fn request_credential(&self) {}
}

/// How long to keep polling a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// Give up with a timeout error once the deadline passes.
    Bounded(Duration),
    /// Poll until the operation completes, however long that takes.
    Unbounded,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::Bounded(DEFAULT_GENERATION_TIMEOUT)
    }
}

/// Request body for the predictLongRunning endpoint.
#[derive(Debug, Serialize)]
struct GenerateVideosRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: ImageInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageInput {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: String,
    number_of_videos: u32,
    resolution: String,
}

/// A Veo long-running operation, as returned by submission and polling.
#[derive(Debug, Deserialize)]
pub struct VideoOperation {
    /// Operation resource name, polled via GET until done.
    #[serde(default)]
    pub name: String,
    /// Whether the operation has finished, successfully or not.
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: Option<String>,
}

/// Payload of a finished operation. The API has emitted two shapes for
/// this over time, so both are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generated_videos: Vec<GeneratedVideo>,
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedVideo>,
}

#[derive(Debug, Deserialize)]
struct GeneratedVideo {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

fn uri_of(videos: &[GeneratedVideo]) -> Option<&str> {
    videos.first()?.video.as_ref()?.uri.as_deref()
}

impl VideoOperation {
    /// Error message reported by the remote operation, if it failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| {
            error
                .message
                .as_deref()
                .unwrap_or("unknown error")
        })
    }

    /// URI of the first generated video, from whichever response shape the
    /// server used. Only the first entry counts; later entries are ignored.
    pub fn first_video_uri(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        uri_of(&response.generated_videos).or_else(|| {
            response
                .generate_video_response
                .as_ref()
                .and_then(|inner| uri_of(&inner.generated_samples))
        })
    }
}

impl GeminiClient {
    /// Animate an image into a short video.
    ///
    /// Checks the capability gate, submits the animation job, polls until
    /// the operation completes, and returns a download URL for the result.
    /// The returned URL has the API key appended as a query parameter
    /// because the video endpoint authenticates downloads that way.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `capability` - Gate for the paid video capability
    /// * `image` - Raw bytes of the source image
    /// * `mime_type` - MIME type of the source image
    /// * `prompt` - Animation prompt; `None` or empty uses a stock prompt
    /// * `policy` - How long to keep polling before giving up
    ///
    /// # Returns
    ///
    /// A fetchable URL for the generated video.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if the capability gate reports
    /// no credential (nothing is submitted in that case),
    /// `GeminiError::ApiError` if the remote operation fails,
    /// `GeminiError::NoVideoReturned` if the finished operation carries no
    /// video URI, or `GeminiError::Timeout` if the poll deadline passes.
    pub async fn animate_image(
        &self,
        config: &ClientConfig,
        capability: &dyn CapabilityProvider,
        image: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
        policy: PollPolicy,
    ) -> Result<String, GeminiError> {
        self.animate_image_with_interval(
            config,
            capability,
            image,
            mime_type,
            prompt,
            policy,
            DEFAULT_POLL_INTERVAL,
        )
        .await
    }

    /// Animate an image with a custom poll interval.
    ///
    /// Same as `animate_image`, but allows tests to poll faster than the
    /// production interval.
    #[allow(clippy::too_many_arguments)]
    pub async fn animate_image_with_interval(
        &self,
        config: &ClientConfig,
        capability: &dyn CapabilityProvider,
        image: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
        policy: PollPolicy,
        poll_interval: Duration,
    ) -> Result<String, GeminiError> {
        use tokio::time::Instant;

        // Re-check here even though the CLI gates earlier: nothing may be
        // submitted without a credential.
        if !capability.has_credential() {
            log::warn!("Video generation requested without a configured API key");
            return Err(GeminiError::MissingApiKey);
        }

        log::info!("Submitting animation request...");
        let mut operation = self.submit_animation(config, image, mime_type, prompt).await?;
        log::info!("Animation submitted, operation: {}", operation.name);

        let deadline = match policy {
            PollPolicy::Bounded(limit) => Some(Instant::now() + limit),
            PollPolicy::Unbounded => None,
        };

        while !operation.done {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    log::error!("Video generation timed out: operation={}", operation.name);
                    return Err(GeminiError::Timeout);
                }
            }

            log::debug!("Operation not done, waiting {:?}...", poll_interval);
            tokio::time::sleep(poll_interval).await;
            operation = self.poll_animation(config, &operation.name).await?;
        }

        if let Some(message) = operation.error_message() {
            log::error!("Video generation failed: {}", message);
            return Err(GeminiError::ApiError(format!(
                "Video generation failed: {}",
                message
            )));
        }

        match operation.first_video_uri() {
            Some(uri) => {
                log::info!("Animation complete!");
                // The download endpoint authenticates via query parameter.
                Ok(format!("{}&key={}", uri, config.api_key()))
            }
            None => Err(GeminiError::NoVideoReturned),
        }
    }

    /// Submit an animation job to the predictLongRunning endpoint.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `image` - Raw bytes of the source image
    /// * `mime_type` - MIME type of the source image
    /// * `prompt` - Animation prompt; `None` or empty uses a stock prompt
    ///
    /// # Returns
    ///
    /// The initial `VideoOperation`, usually not yet done.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::ApiError` if the API rejects the submission,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn submit_animation(
        &self,
        config: &ClientConfig,
        image: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<VideoOperation, GeminiError> {
        let prompt = match prompt {
            Some(prompt) if !prompt.is_empty() => prompt,
            _ => DEFAULT_ANIMATION_PROMPT,
        };

        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            config.base_url(),
            VIDEO_MODEL
        );

        let request = GenerateVideosRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image: ImageInput {
                    bytes_base64_encoded: STANDARD.encode(image),
                    mime_type: mime_type.to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: VIDEO_ASPECT_RATIO.to_string(),
                number_of_videos: VIDEO_COUNT,
                resolution: VIDEO_RESOLUTION.to_string(),
            },
        };

        let response = self
            .http_client()
            .post(&url)
            .header("x-goog-api-key", config.api_key())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::ApiError(format!(
                "Video submission failed with status {}: {}",
                status, error_text
            )));
        }

        let operation: VideoOperation = response.json().await?;
        Ok(operation)
    }

    /// Fetch the current state of a running operation.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `operation_name` - Operation resource name from `submit_animation`
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::ApiError` if the API returns an error response,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn poll_animation(
        &self,
        config: &ClientConfig,
        operation_name: &str,
    ) -> Result<VideoOperation, GeminiError> {
        let url = format!("{}/v1beta/{}", config.base_url(), operation_name);

        let response = self
            .http_client()
            .get(&url)
            .header("x-goog-api-key", config.api_key())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::ApiError(format!(
                "Operation status check failed with status {}: {}",
                status, error_text
            )));
        }

        let operation: VideoOperation = response.json().await?;
        Ok(operation)
    }

    /// Download a generated video to disk.
    ///
    /// Streams the download to disk without loading the full video into
    /// memory. The URL already carries its own authentication, so no
    /// headers are added.
    ///
    /// # Arguments
    ///
    /// * `url` - The video URL returned by `animate_image`
    /// * `dest` - The destination path for the video file
    ///
    /// # Returns
    ///
    /// The path to the downloaded video file on success.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::HttpError` if the download request fails,
    /// `GeminiError::IoError` if writing to disk fails, or
    /// `GeminiError::ApiError` if the server returns an error response.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<PathBuf, GeminiError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.http_client().get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::ApiError(format!(
                "Video download failed with status {}: {}",
                status, error_text
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_policy_defaults_to_bounded() {
        assert_eq!(
            PollPolicy::default(),
            PollPolicy::Bounded(DEFAULT_GENERATION_TIMEOUT)
        );
    }

    #[test]
    fn test_no_capability_check_always_passes() {
        let capability = NoCapabilityCheck;
        assert!(capability.has_credential());
        capability.request_credential();
    }

    #[test]
    fn test_operation_done_defaults_to_false() {
        let operation: VideoOperation =
            serde_json::from_value(serde_json::json!({ "name": "operations/abc" })).unwrap();
        assert_eq!(operation.name, "operations/abc");
        assert!(!operation.done);
        assert!(operation.error_message().is_none());
        assert!(operation.first_video_uri().is_none());
    }

    #[test]
    fn test_first_video_uri_sdk_shape() {
        let operation: VideoOperation = serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generatedVideos": [
                    { "video": { "uri": "https://videos.example/1?alt=media" } },
                    { "video": { "uri": "https://videos.example/2?alt=media" } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(
            operation.first_video_uri(),
            Some("https://videos.example/1?alt=media")
        );
    }

    #[test]
    fn test_first_video_uri_rest_shape() {
        let operation: VideoOperation = serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": "https://videos.example/sample?alt=media" } }
                    ]
                }
            }
        }))
        .unwrap();

        assert_eq!(
            operation.first_video_uri(),
            Some("https://videos.example/sample?alt=media")
        );
    }

    #[test]
    fn test_first_video_uri_only_checks_first_entry() {
        // A first entry without a URI hides later entries, matching the
        // index-zero lookup the API contract promises.
        let operation: VideoOperation = serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generatedVideos": [
                    { "video": {} },
                    { "video": { "uri": "https://videos.example/2?alt=media" } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(operation.first_video_uri(), None);
    }

    #[test]
    fn test_error_message_falls_back_when_absent() {
        let operation: VideoOperation = serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "error": {}
        }))
        .unwrap();

        assert_eq!(operation.error_message(), Some("unknown error"));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateVideosRequest {
            instances: vec![VideoInstance {
                prompt: "Animate this".to_string(),
                image: ImageInput {
                    bytes_base64_encoded: "QUJD".to_string(),
                    mime_type: "image/png".to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: VIDEO_ASPECT_RATIO.to_string(),
                number_of_videos: VIDEO_COUNT,
                resolution: VIDEO_RESOLUTION.to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "Animate this");
        assert_eq!(json["instances"][0]["image"]["bytesBase64Encoded"], "QUJD");
        assert_eq!(json["instances"][0]["image"]["mimeType"], "image/png");
        assert_eq!(json["parameters"]["aspectRatio"], "9:16");
        assert_eq!(json["parameters"]["numberOfVideos"], 1);
        assert_eq!(json["parameters"]["resolution"], "720p");
    }
}
