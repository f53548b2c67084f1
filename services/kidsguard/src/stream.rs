//! Stream validation and preview derivation

use std::sync::OnceLock;

use regex::Regex;

use crate::context::Context;
use crate::render::escape_html;
use crate::state::StreamSession;
use crate::toast::Toast;
use crate::KidsGuardError;

fn youtube_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|live/|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]+)",
        )
        .unwrap_or_else(|e| panic!("invalid YouTube pattern: {e}"))
    })
}

fn twitch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:www\.|m\.)?twitch\.tv/([A-Za-z0-9_]+)")
            .unwrap_or_else(|e| panic!("invalid Twitch pattern: {e}"))
    })
}

/// How a validated stream is previewed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    YouTube { video_id: String },
    Twitch { channel: String },
    /// Not a known provider; shown as a "connected" placeholder
    Generic,
}

impl Preview {
    pub fn derive(stream_url: &str) -> Self {
        let url = stream_url.trim();
        if let Some(caps) = youtube_pattern().captures(url) {
            return Preview::YouTube {
                video_id: caps[1].to_string(),
            };
        }
        if let Some(caps) = twitch_pattern().captures(url) {
            return Preview::Twitch {
                channel: caps[1].to_string(),
            };
        }
        Preview::Generic
    }

    /// Player URL for known providers; `parent` is the embedding host Twitch requires
    pub fn embed_url(&self, parent: &str) -> Option<String> {
        match self {
            Preview::YouTube { video_id } => Some(format!(
                "https://www.youtube.com/embed/{}?autoplay=1&mute=1",
                video_id
            )),
            Preview::Twitch { channel } => Some(format!(
                "https://player.twitch.tv/?channel={}&parent={}&muted=true",
                channel, parent
            )),
            Preview::Generic => None,
        }
    }

    pub fn render(&self, stream_url: &str, parent: &str) -> String {
        match self.embed_url(parent) {
            Some(src) => format!(
                r#"<iframe class="stream-embed" src="{}" width="640" height="360" frameborder="0" allow="autoplay; encrypted-media" allowfullscreen></iframe>"#,
                escape_html(&src)
            ),
            None => format!(
                r#"<div class="stream-placeholder" style="padding: 2rem; text-align: center; background-color: #e9ecef; border-radius: 0.25rem;">
    <p><strong>Stream connected</strong></p>
    <p style="color: #6c757d;">{}</p>
</div>"#,
                escape_html(stream_url)
            ),
        }
    }
}

fn render_status_ok(message: &str) -> String {
    format!(
        r#"<div class="stream-status ok" style="color: #155724;">&#10003; {}</div>"#,
        escape_html(message)
    )
}

fn render_status_error(message: &str, remediation: Option<&str>) -> String {
    let hint = match remediation.filter(|r| !r.is_empty()) {
        Some(r) => format!(
            r#"<p class="remediation" style="color: #6c757d;">{}</p>"#,
            escape_html(r)
        ),
        None => String::new(),
    };
    format!(
        r#"<div class="stream-status error" style="color: #721c24;">&#10007; {}{}</div>"#,
        escape_html(message),
        hint
    )
}

/// Validate `stream_url` and make it the session's current stream on success
pub async fn validate(ctx: &Context, stream_url: &str) -> crate::Result<Preview> {
    let stream_url = stream_url.trim();
    if stream_url.is_empty() {
        ctx.notify(Toast::warning(
            "Missing stream URL",
            "Enter a live stream URL first",
        ))
        .await;
        return Err(KidsGuardError::Validation(
            "stream URL is required".to_string(),
        ));
    }

    tracing::debug!("Validating stream {}", stream_url);
    let (message, remediation, error) = match ctx.backend.validate_stream(stream_url).await {
        Ok(response) if response.valid => {
            let preview = Preview::derive(stream_url);
            let message = response
                .message
                .unwrap_or_else(|| "Stream is live".to_string());
            {
                let mut state = ctx.state.write().await;
                state.stream = StreamSession {
                    url: Some(stream_url.to_string()),
                    valid: true,
                    last_latency_ms: None,
                };
                state.page.stream_status = render_status_ok(&message);
                state.page.preview = preview.render(stream_url, &ctx.preview.embed_parent);
            }
            tracing::info!("Stream {} validated ({:?})", stream_url, preview);
            ctx.notify(Toast::success("Stream connected", message)).await;
            return Ok(preview);
        }
        Ok(response) => {
            let message = response
                .message
                .unwrap_or_else(|| "Stream is not reachable".to_string());
            let error = KidsGuardError::Api(message.clone());
            (message, response.remediation, error)
        }
        Err(e) => (e.to_string(), None, e),
    };

    tracing::warn!("Stream {} rejected: {}", stream_url, message);
    {
        let mut state = ctx.state.write().await;
        state.stream = StreamSession {
            url: Some(stream_url.to_string()),
            valid: false,
            last_latency_ms: None,
        };
        state.page.stream_status = render_status_error(&message, remediation.as_deref());
        state.page.preview = String::new();
    }
    ctx.notify(Toast::error("Stream validation failed", message))
        .await;
    Err(error)
}
