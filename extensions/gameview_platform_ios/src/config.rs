//! Game view configuration
//!
//! Rendering API, drawable layer properties, and frame loop settings. The
//! API and layer properties are fixed once a graphics context exists; see
//! [`GameView::set_rendering_api`](crate::GameView::set_rendering_api).

use std::time::Duration;

use gameview_platform::{GameViewError, Result};
use serde::{Deserialize, Serialize};

/// Default frame rate used when none (or zero) is requested
pub const DEFAULT_UPDATES_PER_SECOND: f64 = 60.0;

/// OpenGL ES version a context is created for
///
/// Discriminants match `EAGLRenderingAPI`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderingApi {
    /// OpenGL ES 1.1 (framebuffer objects through `GL_OES_framebuffer_object`)
    #[serde(rename = "gles1")]
    OpenGles1 = 1,
    /// OpenGL ES 2.0
    #[default]
    #[serde(rename = "gles2")]
    OpenGles2 = 2,
}

/// Pixel format of the compositor layer's backing store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    /// 32-bit RGBA
    Rgba8,
    /// 16-bit RGB
    Rgb565,
    /// 32-bit sRGB RGBA
    Srgba8,
}

/// Properties written to the compositor layer before storage is allocated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawableProperties {
    /// Keep the layer contents after presentation
    pub retained_backing: bool,
    /// Backing store pixel format
    pub color_format: ColorFormat,
}

/// Game view configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameViewConfig {
    /// OpenGL ES version for the graphics context
    pub rendering_api: RenderingApi,
    /// Whether the layer retains its contents after presentation
    pub layer_retains_backing: bool,
    /// Layer pixel format; must be set before running
    pub layer_color_format: Option<ColorFormat>,
    /// Recreate the framebuffer when the layer bounds change
    pub auto_resize: bool,
    /// Frame loop rate; `None` or zero means the default
    pub updates_per_second: Option<f64>,
}

impl Default for GameViewConfig {
    fn default() -> Self {
        Self {
            rendering_api: RenderingApi::default(),
            layer_retains_backing: false,
            layer_color_format: None,
            auto_resize: true,
            updates_per_second: None,
        }
    }
}

impl GameViewConfig {
    /// Create a configuration with the given color format
    pub fn new(color_format: ColorFormat) -> Self {
        Self {
            layer_color_format: Some(color_format),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| GameViewError::configuration(e.to_string()))
    }

    /// Set the rendering API
    pub fn rendering_api(mut self, api: RenderingApi) -> Self {
        self.rendering_api = api;
        self
    }

    /// Set whether the layer retains its backing
    pub fn layer_retains_backing(mut self, retained: bool) -> Self {
        self.layer_retains_backing = retained;
        self
    }

    /// Set the layer color format
    pub fn layer_color_format(mut self, format: ColorFormat) -> Self {
        self.layer_color_format = Some(format);
        self
    }

    /// Set whether layout changes recreate the framebuffer
    pub fn auto_resize(mut self, auto_resize: bool) -> Self {
        self.auto_resize = auto_resize;
        self
    }

    /// Set the frame loop rate
    pub fn updates_per_second(mut self, rate: f64) -> Self {
        self.updates_per_second = Some(rate);
        self
    }
}

/// Convert a frame rate into the timer interval
///
/// Zero selects [`DEFAULT_UPDATES_PER_SECOND`]. The interval keeps nanosecond
/// precision so rates like 60 Hz are not skewed by millisecond rounding.
pub fn frame_interval(updates_per_second: f64) -> Result<Duration> {
    if !updates_per_second.is_finite() || updates_per_second < 0.0 {
        return Err(GameViewError::configuration(format!(
            "updates per second must be a non-negative finite number, got {updates_per_second}"
        )));
    }

    let rate = if updates_per_second == 0.0 {
        DEFAULT_UPDATES_PER_SECOND
    } else {
        updates_per_second
    };

    let nanos = (1_000_000_000.0 / rate).round();
    if nanos < 1.0 || nanos > u64::MAX as f64 {
        return Err(GameViewError::configuration(format!(
            "updates per second out of range: {updates_per_second}"
        )));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_keeps_sub_millisecond_precision() {
        let interval = frame_interval(60.0).unwrap();
        assert_eq!(interval, Duration::from_nanos(16_666_667));
        assert_ne!(interval, Duration::from_millis(17));
        assert_ne!(interval, Duration::from_millis(16));
    }

    #[test]
    fn test_frame_interval_zero_uses_default() {
        assert_eq!(frame_interval(0.0).unwrap(), frame_interval(60.0).unwrap());
    }

    #[test]
    fn test_frame_interval_rejects_invalid_rates() {
        for rate in [-1.0, f64::NAN, f64::INFINITY, 1e12] {
            assert!(matches!(
                frame_interval(rate),
                Err(GameViewError::Configuration(_))
            ));
        }
        assert_eq!(frame_interval(30.0).unwrap(), Duration::from_nanos(33_333_333));
    }

    #[test]
    fn test_config_from_toml() {
        let config = GameViewConfig::from_toml_str(
            r#"
            rendering_api = "gles1"
            layer_retains_backing = true
            layer_color_format = "rgb565"
            updates_per_second = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.rendering_api, RenderingApi::OpenGles1);
        assert!(config.layer_retains_backing);
        assert_eq!(config.layer_color_format, Some(ColorFormat::Rgb565));
        assert!(config.auto_resize);
        assert_eq!(config.updates_per_second, Some(30.0));
    }

    #[test]
    fn test_config_from_toml_rejects_unknown_format() {
        let err = GameViewConfig::from_toml_str(r#"layer_color_format = "bgra""#).unwrap_err();
        assert!(matches!(err, GameViewError::Configuration(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = GameViewConfig::new(ColorFormat::Rgba8)
            .rendering_api(RenderingApi::OpenGles1)
            .auto_resize(false)
            .updates_per_second(120.0);

        assert_eq!(config.layer_color_format, Some(ColorFormat::Rgba8));
        assert_eq!(config.rendering_api, RenderingApi::OpenGles1);
        assert!(!config.auto_resize);
        assert_eq!(config.updates_per_second, Some(120.0));
        assert_eq!(GameViewConfig::default().layer_color_format, None);
    }
}
