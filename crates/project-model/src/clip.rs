//! Clip variants and their shared placement/effect fields.
//!
//! Clips are persisted as flat JSON objects discriminated by `"type"`.
//! Variant-specific fields live in the tagged [`ClipKind`]; placement fields
//! shared by every visual variant are flattened in from [`Visual`].

use serde::{Deserialize, Serialize};

use crate::geometry::{CropBox, FitMode, Position, Size};

/// Shortest segment the engine will render, in seconds.
pub const MIN_SEGMENT_DURATION: f64 = 0.05;

/// Playback speed bounds.
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

fn default_layer() -> i32 {
    1
}

/// One item on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Unique clip identifier.
    #[serde(default)]
    pub id: String,

    /// Timeline-absolute start, in seconds.
    #[serde(default)]
    pub start_time: f64,

    /// Timeline duration, in seconds.
    pub duration: f64,

    /// Stacking layer; the lowest video layer forms the base sequence.
    #[serde(default = "default_layer")]
    pub layer: i32,

    /// Explicit layer group tag. `None` uses the variant's default group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_group: Option<String>,

    #[serde(flatten)]
    pub kind: ClipKind,
}

/// Variant-specific clip payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClipKind {
    Video(MediaClip),
    Image(MediaClip),
    Text(TextClip),
    Shape(ShapeClip),
    Audio(AudioClip),
}

/// Placement fields shared by video, image, text and shape clips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visual {
    pub position: Position,
    pub size: Size,
    /// Clockwise rotation in degrees.
    pub rotation: f64,
    pub fit_mode: FitMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropBox>,
    pub effects: Effects,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<Keyframe>,
}

/// A clip backed by a stored media source (video or still image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaClip {
    pub source_id: String,

    /// Offset into the source, in seconds.
    #[serde(default)]
    pub trim_start: f64,

    /// End of the source window. When set, the rendered duration derives
    /// from the window instead of `duration`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,

    #[serde(flatten)]
    pub visual: Visual,
}

/// Burned-in text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextClip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(flatten)]
    pub visual: Visual,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A parametric vector shape, rasterized at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeClip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(flatten)]
    pub visual: Visual,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub outline: bool,
}

/// A standalone audio asset mixed in at its start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub source_id: String,
    #[serde(default)]
    pub trim_start: f64,
    #[serde(default)]
    pub effects: Effects,
}

/// Per-clip effect parameters. Absent fields take the neutral value
/// exposed by the accessor of the same name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_fade_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_fade_out: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<String>,
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

impl Effects {
    pub fn opacity(&self) -> f64 {
        finite_or(self.opacity, 1.0).clamp(0.0, 1.0)
    }

    pub fn brightness(&self) -> f64 {
        finite_or(self.brightness, 0.0)
    }

    pub fn contrast(&self) -> f64 {
        finite_or(self.contrast, 1.0)
    }

    pub fn saturation(&self) -> f64 {
        finite_or(self.saturation, 1.0)
    }

    pub fn gamma(&self) -> f64 {
        finite_or(self.gamma, 1.0)
    }

    pub fn hue(&self) -> f64 {
        finite_or(self.hue, 0.0)
    }

    pub fn blur(&self) -> f64 {
        finite_or(self.blur, 0.0)
    }

    pub fn volume(&self) -> f64 {
        finite_or(self.volume, 1.0)
    }

    pub fn fade_in(&self) -> f64 {
        finite_or(self.fade_in, 0.0).max(0.0)
    }

    pub fn fade_out(&self) -> f64 {
        finite_or(self.fade_out, 0.0).max(0.0)
    }

    /// Audio fade-in length; defaults to the video fade-in.
    pub fn audio_fade_in(&self) -> f64 {
        finite_or(self.audio_fade_in, self.fade_in()).max(0.0)
    }

    /// Audio fade-out length; defaults to the video fade-out.
    pub fn audio_fade_out(&self) -> f64 {
        finite_or(self.audio_fade_out, self.fade_out()).max(0.0)
    }

    /// Playback speed clamped to `[0.25, 4.0]`.
    pub fn speed(&self) -> f64 {
        finite_or(self.speed, 1.0).clamp(MIN_SPEED, MAX_SPEED)
    }

    pub fn transition_duration(&self) -> f64 {
        finite_or(self.transition_duration, 0.0)
    }

    /// Explicit transition target, ignoring blank ids.
    pub fn transition_with(&self) -> Option<&str> {
        self.transition_with
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One animation sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    /// Sample time. Clip-relative unless `absolute` is set.
    pub time: f64,
    #[serde(default)]
    pub absolute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<KeyframePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Keyframed position; each axis may be animated independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyframePosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// Layer group used to rank overlays in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerGroup {
    Video,
    Graphics,
    Audio,
    Other,
}

impl LayerGroup {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "video" => LayerGroup::Video,
            "graphics" => LayerGroup::Graphics,
            "audio" => LayerGroup::Audio,
            _ => LayerGroup::Other,
        }
    }

    /// Paint rank: video below graphics below everything else.
    pub fn rank(self) -> u8 {
        match self {
            LayerGroup::Video => 0,
            LayerGroup::Graphics => 1,
            LayerGroup::Audio | LayerGroup::Other => 2,
        }
    }
}

/// Source window and output length of a media clip after trim and speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWindow {
    /// Seek offset into the source.
    pub start: f64,
    /// Source seconds consumed.
    pub source_duration: f64,
    /// Rendered seconds produced (`source_duration / speed`).
    pub output_duration: f64,
    pub speed: f64,
}

impl MediaClip {
    /// Resolve the trimmed source window for a clip of `clip_duration` seconds.
    pub fn source_window(&self, clip_duration: f64) -> SourceWindow {
        let speed = self.visual.effects.speed();
        let duration = clip_duration.max(MIN_SEGMENT_DURATION);
        let start = self.trim_start.max(0.0);
        let source_duration = match self.trim_end.filter(|end| end.is_finite()) {
            Some(end) => (end - start).max(MIN_SEGMENT_DURATION),
            None => duration * speed,
        };
        SourceWindow {
            start,
            source_duration,
            output_duration: (source_duration / speed).max(MIN_SEGMENT_DURATION),
            speed,
        }
    }
}

/// Access to the placement fields of visual clips.
pub trait Positioned {
    fn visual(&self) -> &Visual;

    fn effects(&self) -> &Effects {
        &self.visual().effects
    }

    fn keyframes(&self) -> &[Keyframe] {
        &self.visual().keyframes
    }
}

impl Positioned for MediaClip {
    fn visual(&self) -> &Visual {
        &self.visual
    }
}

impl Positioned for TextClip {
    fn visual(&self) -> &Visual {
        &self.visual
    }
}

impl Positioned for ShapeClip {
    fn visual(&self) -> &Visual {
        &self.visual
    }
}

impl TextClip {
    /// Text to draw: `text`, then `label`, then a placeholder.
    pub fn display_text(&self) -> &str {
        [self.text.as_deref(), self.label.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("Text")
    }
}

impl ShapeClip {
    /// Shape vocabulary name: `style.shapeType`, then `label`, then `square`.
    pub fn shape_name(&self) -> String {
        [self.style.shape_type.as_deref(), self.label.as_deref()]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_ascii_lowercase())
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| "square".to_string())
    }
}

impl Clip {
    /// Timeline end (`start + duration`).
    pub fn end(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ClipKind::Video(_) => "video",
            ClipKind::Image(_) => "image",
            ClipKind::Text(_) => "text",
            ClipKind::Shape(_) => "shape",
            ClipKind::Audio(_) => "audio",
        }
    }

    /// Layer group: explicit tag or the variant default.
    pub fn group(&self) -> LayerGroup {
        match self.layer_group.as_deref() {
            Some(tag) if !tag.trim().is_empty() => LayerGroup::parse(tag),
            _ => match self.kind {
                ClipKind::Video(_) => LayerGroup::Video,
                ClipKind::Image(_) | ClipKind::Text(_) | ClipKind::Shape(_) => {
                    LayerGroup::Graphics
                }
                ClipKind::Audio(_) => LayerGroup::Audio,
            },
        }
    }

    /// Placement fields, for every variant except audio.
    pub fn visual(&self) -> Option<&Visual> {
        match &self.kind {
            ClipKind::Video(m) | ClipKind::Image(m) => Some(&m.visual),
            ClipKind::Text(t) => Some(&t.visual),
            ClipKind::Shape(s) => Some(&s.visual),
            ClipKind::Audio(_) => None,
        }
    }

    pub fn effects(&self) -> &Effects {
        match &self.kind {
            ClipKind::Audio(a) => &a.effects,
            _ => self.visual().map(|v| &v.effects).unwrap_or(&NEUTRAL_EFFECTS),
        }
    }

    pub fn as_video(&self) -> Option<&MediaClip> {
        match &self.kind {
            ClipKind::Video(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, ClipKind::Video(_))
    }

    /// Referenced source/asset id, if any.
    pub fn source_id(&self) -> Option<&str> {
        match &self.kind {
            ClipKind::Video(m) | ClipKind::Image(m) => Some(&m.source_id),
            ClipKind::Audio(a) => Some(&a.source_id),
            ClipKind::Text(_) | ClipKind::Shape(_) => None,
        }
    }

    /// Seconds this clip occupies once rendered.
    ///
    /// Video clips honour their trim window and speed; everything else
    /// uses `duration`.
    pub fn effective_duration(&self) -> f64 {
        match &self.kind {
            ClipKind::Video(m) if m.trim_end.is_some() => {
                m.source_window(self.duration).output_duration
            }
            _ => self.duration,
        }
    }

    /// End computed from the effective duration.
    pub fn effective_end(&self) -> f64 {
        self.start_time + self.effective_duration()
    }
}

static NEUTRAL_EFFECTS: Effects = Effects {
    opacity: None,
    brightness: None,
    contrast: None,
    saturation: None,
    gamma: None,
    hue: None,
    blur: None,
    volume: None,
    fade_in: None,
    fade_out: None,
    audio_fade_in: None,
    audio_fade_out: None,
    speed: None,
    transition: None,
    transition_duration: None,
    transition_with: None,
    blend_mode: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Clip {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_video_clip_defaults() {
        let clip = parse(r#"{ "id": "c1", "type": "video", "sourceId": "s1", "duration": 4 }"#);
        assert_eq!(clip.layer, 1);
        assert_eq!(clip.start_time, 0.0);
        assert_eq!(clip.group(), LayerGroup::Video);
        let video = clip.as_video().unwrap();
        assert_eq!(video.source_id, "s1");
        assert_eq!(video.visual.size.width, 100.0);
        assert_eq!(video.visual.fit_mode, FitMode::Fit);
        assert_eq!(video.visual.effects.speed(), 1.0);
        assert_eq!(video.visual.effects.opacity(), 1.0);
    }

    #[test]
    fn test_effects_and_keyframes_parse() {
        let clip = parse(
            r##"{
                "id": "t1", "type": "text", "startTime": 2.5, "duration": 3,
                "text": "Hello", "style": { "color": "#ff0000" },
                "position": { "x": 10, "y": 20 },
                "effects": { "opacity": 1.7, "transition": "Cross Fade", "transitionDuration": 0.5 },
                "keyframes": [ { "time": 0, "position": { "x": 0 } }, { "time": 1, "opacity": 0.5 } ]
            }"##,
        );
        assert_eq!(clip.kind_name(), "text");
        assert_eq!(clip.group(), LayerGroup::Graphics);
        let ClipKind::Text(text) = &clip.kind else {
            panic!("expected text clip");
        };
        assert_eq!(text.display_text(), "Hello");
        assert_eq!(text.style.color.as_deref(), Some("#ff0000"));
        assert_eq!(text.effects().opacity(), 1.0);
        assert_eq!(text.effects().transition.as_deref(), Some("Cross Fade"));
        assert_eq!(text.keyframes().len(), 2);
        assert_eq!(text.keyframes()[0].position.unwrap().x, Some(0.0));
    }

    #[test]
    fn test_explicit_layer_group_overrides_variant() {
        let clip = parse(
            r#"{ "id": "v", "type": "video", "sourceId": "s", "duration": 1, "layerGroup": "graphics" }"#,
        );
        assert_eq!(clip.group(), LayerGroup::Graphics);
        let clip = parse(
            r#"{ "id": "v", "type": "video", "sourceId": "s", "duration": 1, "layerGroup": "stickers" }"#,
        );
        assert_eq!(clip.group().rank(), 2);
    }

    #[test]
    fn test_trim_end_drives_effective_duration() {
        let clip = parse(
            r#"{ "id": "v", "type": "video", "sourceId": "s", "duration": 10,
                 "trimStart": 1, "trimEnd": 5, "effects": { "speed": 2 } }"#,
        );
        assert!((clip.effective_duration() - 2.0).abs() < 1e-9);

        let clip = parse(
            r#"{ "id": "v", "type": "video", "sourceId": "s", "duration": 3, "effects": { "speed": 2 } }"#,
        );
        let window = clip.as_video().unwrap().source_window(clip.duration);
        assert!((window.source_duration - 6.0).abs() < 1e-9);
        assert!((clip.effective_duration() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_is_clamped() {
        let effects = Effects {
            speed: Some(10.0),
            ..Effects::default()
        };
        assert_eq!(effects.speed(), MAX_SPEED);
        let effects = Effects {
            speed: Some(0.0),
            ..Effects::default()
        };
        assert_eq!(effects.speed(), MIN_SPEED);
    }

    #[test]
    fn test_audio_fades_default_to_video_fades() {
        let effects = Effects {
            fade_in: Some(0.5),
            fade_out: Some(1.0),
            audio_fade_out: Some(0.25),
            ..Effects::default()
        };
        assert_eq!(effects.audio_fade_in(), 0.5);
        assert_eq!(effects.audio_fade_out(), 0.25);
    }

    #[test]
    fn test_shape_name_fallbacks() {
        let clip = parse(r#"{ "id": "s", "type": "shape", "duration": 1, "label": "Circle" }"#);
        let ClipKind::Shape(shape) = &clip.kind else {
            panic!("expected shape clip");
        };
        assert_eq!(shape.shape_name(), "circle");

        let clip = parse(r#"{ "id": "s", "type": "shape", "duration": 1 }"#);
        let ClipKind::Shape(shape) = &clip.kind else {
            panic!("expected shape clip");
        };
        assert_eq!(shape.shape_name(), "square");
    }

    #[test]
    fn test_clip_serializes_with_type_tag() {
        let clip = parse(r#"{ "id": "a", "type": "audio", "sourceId": "music", "duration": 2 }"#);
        let value = serde_json::to_value(&clip).unwrap();
        assert_eq!(value["type"], "audio");
        assert_eq!(value["sourceId"], "music");
        assert_eq!(value["startTime"], 0.0);
    }
}
