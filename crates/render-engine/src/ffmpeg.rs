//! ffmpeg/ffprobe command-line backend.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use montage_common::{BackendConfig, MontageError, MontageResult};
use montage_project_model::format_number;

use crate::backend::{
    BackendJob, ConcatJob, Encoding, MediaBackend, MediaInfo, MediaProbe, OverlaySource,
};
use crate::filters;
use crate::probe::parse_probe_output;

/// Runs every job as one `ffmpeg` invocation and probes with `ffprobe`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    config: BackendConfig,
}

impl FfmpegBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn video_codec_args(&self, encoding: &Encoding) -> Vec<String> {
        let mut args = strings(&["-r"]);
        args.push(format_number(encoding.fps));
        args.extend(strings(&["-c:v", "libx264", "-preset"]));
        args.push(self.config.video_preset.clone());
        args.extend(strings(&["-pix_fmt", "yuv420p"]));
        if let Some(bitrate) = encoding.bitrate.as_deref().filter(|b| !b.is_empty()) {
            args.push("-b:v".to_string());
            args.push(bitrate.to_string());
        }
        args
    }

    fn audio_codec_args() -> Vec<String> {
        strings(&["-c:a", "aac", "-movflags", "+faststart"])
    }

    /// Command-line arguments for `job`, excluding the binary. Concat jobs
    /// yield the stream-copy form; see [`Self::concat_reencode_args`].
    pub fn build_args(&self, job: &BackendJob) -> Vec<String> {
        let rate = self.config.silence_sample_rate;
        let mut args = strings(&["-y", "-hide_banner"]);
        match job {
            BackendJob::Blank(j) => {
                args.extend(strings(&["-f", "lavfi", "-i"]));
                args.push(filters::blank_video_source(j.width, j.height, j.encoding.fps, j.duration));
                args.extend(strings(&["-f", "lavfi", "-i"]));
                args.push(filters::silence_source(rate, j.duration));
                args.push("-shortest".to_string());
                args.extend(self.video_codec_args(&j.encoding));
                args.extend(Self::audio_codec_args());
            }
            BackendJob::Segment(j) => {
                args.push("-ss".to_string());
                args.push(format_number(j.seek));
                args.push("-t".to_string());
                args.push(format_number(j.source_duration));
                args.push("-i".to_string());
                args.push(path_arg(&j.input));
                if !j.has_audio {
                    args.extend(strings(&["-f", "lavfi", "-i"]));
                    args.push(filters::silence_source(rate, j.output_duration));
                }
                let vf = filters::segment_video_filters(j);
                if !vf.is_empty() {
                    args.push("-vf".to_string());
                    args.push(vf.join(","));
                }
                let af = filters::segment_audio_filters(j);
                if !af.is_empty() {
                    args.push("-af".to_string());
                    args.push(af.join(","));
                }
                let audio_map = if j.has_audio { "0:a?" } else { "1:a" };
                args.extend(strings(&["-map", "0:v", "-map", audio_map]));
                args.extend(self.video_codec_args(&j.encoding));
                args.extend(Self::audio_codec_args());
            }
            BackendJob::Transition(j) => {
                args.push("-i".to_string());
                args.push(path_arg(&j.first));
                args.push("-i".to_string());
                args.push(path_arg(&j.second));
                args.push("-filter_complex".to_string());
                args.push(filters::transition_graph(j.style, j.duration, j.offset));
                args.extend(strings(&["-map", "[v]", "-map", "[a]"]));
                args.extend(self.video_codec_args(&j.encoding));
                args.extend(Self::audio_codec_args());
            }
            BackendJob::Concat(j) => {
                args.extend(concat_input_args(j));
                args.extend(strings(&["-c", "copy"]));
            }
            BackendJob::Overlay(j) => {
                args.push("-i".to_string());
                args.push(path_arg(&j.base));
                if filters::overlay_needs_loop(j) {
                    // the looped still only has to cover the overlay window
                    args.extend(strings(&["-loop", "1", "-t"]));
                    args.push(format_number((j.end - j.start).max(0.0)));
                }
                args.push("-i".to_string());
                let (OverlaySource::Video(source) | OverlaySource::Image(source)) = &j.source;
                args.push(path_arg(source));
                args.push("-filter_complex".to_string());
                args.push(filters::overlay_graph(j));
                args.extend(strings(&["-map", "[v]", "-map", "0:a?"]));
                args.extend(self.video_codec_args(&j.encoding));
                args.extend(Self::audio_codec_args());
            }
            BackendJob::Text(j) => {
                args.push("-i".to_string());
                args.push(path_arg(&j.base));
                args.push("-vf".to_string());
                args.push(filters::drawtext_filter(j));
                args.extend(strings(&["-map", "0:v", "-map", "0:a?"]));
                args.extend(self.video_codec_args(&j.encoding));
                args.extend(Self::audio_codec_args());
            }
            BackendJob::AudioTrim(j) => {
                args.push("-ss".to_string());
                args.push(format_number(j.start.max(0.0)));
                args.push("-t".to_string());
                args.push(format_number(j.duration));
                args.push("-i".to_string());
                args.push(path_arg(&j.input));
                args.push("-vn".to_string());
                let af = filters::audio_trim_filters(j);
                if !af.is_empty() {
                    args.push("-af".to_string());
                    args.push(af.join(","));
                }
                args.extend(strings(&["-c:a", "aac"]));
            }
            BackendJob::AudioMix(j) => {
                args.push("-i".to_string());
                args.push(path_arg(&j.base));
                args.push("-i".to_string());
                args.push(path_arg(&j.audio));
                args.push("-filter_complex".to_string());
                args.push(filters::audio_mix_graph(j));
                args.extend(strings(&["-map", "0:v", "-map", "[a]", "-c:v", "copy", "-c:a", "aac"]));
            }
        }
        args.push(path_arg(job.output()));
        args
    }

    /// Re-encoding concat, used when stream copy fails.
    pub fn concat_reencode_args(&self, job: &ConcatJob) -> Vec<String> {
        let mut args = strings(&["-y", "-hide_banner"]);
        args.extend(concat_input_args(job));
        args.extend(strings(&["-c:v", "libx264", "-preset"]));
        args.push(self.config.video_preset.clone());
        args.extend(strings(&["-pix_fmt", "yuv420p"]));
        args.extend(Self::audio_codec_args());
        args.push(path_arg(&job.output));
        args
    }

    fn run_concat(&self, job: &ConcatJob) -> MontageResult<()> {
        std::fs::write(&job.list_path, concat_list(&job.inputs)).map_err(|e| {
            MontageError::resource(format!(
                "Failed to write concat list {}: {e}",
                job.list_path.display()
            ))
        })?;

        let copy_args = self.build_args(&BackendJob::Concat(job.clone()));
        let result = match run_command(&self.config.ffmpeg, &copy_args, "concat") {
            Ok(_) => Ok(()),
            Err(err) if err.is_backend_failure() => {
                tracing::debug!(error = %err, "Stream-copy concat failed, re-encoding");
                run_command(&self.config.ffmpeg, &self.concat_reencode_args(job), "concat")
                    .map(|_| ())
            }
            Err(err) => Err(err),
        };
        if let Err(e) = std::fs::remove_file(&job.list_path) {
            tracing::debug!(path = %job.list_path.display(), error = %e, "Concat list not removed");
        }
        result
    }
}

impl MediaBackend for FfmpegBackend {
    fn run(&self, job: &BackendJob) -> MontageResult<()> {
        match job {
            BackendJob::Concat(concat) => self.run_concat(concat),
            _ => run_command(&self.config.ffmpeg, &self.build_args(job), job.operation()).map(|_| ()),
        }
    }

    fn is_available(&self) -> bool {
        command_exists(&self.config.ffmpeg) && command_exists(&self.config.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl MediaProbe for FfmpegBackend {
    fn probe(&self, path: &Path) -> MontageResult<MediaInfo> {
        let mut args = strings(&[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        args.push(path_arg(path));
        let stdout = run_command(&self.config.ffprobe, &args, "probe")
            .map_err(|e| MontageError::probe(path, e.to_string()))?;
        let info = parse_probe_output(&stdout)
            .map_err(|e| MontageError::probe(path, format!("Unreadable ffprobe output: {e}")))?;
        tracing::debug!(
            path = %path.display(),
            duration = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            has_audio = info.has_audio,
            "Probed media"
        );
        Ok(info)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn concat_input_args(job: &ConcatJob) -> Vec<String> {
    let mut args = strings(&["-f", "concat", "-safe", "0", "-i"]);
    args.push(path_arg(&job.list_path));
    args
}

/// Concat demuxer list with absolute, quoted paths.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let absolute = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            let escaped = absolute
                .to_string_lossy()
                .replace('\\', "/")
                .replace('\'', "'\\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

/// Run `binary` with `args`. Returns stdout on success; a non-zero exit maps
/// to a backend failure carrying the (truncated) stderr.
fn run_command(binary: &str, args: &[String], operation: &str) -> MontageResult<String> {
    tracing::debug!(binary, operation, args = ?args, "Running command");
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MontageError::unavailable(format!("{binary} is not installed"))
            } else {
                MontageError::backend(operation, format!("Failed to start {binary}: {e}"))
            }
        })?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MontageError::backend(operation, "Failed to capture stderr"))?;
    // Drain stderr concurrently so a chatty command cannot block on a full pipe.
    let stderr_task = std::thread::spawn(move || -> String {
        let mut output = String::new();
        match BufReader::new(stderr).read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read stderr: {err}>"),
        }
    });

    let mut stdout = String::new();
    if let Some(out) = child.stdout.take() {
        BufReader::new(out)
            .read_to_string(&mut stdout)
            .map_err(|e| MontageError::backend(operation, format!("Failed reading output: {e}")))?;
    }

    let status = child
        .wait()
        .map_err(|e| MontageError::backend(operation, format!("Failed to wait on {binary}: {e}")))?;
    let stderr_output = stderr_task
        .join()
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    if !status.success() {
        tracing::warn!(binary, operation, %status, "Command failed");
        return Err(MontageError::backend(operation, stderr_output));
    }
    tracing::info!(binary, operation, "Command finished");
    Ok(stdout)
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AudioMixJob, BlankJob, ColorAdjust, Fades, OverlayJob, SegmentJob,
    };
    use crate::filters::BlendMode;
    use montage_project_model::{FitMode, KeyframeTrack};

    fn backend() -> FfmpegBackend {
        FfmpegBackend::default()
    }

    fn encoding(bitrate: Option<&str>) -> Encoding {
        Encoding {
            fps: 30.0,
            bitrate: bitrate.map(str::to_string),
        }
    }

    fn window(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    }

    #[test]
    fn test_blank_args() {
        let job = BackendJob::Blank(BlankJob {
            width: 1080,
            height: 1920,
            duration: 1.5,
            encoding: encoding(Some("4M")),
            output: PathBuf::from("/tmp/w/gap.mp4"),
        });
        let args = backend().build_args(&job);
        assert!(args.contains(&"color=c=black:s=1080x1920:r=30:d=1.5".to_string()));
        assert!(args.iter().any(|a| a.starts_with("anullsrc=") && a.ends_with(":d=1.5")));
        assert_eq!(window(&args, "-b:v").as_deref(), Some("4M"));
        assert_eq!(window(&args, "-preset").as_deref(), Some("fast"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/w/gap.mp4"));
    }

    fn segment(has_audio: bool) -> SegmentJob {
        SegmentJob {
            input: PathBuf::from("in.mp4"),
            seek: 2.0,
            source_duration: 4.0,
            output_duration: 2.0,
            has_audio,
            crop: None,
            fit: FitMode::Fit,
            width: 1920,
            height: 1080,
            rotation: 0.0,
            color: ColorAdjust {
                brightness: 0.0,
                contrast: 1.0,
                saturation: 1.0,
                gamma: 1.0,
            },
            hue: 0.0,
            blur: 0.0,
            opacity: 1.0,
            speed: 2.0,
            volume: 1.0,
            fades: Fades::default(),
            encoding: encoding(None),
            output: PathBuf::from("seg.mp4"),
        }
    }

    #[test]
    fn test_segment_args_with_audio() {
        let args = backend().build_args(&BackendJob::Segment(segment(true)));
        assert_eq!(window(&args, "-ss").as_deref(), Some("2"));
        assert_eq!(window(&args, "-t").as_deref(), Some("4"));
        assert_eq!(window(&args, "-af").as_deref(), Some("atempo=2.000"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
        assert!(!args.contains(&"-b:v".to_string()));
    }

    #[test]
    fn test_segment_args_synthesize_silence() {
        let args = backend().build_args(&BackendJob::Segment(segment(false)));
        assert!(args
            .iter()
            .any(|a| a == "anullsrc=channel_layout=stereo:sample_rate=44100:d=2"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a"));
        assert!(!args.contains(&"-af".to_string()));
    }

    #[test]
    fn test_overlay_image_loops_for_window() {
        let job = BackendJob::Overlay(OverlayJob {
            base: PathBuf::from("base.mp4"),
            source: OverlaySource::Image(PathBuf::from("logo.png")),
            start: 1.0,
            end: 3.5,
            x: KeyframeTrack::constant(10.0),
            y: KeyframeTrack::constant(20.0),
            width: 100,
            height: 50,
            opacity: KeyframeTrack::constant(1.0),
            fit: FitMode::Stretch,
            rotation: 0.0,
            blend: BlendMode::Normal,
            canvas_width: 1920,
            canvas_height: 1080,
            encoding: encoding(None),
            output: PathBuf::from("ov.mp4"),
        });
        let args = backend().build_args(&job);
        let loop_at = args.iter().position(|a| a == "-loop").unwrap();
        assert_eq!(&args[loop_at..loop_at + 4], &["-loop", "1", "-t", "2.5"]);
        assert_eq!(args[loop_at + 5], "logo.png");
    }

    #[test]
    fn test_mix_copies_video() {
        let job = BackendJob::AudioMix(AudioMixJob {
            base: PathBuf::from("base.mp4"),
            audio: PathBuf::from("a.m4a"),
            at: 1.0,
            volume: 1.0,
            base_has_audio: true,
            max_duration: 5.0,
            output: PathBuf::from("mix.mp4"),
        });
        let args = backend().build_args(&job);
        assert_eq!(window(&args, "-c:v").as_deref(), Some("copy"));
        assert!(window(&args, "-filter_complex").unwrap().contains("adelay=1000"));
    }

    #[test]
    fn test_concat_forms() {
        let job = ConcatJob {
            inputs: vec![PathBuf::from("/w/a.mp4"), PathBuf::from("/w/b.mp4")],
            list_path: PathBuf::from("/w/list.txt"),
            output: PathBuf::from("/w/out.mp4"),
        };
        let copy = backend().build_args(&BackendJob::Concat(job.clone()));
        assert_eq!(window(&copy, "-c").as_deref(), Some("copy"));
        assert_eq!(window(&copy, "-i").as_deref(), Some("/w/list.txt"));

        let reencode = backend().concat_reencode_args(&job);
        assert_eq!(window(&reencode, "-c:v").as_deref(), Some("libx264"));
        assert!(!reencode.contains(&"copy".to_string()));
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[PathBuf::from("/w/a.mp4"), PathBuf::from("/w/it's.mp4")]);
        assert_eq!(list, "file '/w/a.mp4'\nfile '/w/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let err = run_command("montage-no-such-binary", &[], "probe").unwrap_err();
        assert!(matches!(err, MontageError::BackendUnavailable { .. }));
    }
}
