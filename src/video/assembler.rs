// NEWSREEL Video Assembler
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Three independent encoder passes. Each writes a new file next to the
// others in the videos directory and never touches its inputs:
//   mux             frames + speech  -> video_<id>.mp4
//   burn_subtitles  video + srt      -> subtitled_<input name>
//   sound effects   video + stings   -> withsfx_<input name>

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{NewsreelError, Result};
use crate::models::FrameSequence;
use crate::video::encoder::{safe_arg_path, Encoder, EncoderStage};
use crate::video::sound_effects::{build_mix_graph, Sting};
use crate::video::subtitles::SubtitleStyle;

const AUDIO_BITRATE: &str = "192k";

pub struct VideoAssembler {
    encoder: Arc<dyn Encoder>,
    videos_dir: PathBuf,
    width: u32,
    height: u32,
    crf: u8,
}

impl VideoAssembler {
    pub fn new(encoder: Arc<dyn Encoder>, videos_dir: PathBuf, width: u32, height: u32, crf: u8) -> Self {
        Self {
            encoder,
            videos_dir,
            width,
            height,
            crf,
        }
    }

    pub fn from_config(encoder: Arc<dyn Encoder>, config: &PipelineConfig) -> Self {
        Self::new(
            encoder,
            config.videos_dir(),
            config.width,
            config.height,
            config.quality.crf(),
        )
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub async fn mux(&self, frames: &FrameSequence, audio: &Path, video_id: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.videos_dir)?;
        let output = self.videos_dir.join(format!("video_{}.mp4", video_id));
        info!(
            "[ASSEMBLER] 🎬 Muxing {} frames with {:?} -> {:?}",
            frames.frame_count, audio, output
        );

        let args = mux_args(frames, audio, &output, self.width, self.height, self.crf);
        self.encoder.run(EncoderStage::Mux, args).await?;
        ensure_written(EncoderStage::Mux, &output)?;
        Ok(output)
    }

    pub async fn burn_subtitles(&self, input: &Path, srt: &Path, style: SubtitleStyle) -> Result<PathBuf> {
        let output = derived_output(&self.videos_dir, "subtitled_", input)?;
        info!("[ASSEMBLER] Burning {:?} subtitles into {:?}", style, output);

        let args = subtitle_args(input, srt, style, &output, self.crf);
        self.encoder.run(EncoderStage::Subtitles, args).await?;
        ensure_written(EncoderStage::Subtitles, &output)?;
        Ok(output)
    }

    /// With no stings the input path is returned unchanged.
    pub async fn mix_sound_effects(&self, input: &Path, stings: &[Sting]) -> Result<PathBuf> {
        if stings.is_empty() {
            info!("[ASSEMBLER] No stings available, skipping sound-effect pass");
            return Ok(input.to_path_buf());
        }
        let output = derived_output(&self.videos_dir, "withsfx_", input)?;
        info!("[ASSEMBLER] 🔊 Mixing {} stings into {:?}", stings.len(), output);

        let args = sound_effect_args(input, stings, &output);
        self.encoder.run(EncoderStage::SoundEffects, args).await?;
        ensure_written(EncoderStage::SoundEffects, &output)?;
        Ok(output)
    }
}

fn ensure_written(stage: EncoderStage, output: &Path) -> Result<()> {
    if output.is_file() {
        Ok(())
    } else {
        Err(NewsreelError::Encoder {
            stage,
            status: "no output".to_string(),
            message: format!("encoder reported success but {:?} is missing", output),
        })
    }
}

/// `<dir>/<prefix><input file name>`
pub fn derived_output(dir: &Path, prefix: &str, input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .ok_or_else(|| NewsreelError::InvalidInput(format!("{:?} has no file name", input)))?;
    let mut file = OsString::from(prefix);
    file.push(name);
    Ok(dir.join(file))
}

/// Scale into the frame preserving aspect, pad the rest, square pixels.
pub fn fit_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = width,
        h = height
    )
}

/// Path escaping for filter arguments (`subtitles=filename='...'`).
///
/// ffmpeg unescapes twice: the graph parser strips the quotes, then the
/// option parser sees the result. A quote cannot appear inside quotes, so an
/// apostrophe closes the quote, emits `\\\'` and reopens it.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', r"'\\\''")
}

fn arg(s: &str) -> OsString {
    OsString::from(s)
}

fn path_arg(p: &Path) -> OsString {
    safe_arg_path(p).into_os_string()
}

pub fn mux_args(frames: &FrameSequence, audio: &Path, output: &Path, width: u32, height: u32, crf: u8) -> Vec<OsString> {
    vec![
        arg("-y"),
        arg("-framerate"),
        OsString::from(frames.frame_rate.to_string()),
        arg("-i"),
        path_arg(&frames.input_pattern()),
        arg("-i"),
        path_arg(audio),
        arg("-vf"),
        OsString::from(fit_filter(width, height)),
        arg("-c:v"),
        arg("libx264"),
        arg("-preset"),
        arg("medium"),
        arg("-crf"),
        OsString::from(crf.to_string()),
        arg("-pix_fmt"),
        arg("yuv420p"),
        arg("-c:a"),
        arg("aac"),
        arg("-b:a"),
        arg(AUDIO_BITRATE),
        arg("-shortest"),
        arg("-movflags"),
        arg("+faststart"),
        path_arg(output),
    ]
}

pub fn subtitle_args(input: &Path, srt: &Path, style: SubtitleStyle, output: &Path, crf: u8) -> Vec<OsString> {
    let filter = format!(
        "subtitles=filename='{}':force_style='{}'",
        escape_filter_path(srt),
        style.force_style()
    );
    vec![
        arg("-y"),
        arg("-i"),
        path_arg(input),
        arg("-vf"),
        OsString::from(filter),
        arg("-c:v"),
        arg("libx264"),
        arg("-crf"),
        OsString::from(crf.to_string()),
        arg("-pix_fmt"),
        arg("yuv420p"),
        arg("-c:a"),
        arg("copy"),
        arg("-movflags"),
        arg("+faststart"),
        path_arg(output),
    ]
}

pub fn sound_effect_args(input: &Path, stings: &[Sting], output: &Path) -> Vec<OsString> {
    let mut args = vec![arg("-y"), arg("-i"), path_arg(input)];
    for sting in stings {
        args.push(arg("-i"));
        args.push(path_arg(&sting.path));
    }
    args.extend([
        arg("-filter_complex"),
        OsString::from(build_mix_graph(stings)),
        arg("-map"),
        arg("0:v"),
        arg("-map"),
        arg("[aout]"),
        arg("-c:v"),
        arg("copy"),
        arg("-c:a"),
        arg("aac"),
        arg("-b:a"),
        arg(AUDIO_BITRATE),
        arg("-movflags"),
        arg("+faststart"),
        path_arg(output),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::sound_effects::StingKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records invocations and writes the last argument as the output file.
    #[derive(Default)]
    struct RecordingEncoder {
        calls: Mutex<Vec<(EncoderStage, Vec<OsString>)>>,
    }

    #[async_trait]
    impl Encoder for RecordingEncoder {
        async fn run(&self, stage: EncoderStage, args: Vec<OsString>) -> Result<()> {
            if let Some(out) = args.last() {
                fs::write(out, b"mp4")?;
            }
            self.calls.lock().unwrap().push((stage, args));
            Ok(())
        }

        async fn probe_duration(&self, _path: &Path) -> Result<f64> {
            Ok(1.0)
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    fn sequence(dir: &Path) -> FrameSequence {
        FrameSequence {
            directory: dir.to_path_buf(),
            frames: vec![],
            frame_count: 10,
            frame_rate: 30,
            is_short_format: true,
        }
    }

    #[test]
    fn test_mux_args() {
        let args = strings(&mux_args(
            &sequence(Path::new("/tmp/seq_1")),
            Path::new("/tmp/speech.mp3"),
            Path::new("/tmp/out.mp4"),
            1080,
            1920,
            23,
        ));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -framerate 30 -i /tmp/seq_1/frame_%05d.png -i /tmp/speech.mp3"));
        assert!(joined.contains(
            "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2,setsar=1"
        ));
        assert!(joined.contains("-crf 23 -pix_fmt yuv420p -c:a aac"));
        assert!(joined.contains("-shortest -movflags +faststart"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    /// Quote and backslash rules shared by ffmpeg's graph and option parsers.
    fn ffmpeg_unquote(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }

    #[test]
    fn test_apostrophe_path_survives_both_unescape_passes() {
        for raw in ["/srv/anchor's desk/subs_1.srt", "/srv/a:b/it's 'quoted'.srt"] {
            let quoted = format!("'{}'", escape_filter_path(Path::new(raw)));
            assert_eq!(ffmpeg_unquote(&ffmpeg_unquote(&quoted)), raw);
        }
    }

    #[test]
    fn test_subtitle_filter_escapes_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\subs\\it's.srt")), r"C\:/subs/it'\\\''s.srt");
        let args = strings(&subtitle_args(
            Path::new("in.mp4"),
            Path::new("/s/subs_1.srt"),
            SubtitleStyle::Compact,
            Path::new("out.mp4"),
            18,
        ));
        let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert!(vf.starts_with("subtitles=filename='/s/subs_1.srt':force_style='"));
        assert!(vf.contains("FontSize=13"));
    }

    #[test]
    fn test_derived_output_names() {
        let out = derived_output(Path::new("/v"), "withsfx_", Path::new("/v/subtitled_video_7.mp4")).unwrap();
        assert_eq!(out, PathBuf::from("/v/withsfx_subtitled_video_7.mp4"));
        assert!(derived_output(Path::new("/v"), "x_", Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn test_zero_stings_skip_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(RecordingEncoder::default());
        let assembler = VideoAssembler::new(encoder.clone(), dir.path().to_path_buf(), 180, 320, 23);

        let input = dir.path().join("subtitled_video_1.mp4");
        let out = assembler.mix_sound_effects(&input, &[]).await.unwrap();
        assert_eq!(out, input);
        assert!(encoder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_passes_chain_output_names() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(RecordingEncoder::default());
        let assembler = VideoAssembler::new(encoder.clone(), dir.path().join("videos"), 180, 320, 23);

        let muxed = assembler
            .mux(&sequence(&dir.path().join("seq")), Path::new("speech.wav"), "42")
            .await
            .unwrap();
        assert_eq!(muxed.file_name().unwrap(), "video_42.mp4");

        let subbed = assembler
            .burn_subtitles(&muxed, Path::new("subs.srt"), SubtitleStyle::Default)
            .await
            .unwrap();
        assert_eq!(subbed.file_name().unwrap(), "subtitled_video_42.mp4");

        let sting = Sting {
            kind: StingKind::Intro,
            path: PathBuf::from("intro.wav"),
            offset_secs: 0.0,
            volume: 0.5,
        };
        let mixed = assembler.mix_sound_effects(&subbed, &[sting]).await.unwrap();
        assert_eq!(mixed.file_name().unwrap(), "withsfx_subtitled_video_42.mp4");
        assert!(muxed.exists() && subbed.exists());

        let calls = encoder.calls.lock().unwrap();
        let stages: Vec<EncoderStage> = calls.iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![EncoderStage::Mux, EncoderStage::Subtitles, EncoderStage::SoundEffects]);
        let sfx = strings(&calls[2].1);
        assert!(sfx.contains(&"[aout]".to_string()));
        assert!(sfx.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
    }
}
