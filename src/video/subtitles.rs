// NEWSREEL Subtitles
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL
//
// Commentary text -> timed SRT cues. Text is chunked at sentence ends, then
// clause breaks, then word boundaries, until every chunk fits the style's
// character budget. Chunk timings are rescaled so the cues plus the pauses
// between them cover the audio exactly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::Result;

pub const SECONDS_PER_WORD: f64 = 0.4;
pub const MIN_CHUNK_SECS: f64 = 1.2;
pub const MAX_CHUNK_SECS: f64 = 3.0;
pub const PAUSE_SECS: f64 = 0.15;
/// Longer videos switch to the compact style.
pub const COMPACT_AFTER_SECS: f64 = 45.0;

static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+(?:[.!?]+[\x22')\]]*|$)").unwrap());
static CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^,;:]+(?:[,;:]+|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleStyle {
    Default,
    ShortFormat,
    Compact,
}

impl SubtitleStyle {
    pub fn select(duration: f64, is_short_format: bool) -> Self {
        if is_short_format {
            Self::ShortFormat
        } else if duration > COMPACT_AFTER_SECS {
            Self::Compact
        } else {
            Self::Default
        }
    }

    /// Characters per cue.
    pub fn max_chars(&self) -> usize {
        match self {
            Self::Default => 42,
            Self::ShortFormat => 30,
            Self::Compact => 52,
        }
    }

    /// libass `force_style` override for the burn-in filter.
    pub fn force_style(&self) -> &'static str {
        match self {
            Self::Default => {
                "FontName=Arial,FontSize=16,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=2,Shadow=0,Alignment=2,MarginV=60"
            }
            Self::ShortFormat => {
                "FontName=Arial,FontSize=20,Bold=1,PrimaryColour=&H0000FFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=3,Shadow=0,Alignment=2,MarginV=90"
            }
            Self::Compact => {
                "FontName=Arial,FontSize=13,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=3,Outline=1,Shadow=0,Alignment=2,MarginV=40"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Splits text into display chunks of at most `budget` characters
/// (a single longer word stays whole).
pub fn chunk_text(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chunks = Vec::new();

    for sentence in SENTENCE.find_iter(&normalized) {
        let sentence = sentence.as_str().trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.chars().count() <= budget {
            chunks.push(sentence.to_string());
            continue;
        }

        // Pack clauses greedily, word-splitting any clause over budget
        let mut current = String::new();
        for clause in CLAUSE.find_iter(sentence) {
            let clause = clause.as_str().trim();
            if clause.is_empty() {
                continue;
            }
            if clause.chars().count() > budget {
                flush(&mut current, &mut chunks);
                chunks.extend(pack_words(clause, budget));
            } else if joined_len(&current, clause) <= budget {
                push_joined(&mut current, clause);
            } else {
                flush(&mut current, &mut chunks);
                current.push_str(clause);
            }
        }
        flush(&mut current, &mut chunks);
    }
    chunks
}

fn pack_words(text: &str, budget: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && joined_len(&current, word) > budget {
            flush(&mut current, &mut out);
        }
        push_joined(&mut current, word);
    }
    flush(&mut current, &mut out);
    out
}

fn joined_len(current: &str, next: &str) -> usize {
    if current.is_empty() {
        next.chars().count()
    } else {
        current.chars().count() + 1 + next.chars().count()
    }
}

fn push_joined(current: &mut String, next: &str) {
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(next);
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
}

fn raw_chunk_secs(chunk: &str) -> f64 {
    let words = chunk.split_whitespace().count() as f64;
    (words * SECONDS_PER_WORD).clamp(MIN_CHUNK_SECS, MAX_CHUNK_SECS)
}

/// Timed cues whose durations plus pauses sum to `duration`.
pub fn build_cues(text: &str, duration: f64, style: SubtitleStyle) -> Vec<SubtitleCue> {
    let chunks = chunk_text(text, style.max_chars());
    if chunks.is_empty() || !(duration > 0.0) {
        return Vec::new();
    }

    let raw: Vec<f64> = chunks.iter().map(|c| raw_chunk_secs(c)).collect();
    let pauses = PAUSE_SECS * (chunks.len() - 1) as f64;
    let scale = duration / (raw.iter().sum::<f64>() + pauses);
    let pause = PAUSE_SECS * scale;

    let last = chunks.len() - 1;
    let mut cursor = 0.0;
    chunks
        .into_iter()
        .zip(raw)
        .enumerate()
        .map(|(i, (text, secs))| {
            let start = cursor;
            let end = if i == last { duration } else { start + secs * scale };
            cursor = end + pause;
            SubtitleCue {
                index: i + 1,
                start,
                end,
                text,
            }
        })
        .collect()
}

/// `HH:MM:SS,mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}

pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.text
        ));
    }
    out
}

pub fn write_srt(cues: &[SubtitleCue], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_srt(cues))?;
    info!("[SUBS] Wrote {} cues to {:?}", cues.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMENTARY: &str = "Scientists confirm the moon is, in fact, still there. \
        Residents are deeply relieved; some had been worried since Tuesday. \
        Experts recommend looking up occasionally, just to be sure!";

    #[test]
    fn test_style_selection() {
        assert_eq!(SubtitleStyle::select(12.0, true), SubtitleStyle::ShortFormat);
        assert_eq!(SubtitleStyle::select(60.0, true), SubtitleStyle::ShortFormat);
        assert_eq!(SubtitleStyle::select(45.0, false), SubtitleStyle::Default);
        assert_eq!(SubtitleStyle::select(45.5, false), SubtitleStyle::Compact);
    }

    #[test]
    fn test_chunks_respect_budget() {
        for style in [SubtitleStyle::Default, SubtitleStyle::ShortFormat, SubtitleStyle::Compact] {
            let chunks = chunk_text(COMMENTARY, style.max_chars());
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(chunk.chars().count() <= style.max_chars(), "{:?} over budget: {}", style, chunk);
            }
            let rejoined = chunks.join(" ");
            assert_eq!(rejoined.split_whitespace().count(), COMMENTARY.split_whitespace().count());
        }
    }

    #[test]
    fn test_sentences_stay_whole_when_they_fit() {
        let chunks = chunk_text("Short one. Another short one!", 42);
        assert_eq!(chunks, vec!["Short one.", "Another short one!"]);
    }

    #[test]
    fn test_clause_then_word_splitting() {
        let chunks = chunk_text("alpha beta, gamma delta epsilon zeta eta theta", 12);
        assert_eq!(chunks[0], "alpha beta,");
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));

        let long_word = chunk_text("supercalifragilistic", 5);
        assert_eq!(long_word, vec!["supercalifragilistic"]);
    }

    #[test]
    fn test_durations_and_pauses_cover_audio() {
        for duration in [4.0, 14.2, 37.5, 90.0] {
            let style = SubtitleStyle::select(duration, duration <= 15.0);
            let cues = build_cues(COMMENTARY, duration, style);
            let spoken: f64 = cues.iter().map(|c| c.duration()).sum();
            let gaps: f64 = cues.windows(2).map(|w| w[1].start - w[0].end).sum();
            assert!((spoken + gaps - duration).abs() < 1e-9);
            assert_eq!(cues.last().unwrap().end, duration);
            assert_eq!(cues[0].start, 0.0);
            assert!(cues.windows(2).all(|w| w[1].start > w[0].end));
        }
    }

    #[test]
    fn test_empty_inputs_produce_no_cues() {
        assert!(build_cues("   ", 10.0, SubtitleStyle::Default).is_empty());
        assert!(build_cues("Hello there.", 0.0, SubtitleStyle::Default).is_empty());
    }

    #[test]
    fn test_srt_layout() {
        assert_eq!(format_timestamp(3723.4567), "01:02:03,457");
        assert_eq!(format_timestamp(0.0), "00:00:00,000");

        let cues = build_cues("One two three.", 2.5, SubtitleStyle::Default);
        assert_eq!(to_srt(&cues), "1\n00:00:00,000 --> 00:00:02,500\nOne two three.\n\n");
    }
}
