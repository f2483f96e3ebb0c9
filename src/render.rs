use std::io::Write;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::clock::ClockTime;

pub const DEFAULT_OUTPUT_FORMAT: &str = "%02d:%02d:%02d";
const FIELD_COUNT: usize = 3;
const MAX_FIELD_WIDTH: usize = 64;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormatError {
    #[error("format must contain exactly 3 integer conversions, found {found}")]
    FieldCount { found: usize },
    #[error("unsupported conversion '%{conversion}' (only %d, %i and %% are allowed)")]
    UnsupportedConversion { conversion: char },
    #[error("format ends inside a conversion specification")]
    Truncated,
    #[error("field width exceeds the maximum of 64")]
    WidthTooLarge,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Field(FieldSpec),
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
struct FieldSpec {
    left_align: bool,
    zero_pad: bool,
    force_sign: bool,
    space_sign: bool,
    width: usize,
}

impl FieldSpec {
    fn write(&self, out: &mut String, value: i64) {
        let sign = if value < 0 {
            "-"
        } else if self.force_sign {
            "+"
        } else if self.space_sign {
            " "
        } else {
            ""
        };
        let digits = value.unsigned_abs().to_string();
        let padding = self.width.saturating_sub(sign.len() + digits.len());

        if self.left_align {
            out.push_str(sign);
            out.push_str(&digits);
            out.extend(std::iter::repeat_n(' ', padding));
        } else if self.zero_pad {
            out.push_str(sign);
            out.extend(std::iter::repeat_n('0', padding));
            out.push_str(&digits);
        } else {
            out.extend(std::iter::repeat_n(' ', padding));
            out.push_str(sign);
            out.push_str(&digits);
        }
    }
}

/// A printf-style template taking hours, minutes and seconds, in that order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputFormat {
    segments: Vec<Segment>,
}

impl OutputFormat {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut fields = 0;
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                literal.push(ch);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }

            let mut spec = FieldSpec::default();
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => spec.left_align = true,
                    '0' => spec.zero_pad = true,
                    '+' => spec.force_sign = true,
                    ' ' => spec.space_sign = true,
                    _ => break,
                }
                chars.next();
            }
            while let Some(digit) = chars.peek().and_then(|ch| ch.to_digit(10)) {
                spec.width = spec.width * 10 + digit as usize;
                if spec.width > MAX_FIELD_WIDTH {
                    return Err(FormatError::WidthTooLarge);
                }
                chars.next();
            }
            match chars.next() {
                Some('d' | 'i') => {}
                Some(conversion) => return Err(FormatError::UnsupportedConversion { conversion }),
                None => return Err(FormatError::Truncated),
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(spec));
            fields += 1;
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if fields != FIELD_COUNT {
            return Err(FormatError::FieldCount { found: fields });
        }
        Ok(Self { segments })
    }

    pub fn format(&self, time: &ClockTime) -> String {
        let values = [time.hours, time.minutes, time.seconds];
        let mut values = values.iter();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(spec) => {
                    if let Some(value) = values.next() {
                        spec.write(&mut out, *value);
                    }
                }
            }
        }
        out
    }
}

impl Default for OutputFormat {
    /// Same as parsing [`DEFAULT_OUTPUT_FORMAT`].
    fn default() -> Self {
        let two_digits = Segment::Field(FieldSpec {
            zero_pad: true,
            width: 2,
            ..FieldSpec::default()
        });
        let colon = Segment::Literal(":".to_string());
        Self {
            segments: vec![
                two_digits.clone(),
                colon.clone(),
                two_digits.clone(),
                colon,
                two_digits,
            ],
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayMode {
    /// Carriage return before every frame, no newline. For interactive terminals.
    Overwrite,
    /// One frame per line. For log files and pipes.
    Line,
}

struct Sink {
    name: String,
    writer: Box<dyn Write>,
    mode: DisplayMode,
    /// Width of the last overwrite frame, so a shorter frame can blank its tail.
    drawn_width: usize,
}

/// What the control loop wants drawn on a given tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub time: ClockTime,
    pub running: bool,
    pub lap_held: bool,
}

pub struct RenderSettings {
    pub format: OutputFormat,
    pub run_indicator: String,
    pub lap_indicator: String,
    pub label: Option<String>,
}

pub struct Renderer {
    settings: RenderSettings,
    sinks: Vec<Sink>,
    frames_written: u64,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            sinks: Vec::new(),
            frames_written: 0,
        }
    }

    pub fn add_sink(&mut self, name: impl Into<String>, writer: Box<dyn Write>, mode: DisplayMode) {
        self.sinks.push(Sink {
            name: name.into(),
            writer,
            mode,
            drawn_width: 0,
        });
    }

    pub fn format_frame(&self, frame: &Frame) -> String {
        let settings = &self.settings;
        let mut line = String::new();
        push_indicator(&mut line, &settings.run_indicator, frame.running);
        push_indicator(&mut line, &settings.lap_indicator, frame.lap_held);
        line.push_str(&settings.format.format(&frame.time));
        if let Some(label) = settings.label.as_deref() {
            line.push(' ');
            line.push_str(label);
        }
        line
    }

    pub fn render(&mut self, frame: &Frame) -> Result<()> {
        let line = self.format_frame(frame);
        let width = line.chars().count();
        for sink in &mut self.sinks {
            let written = match sink.mode {
                DisplayMode::Overwrite => {
                    let stale = sink.drawn_width.saturating_sub(width);
                    sink.drawn_width = width;
                    write!(sink.writer, "\r{line}{:stale$}", "")
                }
                DisplayMode::Line => writeln!(sink.writer, "{line}"),
            };
            written
                .and_then(|()| sink.writer.flush())
                .with_context(|| format!("failed to write timer to {}", sink.name))?;
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Moves overwrite-mode sinks past the last frame so later output starts on a fresh line.
    pub fn finish(&mut self) -> Result<()> {
        if self.frames_written == 0 {
            return Ok(());
        }
        for sink in &mut self.sinks {
            if sink.mode == DisplayMode::Overwrite {
                writeln!(sink.writer)
                    .and_then(|()| sink.writer.flush())
                    .with_context(|| format!("failed to write timer to {}", sink.name))?;
            }
        }
        Ok(())
    }
}

fn push_indicator(line: &mut String, indicator: &str, shown: bool) {
    if shown {
        line.push_str(indicator);
    } else {
        line.extend(std::iter::repeat_n(' ', indicator.chars().count()));
    }
}
