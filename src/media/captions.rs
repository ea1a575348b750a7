//! srv3 timed-text captions to SubRip

use crate::error::GrabError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

/// One caption cue, times in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl Cue {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug, Default)]
struct OpenCue {
    start: f64,
    duration: f64,
    own_text: String,
    spans: Vec<String>,
    has_children: bool,
}

/// Walks the direct `p` children of the first `body` element.
/// Levels count open elements above a node: the root sits at level 0.
#[derive(Debug, Default)]
struct CueCollector {
    body: Option<usize>,
    body_done: bool,
    cue: Option<OpenCue>,
    span: Option<String>,
    cues: Vec<Cue>,
}

impl CueCollector {
    fn open(&mut self, element: &BytesStart<'_>, level: usize) -> Result<(), GrabError> {
        let name = element.name();
        let name = name.as_ref();

        let Some(body) = self.body else {
            if name == b"body" && !self.body_done {
                self.body = Some(level);
            }
            return Ok(());
        };

        if level == body + 1 && name == b"p" {
            let start = attr_seconds(element, "t")?
                .ok_or_else(|| GrabError::Scrape("caption cue without a start time".to_string()))?;
            let duration = attr_seconds(element, "d")?.unwrap_or(0.0);
            self.cue = Some(OpenCue {
                start,
                duration,
                ..OpenCue::default()
            });
        } else if level == body + 2 {
            if let Some(cue) = self.cue.as_mut() {
                cue.has_children = true;
                if name == b"s" {
                    self.span = Some(String::new());
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], level: usize) {
        let Some(body) = self.body else {
            return;
        };

        if level == body && name == b"body" {
            self.body = None;
            self.body_done = true;
        } else if level == body + 1 && name == b"p" {
            if let Some(cue) = self.cue.take() {
                self.cues.push(finish_cue(cue));
            }
        } else if level == body + 2 && name == b"s" {
            if let (Some(span), Some(cue)) = (self.span.take(), self.cue.as_mut()) {
                cue.spans.push(span);
            }
        }
    }

    /// `depth` is the number of currently open elements
    fn text(&mut self, text: &str, depth: usize) {
        let Some(body) = self.body else {
            return;
        };
        let parent = depth.saturating_sub(1);

        if parent == body + 1 {
            if let Some(cue) = self.cue.as_mut() {
                cue.own_text.push_str(text);
            }
        } else if parent == body + 2 {
            if let Some(span) = self.span.as_mut() {
                span.push_str(text);
            }
        }
    }
}

fn attr_seconds(element: &BytesStart<'_>, name: &str) -> Result<Option<f64>, GrabError> {
    let Some(attr) = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    else {
        return Ok(None);
    };
    let value = attr.unescape_value()?;
    let millis: f64 = value
        .trim()
        .parse()
        .map_err(|_| GrabError::Scrape(format!("bad caption time {:?}", value)))?;
    Ok(Some(millis / 1000.0))
}

fn finish_cue(cue: OpenCue) -> Cue {
    let raw = if cue.has_children {
        cue.spans.join(" ")
    } else {
        cue.own_text
    };
    let text = raw.replace('\n', " ").replace("  ", " ");
    Cue {
        start: cue.start,
        duration: cue.duration,
        text: unescape_entities(text),
    }
}

/// Captions frequently arrive double-escaped; undo the second layer when it parses
fn unescape_entities(text: String) -> String {
    match quick_xml::escape::unescape(&text) {
        Ok(Cow::Owned(unescaped)) => unescaped,
        _ => text,
    }
}

/// Parse the cues of an srv3 document
pub fn parse_cues(xml: &str) -> Result<Vec<Cue>, GrabError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut collector = CueCollector::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                collector.open(&e, depth)?;
                depth += 1;
            }
            Event::Empty(e) => {
                collector.open(&e, depth)?;
                collector.close(e.name().as_ref(), depth);
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                collector.close(e.name().as_ref(), depth);
            }
            Event::Text(t) => collector.text(&t.unescape()?, depth),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collector.cues)
}

/// `HH:MM:SS,mmm`
pub fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_ms / 3_600_000,
        (total_ms / 60_000) % 60,
        (total_ms / 1000) % 60,
        total_ms % 1000
    )
}

/// Convert an srv3 caption track to SubRip text
pub fn xml_to_srt(xml: &str) -> Result<String, GrabError> {
    let blocks: Vec<String> = parse_cues(xml)?
        .iter()
        .enumerate()
        .map(|(i, cue)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_timestamp(cue.start),
                srt_timestamp(cue.end()),
                cue.text
            )
        })
        .collect();

    Ok(blocks.join("\n").trim().to_string())
}
