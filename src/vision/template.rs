//! Labeled reference images and the filename convention that tags them.
//!
//! A template file encodes its metadata in its name:
//!
//! ```text
//! <state>[+<state>...]-<label>[.region[x,y,w,h]].png
//! ```
//!
//! `encounter-throw_target.png` may appear in the Encounter screen;
//! `map_view+main_menu-close_button.png` in either of two screens;
//! `loading_spinner.png` (no state tag) anywhere. The optional `.region[...]`
//! suffix restricts matching to a sub-rectangle of the screen, which keeps
//! correlation scans cheap for elements with a fixed position.

use crate::bot::state::BotState;
use image::GrayImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateParseError {
    #[error("unknown state tag '{0}'")]
    UnknownStateTag(String),
    #[error("empty label")]
    EmptyLabel,
    #[error("malformed region suffix '{0}', expected region[x,y,w,h]")]
    BadRegion(String),
    #[error("not a loadable image: {0}")]
    Image(String),
}

/// Axis-aligned rectangle in screen/frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Intersect with a `width` x `height` screen; `None` when nothing is left.
    pub fn clip_to(self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clipped = Region {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        (clipped.width > 0 && clipped.height > 0).then_some(clipped)
    }
}

/// One immutable reference image plus the metadata parsed from its filename.
#[derive(Debug, Clone)]
pub struct Template {
    pub label: String,
    /// States where this element may appear; empty means anywhere.
    pub states: Vec<BotState>,
    /// Screen sub-rectangle to search, full frame when absent.
    pub search_region: Option<Region>,
    pub image: GrayImage,
    pub path: PathBuf,
}

impl Template {
    pub fn from_file(path: &Path) -> Result<Self, TemplateParseError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or(TemplateParseError::EmptyLabel)?;
        let (states, label, search_region) = parse_stem(stem)?;

        let image = image::open(path)
            .map_err(|e| TemplateParseError::Image(e.to_string()))?
            .to_luma8();

        Ok(Self {
            label,
            states,
            search_region,
            image,
            path: path.to_path_buf(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether this template may appear in the given state. Untagged
    /// templates are plausible everywhere, and everything is a candidate
    /// while the tracker is lost.
    pub fn plausible_in(&self, state: BotState) -> bool {
        state == BotState::Unknown || self.states.is_empty() || self.states.contains(&state)
    }
}

fn parse_stem(
    stem: &str,
) -> Result<(Vec<BotState>, String, Option<Region>), TemplateParseError> {
    // Split off the optional ".region[x,y,w,h]" suffix first.
    let (base, region) = match stem.find(".region[") {
        Some(idx) => {
            let suffix = &stem[idx + 1..];
            (&stem[..idx], Some(parse_region(suffix)?))
        }
        None => (stem, None),
    };

    let (states, label) = match base.split_once('-') {
        Some((tags, label)) => {
            let mut states = Vec::new();
            for tag in tags.split('+') {
                match BotState::from_tag(tag) {
                    Some(state) => states.push(state),
                    None => return Err(TemplateParseError::UnknownStateTag(tag.to_string())),
                }
            }
            (states, label)
        }
        None => (Vec::new(), base),
    };

    if label.is_empty() {
        return Err(TemplateParseError::EmptyLabel);
    }
    Ok((states, label.to_string(), region))
}

fn parse_region(suffix: &str) -> Result<Region, TemplateParseError> {
    let bad = || TemplateParseError::BadRegion(suffix.to_string());
    let inner = suffix
        .strip_prefix("region[")
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(bad)?;
    let parts: Vec<u32> = inner
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| bad())?;
    match parts[..] {
        [x, y, width, height] if width > 0 && height > 0 => Ok(Region {
            x,
            y,
            width,
            height,
        }),
        _ => Err(bad()),
    }
}
