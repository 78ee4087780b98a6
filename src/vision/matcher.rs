//! Frame-against-library matching.
//!
//! Pure function over immutable inputs: a captured frame and a candidate
//! template set produce a deterministic, best-first match sequence. Nothing
//! here touches the device, which is what makes the classifier testable
//! without a display.

use super::template::{Region, Template};
use crate::bot::state::BotState;
use crate::config::MatchSettings;
use crate::device::types::Frame;
use image::imageops;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use serde::Serialize;

/// A scored, localized correspondence between a frame region and a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub label: String,
    /// States the matched template is tagged for; drives the tracker.
    pub states: Vec<BotState>,
    /// Bounding region in frame coordinates, at the matched scale.
    pub region: Region,
    /// Normalized correlation in [0, 1].
    pub confidence: f32,
    pub scale: f32,
}

impl Match {
    pub fn center(&self) -> (u32, u32) {
        self.region.center()
    }
}

/// Match every candidate against the frame and return the ordered sequence.
///
/// Per template only the single best region/scale pair is kept, and only when
/// it clears `settings.score_floor`. Ordering is by descending confidence;
/// scores within `tie_epsilon` of each other prefer the template tagged for
/// `current_state`, then the label, so the result never depends on candidate
/// iteration order.
pub fn find_matches(
    frame: &Frame,
    candidates: &[&Template],
    current_state: BotState,
    settings: &MatchSettings,
) -> Vec<Match> {
    let mut matches: Vec<Match> = candidates
        .iter()
        .filter_map(|template| best_for_template(frame, template, settings))
        .collect();

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    apply_state_tiebreak(&mut matches, current_state, settings.tie_epsilon);
    matches
}

/// Best region/scale pair for one template, if it clears the floor.
fn best_for_template(frame: &Frame, template: &Template, settings: &MatchSettings) -> Option<Match> {
    // Restrict the scan to the template's declared screen region when it has
    // one and it intersects the frame.
    let window = match template.search_region {
        Some(region) => region.clip_to(frame.width(), frame.height())?,
        None => Region {
            x: 0,
            y: 0,
            width: frame.width(),
            height: frame.height(),
        },
    };
    let haystack = if window.x == 0
        && window.y == 0
        && window.width == frame.width()
        && window.height == frame.height()
    {
        frame.gray.clone()
    } else {
        imageops::crop_imm(&frame.gray, window.x, window.y, window.width, window.height).to_image()
    };

    let mut best: Option<Match> = None;
    for &scale in &settings.scale_factors {
        let Some(scaled) = scale_template(&template.image, scale) else {
            continue;
        };
        if scaled.width() > haystack.width() || scaled.height() > haystack.height() {
            continue;
        }

        let scores = match_template(
            &haystack,
            &scaled,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );
        let Some((x, y, score)) = peak(&scores) else {
            continue;
        };

        if best.as_ref().is_none_or(|b| score > b.confidence) {
            best = Some(Match {
                label: template.label.clone(),
                states: template.states.clone(),
                region: Region {
                    x: window.x + x,
                    y: window.y + y,
                    width: scaled.width(),
                    height: scaled.height(),
                },
                confidence: score,
                scale,
            });
        }
    }

    best.filter(|m| m.confidence >= settings.score_floor)
}

fn scale_template(template: &GrayImage, scale: f32) -> Option<GrayImage> {
    if (scale - 1.0).abs() < 0.01 {
        return Some(template.clone());
    }
    let width = (template.width() as f32 * scale) as u32;
    let height = (template.height() as f32 * scale) as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(imageops::resize(
        template,
        width,
        height,
        imageops::FilterType::Lanczos3,
    ))
}

/// Position and value of the highest correlation score.
fn peak(scores: &ImageBuffer<Luma<f32>, Vec<f32>>) -> Option<(u32, u32, f32)> {
    let mut best: Option<(u32, u32, f32)> = None;
    for (x, y, pixel) in scores.enumerate_pixels() {
        let score = pixel[0];
        if score.is_finite() && best.is_none_or(|(_, _, b)| score > b) {
            best = Some((x, y, score));
        }
    }
    best
}

/// Stable bubble pass: within `epsilon`, an in-state template outranks an
/// out-of-state one. Bounded by the sequence length, so it terminates and is
/// deterministic for any input order.
fn apply_state_tiebreak(matches: &mut [Match], current_state: BotState, epsilon: f32) {
    let in_state =
        |m: &Match| current_state != BotState::Unknown && m.states.contains(&current_state);
    for _ in 0..matches.len() {
        let mut moved = false;
        for i in 1..matches.len() {
            let tied = (matches[i - 1].confidence - matches[i].confidence).abs() <= epsilon;
            if tied && in_state(&matches[i]) && !in_state(&matches[i - 1]) {
                matches.swap(i - 1, i);
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}
