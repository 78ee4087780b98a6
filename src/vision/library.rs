//! The reference library: every labeled template, loaded once at startup.

use super::template::Template;
use crate::bot::state::BotState;
use crate::error::{BotError, BotResult};
use std::path::Path;

/// States the bot cannot operate without; an empty candidate set for any of
/// these makes the load fatal rather than a warning.
const REQUIRED_STATES: [BotState; 2] = [BotState::MainMenu, BotState::MapView];

/// Indexed, immutable collection of templates. Safe to share by reference
/// across parallel matching because nothing here mutates after load.
#[derive(Debug)]
pub struct ReferenceLibrary {
    templates: Vec<Template>,
}

impl ReferenceLibrary {
    /// Load every `*.png` in `dir`. Malformed entries are skipped with a
    /// warning; a missing directory, an empty result, or a required state
    /// with no templates fails with `AssetLoad`.
    pub fn load(dir: &Path) -> BotResult<Self> {
        let asset_load = |reason: String| BotError::AssetLoad {
            path: dir.to_path_buf(),
            reason,
        };

        let entries = std::fs::read_dir(dir)
            .map_err(|e| asset_load(format!("cannot read directory: {e}")))?;

        let mut templates = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if !is_png || !path.is_file() {
                continue;
            }
            match Template::from_file(&path) {
                Ok(template) => templates.push(template),
                Err(e) => {
                    log::warn!("⚠️ skipping template {:?}: {}", path.file_name(), e);
                }
            }
        }

        if templates.is_empty() {
            return Err(asset_load("no usable template images found".into()));
        }

        // Deterministic candidate order, independent of directory listing.
        templates.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.path.cmp(&b.path)));

        let library = Self { templates };
        for state in REQUIRED_STATES {
            if library.candidates(state).is_empty() {
                return Err(asset_load(format!(
                    "no templates tagged for required state '{}'",
                    state.tag()
                )));
            }
        }

        log::info!("📚 loaded {} templates from {:?}", library.len(), dir);
        Ok(library)
    }

    /// Templates plausible for `state`, in deterministic label order. The
    /// full set when the tracker is lost.
    pub fn candidates(&self, state: BotState) -> Vec<&Template> {
        self.templates
            .iter()
            .filter(|t| t.plausible_in(state))
            .collect()
    }

    pub fn get(&self, label: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.label == label)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
