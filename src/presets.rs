//! Named target sizes for the resizer.

use crate::imaging::Dimensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub category: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Preset {
    /// Lowercase name with every run of non-alphanumerics replaced by `-`:
    /// `"Twitter/X Post"` → `"twitter-x-post"`.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for ch in self.name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from_positive(self.width, self.height)
    }
}

const SOCIAL: &str = "Social Media";
const WEB: &str = "Web";
const RATIOS: &str = "Standard Ratios";

const fn preset(name: &'static str, category: &'static str, width: u32, height: u32) -> Preset {
    Preset {
        name,
        category,
        width,
        height,
    }
}

pub const PRESETS: &[Preset] = &[
    preset("Instagram Post", SOCIAL, 1080, 1080),
    preset("Instagram Story", SOCIAL, 1080, 1920),
    preset("Facebook Post", SOCIAL, 1200, 630),
    preset("Facebook Cover", SOCIAL, 851, 315),
    preset("Twitter/X Post", SOCIAL, 1600, 900),
    preset("LinkedIn Post", SOCIAL, 1200, 627),
    preset("Website Banner", WEB, 1920, 1080),
    preset("Website Hero", WEB, 1920, 600),
    preset("4:3", RATIOS, 1024, 768),
    preset("16:9", RATIOS, 1920, 1080),
    preset("3:2", RATIOS, 1080, 720),
];

/// Find a preset by name (case-insensitive) or slug.
pub fn find(query: &str) -> Option<&'static Preset> {
    let query = query.trim();
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(query) || p.slug() == query.to_ascii_lowercase())
}

/// Presets grouped by category, categories in first-seen order.
pub fn by_category() -> Vec<(&'static str, Vec<&'static Preset>)> {
    let mut groups: Vec<(&'static str, Vec<&'static Preset>)> = Vec::new();
    for preset in PRESETS {
        match groups.iter_mut().find(|(category, _)| *category == preset.category) {
            Some((_, members)) => members.push(preset),
            None => groups.push((preset.category, vec![preset])),
        }
    }
    groups
}
