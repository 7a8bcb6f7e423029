//! CLI output formatting for every tool.
//!
//! Output leads with *what was produced* (file name, size, dimensions) and
//! puts detail on indented lines underneath:
//!
//! ```text
//! Saved photo_resized.jpg
//!     960x540 JPEG, 84.21 KB
//! ```
//!
//! ## Bulk
//!
//! ```text
//! Processing 3 images
//!     001 a.webp (12.5 KB)
//!     003 c.webp (9.75 KB)
//!     002 b.png: FAILED unreadable image data: ...
//! Archive ImageForge_Bulk.zip (22.31 KB)
//!     2 of 3 images, 1 failed
//! ```
//!
//! Items are printed as they finish, so bulk lines may be out of index order;
//! the index prefix ties each line back to its input.
//!
//! # Architecture
//!
//! Each tool has a `format_*` function (returns `Vec<String>`) for testability
//! and is printed through [`print_lines`]. Format functions are pure: no I/O,
//! no side effects.

use crate::ai::DpiSuggestion;
use crate::batch::{BatchEvent, BatchOutcome};
use crate::context::Preferences;
use crate::imaging::{
    CompressionReport, Dimensions, NamedOutput, OutputFormat, PageOrientation, PrintSize,
    effective_dpi, pixels_for_print,
};
use crate::presets;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human file size, base 1024, at most two decimals with trailing zeros dropped.
///
/// ```text
/// 0     → 0 Bytes
/// 1536  → 1.5 KB
/// 1024  → 1 KB
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Print lines to stdout.
pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Single-file tools
// ============================================================================

/// `Saved <path>` plus dimensions, format and size. PDFs also name their
/// page orientation.
pub fn format_saved(output: &NamedOutput, path: &Path) -> Vec<String> {
    let page = match output.format {
        OutputFormat::Pdf => format!(
            " ({} page)",
            PageOrientation::for_dimensions(output.dimensions).label()
        ),
        _ => String::new(),
    };
    vec![
        format!("Saved {}", path.display()),
        format!(
            "{}{} {}{}, {}",
            indent(1),
            output.dimensions,
            output.format,
            page,
            format_file_size(output.bytes.len() as u64)
        ),
    ]
}

pub fn format_compression_report(report: &CompressionReport) -> Vec<String> {
    vec![
        format!("{}Original:   {}", indent(1), format_file_size(report.original_bytes)),
        format!("{}Compressed: {}", indent(1), format_file_size(report.compressed_bytes)),
        format!("{}Reduction:  {}%", indent(1), report.reduction_percent()),
        format!("{}Quality:    {}", indent(1), report.quality),
    ]
}

// ============================================================================
// Bulk
// ============================================================================

/// Format a single bulk progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Processing {} {}", total, noun)]
        }
        BatchEvent::ItemFinished {
            index,
            file_name,
            bytes,
        } => vec![format!(
            "{}{} {} ({})",
            indent(1),
            format_index(index + 1),
            file_name,
            format_file_size(*bytes as u64)
        )],
        BatchEvent::ItemFailed {
            index,
            source_name,
            error,
        } => vec![format!(
            "{}{} {}: FAILED {}",
            indent(1),
            format_index(index + 1),
            source_name,
            error
        )],
    }
}

/// Summary after the archive was written. Failures are listed again so the
/// report is complete even when progress lines scrolled away.
pub fn format_batch_summary(
    outcome: &BatchOutcome,
    archive_path: &Path,
    archive_bytes: usize,
) -> Vec<String> {
    let total = outcome.outputs.len() + outcome.failures.len();
    let mut lines = vec![format!(
        "Archive {} ({})",
        archive_path.display(),
        format_file_size(archive_bytes as u64)
    )];
    if outcome.failures.is_empty() {
        lines.push(format!("{}{} images", indent(1), total));
    } else {
        lines.push(format!(
            "{}{} of {} images, {} failed",
            indent(1),
            outcome.outputs.len(),
            total,
            outcome.failures.len()
        ));
        for failure in &outcome.failures {
            lines.push(format!(
                "{}{} {}: {}",
                indent(2),
                format_index(failure.index + 1),
                failure.source_name,
                failure.error
            ));
        }
    }
    lines
}

// ============================================================================
// Presets, DPI, preferences
// ============================================================================

pub fn format_presets() -> Vec<String> {
    let mut lines = Vec::new();
    for (category, members) in presets::by_category() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(category.to_string());
        for preset in members {
            lines.push(format!(
                "{}{:<16} {:>4}x{:<4}  {}",
                indent(1),
                preset.name,
                preset.width,
                preset.height,
                preset.slug()
            ));
        }
    }
    lines
}

/// The model's DPI suggestion next to the local print arithmetic.
pub fn format_dpi(suggestion: &DpiSuggestion, image: Dimensions, size: PrintSize) -> Vec<String> {
    let mut lines = vec![format!("Suggested DPI: {}", suggestion.suggested_dpi)];
    if !suggestion.action_suggestion.is_empty() {
        lines.push(format!("{}{}", indent(1), suggestion.action_suggestion));
    }
    lines.push(format!(
        "Print {}x{} in from a {} image",
        size.width, size.height, image
    ));
    if let Some(dpi) = effective_dpi(image, size) {
        lines.push(format!("{}Effective DPI: {:.0}", indent(1), dpi));
    }
    let (w, h) = pixels_for_print(size, suggestion.suggested_dpi);
    lines.push(format!(
        "{}Pixels needed at {} DPI: {}x{}",
        indent(1),
        suggestion.suggested_dpi,
        w,
        h
    ));
    lines
}

pub fn format_preferences(preferences: &Preferences, path: &Path) -> Vec<String> {
    let format = preferences
        .last_format
        .map(|f| f.to_string())
        .unwrap_or_else(|| "-".to_string());
    let quality = preferences
        .last_quality
        .map(|q| q.to_string())
        .unwrap_or_else(|| "-".to_string());
    vec![
        format!("Preferences ({})", path.display()),
        format!("{}theme:        {}", indent(1), preferences.theme),
        format!("{}last format:  {}", indent(1), format),
        format!("{}last quality: {}", indent(1), quality),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ItemFailure;
    use crate::context::Theme;
    use crate::imaging::{DecodeError, PipelineError, Quality};

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn file_size_caps_at_gigabytes() {
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    // =========================================================================
    // Tool output
    // =========================================================================

    #[test]
    fn saved_line_shows_dimensions_and_size() {
        let output = NamedOutput {
            file_name: "a_resized.jpg".into(),
            bytes: vec![0; 2048],
            format: OutputFormat::Jpeg,
            dimensions: Dimensions::new(960, 540).unwrap(),
        };
        assert_eq!(
            format_saved(&output, Path::new("out/a_resized.jpg")),
            vec!["Saved out/a_resized.jpg", "    960x540 JPEG, 2 KB"]
        );
    }

    #[test]
    fn saved_pdf_names_page_orientation() {
        let output = NamedOutput {
            file_name: "wide.pdf".into(),
            bytes: vec![0; 100],
            format: OutputFormat::Pdf,
            dimensions: Dimensions::new(640, 480).unwrap(),
        };
        assert_eq!(
            format_saved(&output, Path::new("wide.pdf"))[1],
            "    640x480 PDF (landscape page), 100 Bytes"
        );
        let square = NamedOutput {
            dimensions: Dimensions::new(300, 300).unwrap(),
            ..output
        };
        assert_eq!(
            format_saved(&square, Path::new("wide.pdf"))[1],
            "    300x300 PDF (portrait page), 100 Bytes"
        );
    }

    #[test]
    fn compression_report_lines() {
        let lines = format_compression_report(&CompressionReport {
            original_bytes: 4096,
            compressed_bytes: 1024,
            quality: Quality::new(60),
        });
        assert_eq!(
            lines,
            vec![
                "    Original:   4 KB",
                "    Compressed: 1 KB",
                "    Reduction:  75%",
                "    Quality:    60",
            ]
        );
    }

    #[test]
    fn batch_events_use_one_based_index() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Processing 1 image"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::ItemFinished {
                index: 0,
                file_name: "a.webp".into(),
                bytes: 100,
            }),
            vec!["    001 a.webp (100 Bytes)"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::ItemFailed {
                index: 1,
                source_name: "b.png".into(),
                error: "boom".into(),
            }),
            vec!["    002 b.png: FAILED boom"]
        );
    }

    #[test]
    fn batch_summary_lists_failures() {
        let outcome = BatchOutcome {
            outputs: vec![NamedOutput {
                file_name: "a.png".into(),
                bytes: vec![1],
                format: OutputFormat::Png,
                dimensions: Dimensions::new(1, 1).unwrap(),
            }],
            failures: vec![ItemFailure {
                index: 1,
                source_name: "b.png".into(),
                error: PipelineError::Decode(DecodeError::Empty),
            }],
        };
        let lines = format_batch_summary(&outcome, Path::new("bulk.zip"), 2048);
        assert_eq!(lines[0], "Archive bulk.zip (2 KB)");
        assert_eq!(lines[1], "    1 of 2 images, 1 failed");
        assert!(lines[2].starts_with("        002 b.png: "));
    }

    #[test]
    fn presets_grouped_with_blank_lines() {
        let lines = format_presets();
        assert_eq!(lines[0], "Social Media");
        assert!(lines.iter().any(|l| l.contains("1080x1920") && l.contains("instagram-story")));
        assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 2);
    }

    #[test]
    fn dpi_lines_include_print_arithmetic() {
        let suggestion = DpiSuggestion {
            suggested_dpi: 300,
            action_suggestion: "Upscale first.".into(),
        };
        let lines = format_dpi(
            &suggestion,
            Dimensions::new(1200, 1800).unwrap(),
            PrintSize {
                width: 4.0,
                height: 6.0,
            },
        );
        assert_eq!(lines[0], "Suggested DPI: 300");
        assert_eq!(lines[1], "    Upscale first.");
        assert!(lines.contains(&"    Effective DPI: 300".to_string()));
        assert!(lines.contains(&"    Pixels needed at 300 DPI: 1200x1800".to_string()));
    }

    #[test]
    fn preferences_show_dashes_when_unset() {
        let prefs = Preferences {
            theme: Theme::Dark,
            ..Preferences::default()
        };
        let lines = format_preferences(&prefs, Path::new("preferences.toml"));
        assert_eq!(lines[1], "    theme:        dark");
        assert_eq!(lines[2], "    last format:  -");
    }
}
