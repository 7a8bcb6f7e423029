//! Output file naming.
//!
//! Every tool derives its output name from the input's name:
//! - resize → `photo_resized.jpg` (source extension kept)
//! - convert, bulk → `photo.webp`
//! - compress → `photo_compressed.jpg`
//!
//! Names are file names, never paths: [`sanitize`] strips directories before a
//! name is used as an archive member or written to disk, and
//! [`disambiguate`] makes a list of names unique ignoring case.

use crate::imaging::OutputFormat;
use std::collections::HashSet;
use std::path::Path;

/// Stem used when a name has nothing before its extension.
const FALLBACK_STEM: &str = "image";

/// Byte index of the dot starting the final extension, if the name has one.
///
/// An extension is one or more characters after the last dot, none of them `/`.
fn extension_dot(name: &str) -> Option<usize> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    (!ext.is_empty() && !ext.contains('/')).then_some(dot)
}

/// Name without its final extension: `"a.tar.gz"` → `"a.tar"`.
///
/// Falls back to `"image"` when nothing remains.
pub fn stem(name: &str) -> &str {
    let stem = match extension_dot(name) {
        Some(dot) => &name[..dot],
        None => name,
    };
    if stem.is_empty() { FALLBACK_STEM } else { stem }
}

/// Final extension without the dot.
pub fn extension(name: &str) -> Option<&str> {
    extension_dot(name).map(|dot| &name[dot + 1..])
}

/// `photo.png` + `webp` → `photo.webp`.
pub fn replace_extension(name: &str, ext: &str) -> String {
    format!("{}.{}", stem(name), ext)
}

/// Extension for an output of `format` derived from `name`.
///
/// The source extension is kept when it already names `format` (`JPG` for
/// JPEG); otherwise the format's canonical extension is used.
pub fn output_extension(name: &str, format: OutputFormat) -> &str {
    extension(name)
        .filter(|ext| ext.parse::<OutputFormat>().ok() == Some(format))
        .unwrap_or(format.extension())
}

/// `photo.JPG` + `_resized` → `photo_resized.JPG`.
pub fn suffixed_name(name: &str, suffix: &str, format: OutputFormat) -> String {
    format!("{}{}.{}", stem(name), suffix, output_extension(name, format))
}

/// Reduce a name to its final path component, or `fallback` if there is none.
pub fn sanitize(name: &str, fallback: &str) -> String {
    let unified = name.replace('\\', "/");
    Path::new(&unified)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Make `names` unique, ignoring case, in input order.
///
/// The first occurrence keeps its name; later duplicates get `_1`, `_2`, …
/// before the extension. Generated names never collide with any name
/// already in the list.
pub fn disambiguate(names: &mut [String]) {
    let originals: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());

    for name in names.iter_mut() {
        if taken.insert(name.to_lowercase()) {
            continue;
        }
        let (stem, ext) = match extension_dot(name) {
            Some(dot) => (name[..dot].to_string(), name[dot..].to_string()),
            None => (name.clone(), String::new()),
        };
        let mut n = 1;
        let candidate = loop {
            let candidate = format!("{stem}_{n}{ext}");
            let key = candidate.to_lowercase();
            if !taken.contains(&key) && !originals.contains(&key) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(candidate.to_lowercase());
        *name = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stem_strips_last_extension_only() {
        assert_eq!(stem("holiday.jpg"), "holiday");
        assert_eq!(stem("archive.tar.gz"), "archive.tar");
        assert_eq!(stem("README"), "README");
    }

    #[test]
    fn stem_falls_back_when_empty() {
        assert_eq!(stem(".png"), "image");
        assert_eq!(stem(""), "image");
    }

    #[test]
    fn trailing_dot_is_not_an_extension() {
        assert_eq!(extension("odd."), None);
        assert_eq!(stem("odd."), "odd.");
    }

    #[test]
    fn replace_extension_swaps() {
        assert_eq!(replace_extension("scan.PNG", "jpeg"), "scan.jpeg");
        assert_eq!(replace_extension("noext", "gif"), "noext.gif");
    }

    #[test]
    fn suffixed_name_keeps_matching_extension() {
        assert_eq!(
            suffixed_name("photo.JPG", "_resized", OutputFormat::Jpeg),
            "photo_resized.JPG"
        );
        assert_eq!(
            suffixed_name("scan.pdf", "_resized", OutputFormat::Png),
            "scan_resized.png"
        );
        assert_eq!(
            suffixed_name("noext", "_resized", OutputFormat::WebP),
            "noext_resized.webp"
        );
    }

    #[test]
    fn output_extension_keeps_matching_source_extension() {
        assert_eq!(output_extension("me.jpg", OutputFormat::Jpeg), "jpg");
        assert_eq!(output_extension("me.JPEG", OutputFormat::Jpeg), "JPEG");
        assert_eq!(output_extension("doc.pdf", OutputFormat::Png), "png");
        assert_eq!(output_extension("noext", OutputFormat::Gif), "gif");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd", "file"), "passwd");
        assert_eq!(sanitize("C:\\Users\\me\\pic.png", "file"), "pic.png");
        assert_eq!(sanitize("..", "file"), "file");
        assert_eq!(sanitize("", "file"), "file");
    }

    #[test]
    fn disambiguate_leaves_unique_names() {
        let mut names = owned(&["a.png", "b.png"]);
        disambiguate(&mut names);
        assert_eq!(names, owned(&["a.png", "b.png"]));
    }

    #[test]
    fn disambiguate_suffixes_case_insensitive_duplicates() {
        let mut names = owned(&["photo.jpeg", "PHOTO.jpeg", "photo.jpeg"]);
        disambiguate(&mut names);
        assert_eq!(names, owned(&["photo.jpeg", "PHOTO_1.jpeg", "photo_2.jpeg"]));
    }

    #[test]
    fn disambiguate_avoids_existing_suffixed_names() {
        let mut names = owned(&["x.png", "x.png", "x_1.png"]);
        disambiguate(&mut names);
        assert_eq!(names, owned(&["x.png", "x_2.png", "x_1.png"]));
    }

    #[test]
    fn disambiguate_without_extension() {
        let mut names = owned(&["raw", "raw"]);
        disambiguate(&mut names);
        assert_eq!(names, owned(&["raw", "raw_1"]));
    }
}
