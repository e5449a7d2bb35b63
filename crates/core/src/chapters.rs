//! Line-oriented chapter list format.
//!
//! One chapter per line, `<url> <title>`. The URL runs up to the first space;
//! everything after it is the title, spaces included.

use crate::model::ChapterReference;

/// Render references as `<url> <title>` lines.
pub fn to_listing(chapters: &[ChapterReference]) -> String {
    let mut out = String::new();
    for chapter in chapters {
        out.push_str(&chapter.url);
        out.push(' ');
        out.push_str(&chapter.title);
        out.push('\n');
    }
    out
}

/// Parse `<url> <title>` lines back into references.
///
/// Lines without a space separator are skipped without complaint.
pub fn parse_listing(text: &str) -> Vec<ChapterReference> {
    text.lines()
        .filter_map(|line| line.split_once(' '))
        .map(|(url, title)| ChapterReference::new(title, url))
        .collect()
}
