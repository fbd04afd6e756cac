use std::sync::OnceLock;

use regex::Regex;

/// How a resolved file URL should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// One display unit of a rendered FAQ body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
    Text { content: String },
    File { url: String, media_kind: MediaKind },
    Link { url: String, label: String },
}

impl ContentSegment {
    fn text(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        (!trimmed.is_empty()).then(|| ContentSegment::Text {
            content: trimmed.to_string(),
        })
    }
}

fn file_marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\[file:([^\]]+)\]").expect("Invalid file marker regex"))
}

fn link_marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\[link:(https?://[^\s|\]]+)\|([^\]]+)\]").expect("Invalid link marker regex")
    })
}

/// Marker found in the source text, with its byte span.
struct Marker {
    start: usize,
    end: usize,
    /// Files sort before links at the same offset.
    rank: u8,
    segment: Option<ContentSegment>,
}

/// Split FAQ text into text, media and link segments in reading order.
///
/// `[file:REF]` resolves through `images` (name -> URL), an absolute
/// `http(s)://` URL, or a dotted host/path that gets an `https://` prefix.
/// Unresolvable file markers vanish. `[link:URL|LABEL]` becomes a link.
/// Text between markers is trimmed and blank spans are dropped.
pub fn parse_content(text: &str, images: &[(String, String)]) -> Vec<ContentSegment> {
    let mut markers: Vec<Marker> = Vec::new();

    for caps in file_marker_regex().captures_iter(text) {
        let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        markers.push(Marker {
            start: whole.start(),
            end: whole.end(),
            rank: 0,
            segment: resolve_file(reference.as_str(), images).map(|url| ContentSegment::File {
                media_kind: classify_media(&url),
                url,
            }),
        });
    }

    for caps in link_marker_regex().captures_iter(text) {
        let (Some(whole), Some(url), Some(label)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let label = label.as_str().trim();
        markers.push(Marker {
            start: whole.start(),
            end: whole.end(),
            rank: 1,
            segment: Some(ContentSegment::Link {
                url: url.as_str().to_string(),
                label: if label.is_empty() {
                    url.as_str().to_string()
                } else {
                    label.to_string()
                },
            }),
        });
    }

    markers.sort_by_key(|m| (m.start, m.rank));

    let mut segments = Vec::new();
    let mut cursor = 0;
    for marker in markers {
        if marker.start < cursor {
            // overlaps a marker already consumed
            continue;
        }
        segments.extend(ContentSegment::text(&text[cursor..marker.start]));
        segments.extend(marker.segment);
        cursor = marker.end;
    }
    segments.extend(ContentSegment::text(&text[cursor..]));

    segments
}

fn resolve_file(reference: &str, images: &[(String, String)]) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_string());
    }
    if let Some((_, url)) = images.iter().find(|(name, _)| name == reference) {
        return Some(url.clone());
    }
    if reference.contains('.') && !reference.contains(char::is_whitespace) {
        return Some(format!("https://{}", reference.trim_start_matches('/')));
    }
    None
}

/// Classify by file extension only: `.webm`, `.mp4` and `.webp` are played as
/// video, everything else is shown as an image.
pub fn classify_media(url: &str) -> MediaKind {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if [".webm", ".mp4", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn text(s: &str) -> ContentSegment {
        ContentSegment::Text {
            content: s.to_string(),
        }
    }

    #[test]
    fn test_mixed_markers_in_order() {
        let images = table(&[("cat.png", "https://cdn/cat.png")]);
        let segments = parse_content("See [file:cat.png] and [link:https://a.com|here]", &images);
        assert_eq!(
            segments,
            vec![
                text("See"),
                ContentSegment::File {
                    url: "https://cdn/cat.png".into(),
                    media_kind: MediaKind::Image
                },
                text("and"),
                ContentSegment::Link {
                    url: "https://a.com".into(),
                    label: "here".into()
                },
            ]
        );
    }

    #[test]
    fn test_marker_inside_link_label_is_skipped() {
        let images = table(&[("x.png", "https://cdn/x.png")]);
        let segments = parse_content("[link:https://a.com|see [file:x.png] more", &images);
        assert_eq!(
            segments,
            vec![
                ContentSegment::Link {
                    url: "https://a.com".into(),
                    label: "see [file:x.png".into()
                },
                text("more"),
            ]
        );
    }

    #[test]
    fn test_plain_text_is_single_trimmed_segment() {
        assert_eq!(parse_content("  just words \n", &[]), vec![text("just words")]);
        assert!(parse_content("", &[]).is_empty());
        assert!(parse_content("   \n\t", &[]).is_empty());
    }

    #[test]
    fn test_file_reference_resolution() {
        let images = table(&[("logo", "https://cdn/logo.png")]);
        let segments = parse_content(
            "[file:logo][file:https://x.io/a.mp4][file:media.example.com/clip.webm][file:unknown]",
            &images,
        );
        assert_eq!(
            segments,
            vec![
                ContentSegment::File {
                    url: "https://cdn/logo.png".into(),
                    media_kind: MediaKind::Image
                },
                ContentSegment::File {
                    url: "https://x.io/a.mp4".into(),
                    media_kind: MediaKind::Video
                },
                ContentSegment::File {
                    url: "https://media.example.com/clip.webm".into(),
                    media_kind: MediaKind::Video
                },
            ]
        );
    }

    #[test]
    fn test_unresolved_file_dropped_text_kept() {
        let segments = parse_content("before [file:nothing] after", &[]);
        assert_eq!(segments, vec![text("before"), text("after")]);
    }

    #[test]
    fn test_malformed_markers_stay_verbatim() {
        let input = "[link:ftp://x|y] and [link:https://a.com] and [file:]";
        assert_eq!(parse_content(input, &[]), vec![text(input)]);
    }

    #[test]
    fn test_trailing_text_after_last_marker() {
        let segments = parse_content("[link:https://a.com|A]\n\nThanks!", &[]);
        assert_eq!(
            segments,
            vec![
                ContentSegment::Link {
                    url: "https://a.com".into(),
                    label: "A".into()
                },
                text("Thanks!"),
            ]
        );
    }

    #[test]
    fn test_classify_media_case_and_query() {
        assert_eq!(classify_media("https://a/b.MP4"), MediaKind::Video);
        assert_eq!(classify_media("https://a/b.webp?size=2"), MediaKind::Video);
        assert_eq!(classify_media("https://a/b.gif"), MediaKind::Image);
        assert_eq!(classify_media("https://a/webm"), MediaKind::Image);
    }

    #[test]
    fn test_multibyte_text_between_markers() {
        let segments = parse_content("Olá [link:https://a.com|aqui] ção", &[]);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], text("Olá"));
        assert_eq!(segments[2], text("ção"));
    }
}
