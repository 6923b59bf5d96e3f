use crate::host::{MediaElement, MediaMetadata, PageHost};

/// Resolve what the media-control surface shows for `video`.
///
/// Each field takes the first non-blank value of: explicit per-video hint,
/// page-level fallback (title, hostname, poster), nearest caption text.
/// A hostname is always present, so the caption only names a video when the
/// host reports none.
pub fn resolve_metadata(video: &dyn MediaElement, page: &dyn PageHost) -> MediaMetadata {
    let hint = video.metadata_hint();
    let hostname = page.hostname();

    let title = first_non_blank([
        hint.title,
        Some(page.title()),
        Some(hostname.clone()),
        video.nearest_caption(),
    ]);
    let artist = first_non_blank([hint.artist, Some(hostname)]);
    let album = first_non_blank([hint.album]);
    let artwork = first_non_blank([hint.artwork, video.poster()]);

    MediaMetadata {
        title,
        artist,
        album,
        artwork: if artwork.is_empty() {
            Vec::new()
        } else {
            vec![artwork]
        },
    }
}

fn first_non_blank<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}
