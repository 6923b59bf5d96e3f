//! Pure eligibility predicates and the candidate ranking rule.
//!
//! Manual clicks, the keyboard shortcut and the automatic trigger all rank
//! through [`pick_best_candidate`], so they always agree on which video wins.

use crate::host::{known_duration, MediaElement, Rect, VideoHandle, Viewport};
use crate::settings::Settings;

pub fn is_visible(rect: Rect, viewport: Viewport) -> bool {
    rect.has_area() && rect.intersects(viewport)
}

/// Large enough on screen and long enough to be worth floating.
pub fn meets_thresholds(video: &dyn MediaElement, settings: &Settings) -> bool {
    let rect = video.rect();
    if rect.width < f64::from(settings.min_width) || rect.height < f64::from(settings.min_height) {
        return false;
    }
    match known_duration(video.duration()) {
        Some(duration) => duration >= settings.min_duration_seconds,
        None => true,
    }
}

pub fn is_eligible(video: &dyn MediaElement, settings: &Settings, viewport: Viewport) -> bool {
    is_visible(video.rect(), viewport) && meets_thresholds(video, settings)
}

/// Whether a known duration is below the configured minimum.
pub fn is_too_short(video: &dyn MediaElement, settings: &Settings) -> bool {
    known_duration(video.duration()).is_some_and(|d| d < settings.min_duration_seconds)
}

/// Substring match, case as given. `tiktok.com` also blocks `nottiktok.example.com`.
pub fn is_blacklisted(hostname: &str, settings: &Settings) -> bool {
    settings
        .blacklist_entries()
        .any(|entry| hostname.contains(entry))
}

/// Ranking shared by every activation path.
///
/// 1. the hovered video, if still on the page and not ended;
/// 2. the playing candidate with the largest intrinsic area;
/// 3. the visible paused candidate with the largest intrinsic area.
///
/// Ties go to the earlier candidate.
pub fn pick_best_candidate(
    videos: &[VideoHandle],
    hovered: Option<&VideoHandle>,
    viewport: Viewport,
) -> Option<VideoHandle> {
    if let Some(hovered) = hovered {
        if hovered.is_connected() && !hovered.is_ended() {
            return Some(hovered.clone());
        }
    }

    pick_playing_candidate(videos).or_else(|| {
        largest(
            videos
                .iter()
                .filter(|v| v.is_connected() && !v.is_ended())
                .filter(|v| is_visible(v.rect(), viewport)),
        )
    })
}

/// Largest currently playing candidate; the automatic trigger only looks here.
pub fn pick_playing_candidate(videos: &[VideoHandle]) -> Option<VideoHandle> {
    largest(
        videos
            .iter()
            .filter(|v| v.is_connected() && v.is_playing()),
    )
}

fn largest<'a>(candidates: impl Iterator<Item = &'a VideoHandle>) -> Option<VideoHandle> {
    let mut best: Option<&VideoHandle> = None;
    for candidate in candidates {
        let better = match best {
            Some(current) => candidate.intrinsic_size().area() > current.intrinsic_size().area(),
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best.cloned()
}
