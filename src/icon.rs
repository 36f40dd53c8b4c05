//! Tray icons for the coordinator states.
//!
//! The icons are plain colored discs rendered in memory, one per state, so
//! the binary ships no image assets.

use std::sync::LazyLock;

use skriv_core::State;

const SIZE: u32 = 32;

// Colors follow the macOS system palette.
const COLOR_IDLE: (u8, u8, u8) = (142, 142, 147);
const COLOR_RECORDING: (u8, u8, u8) = (255, 59, 48);
const COLOR_PROCESSING: (u8, u8, u8) = (255, 204, 0);
const COLOR_WAITING: (u8, u8, u8) = (0, 122, 255);

static ICON_IDLE: LazyLock<tray_icon::Icon> = LazyLock::new(|| disc_icon(COLOR_IDLE));
static ICON_RECORDING: LazyLock<tray_icon::Icon> = LazyLock::new(|| disc_icon(COLOR_RECORDING));
static ICON_PROCESSING: LazyLock<tray_icon::Icon> = LazyLock::new(|| disc_icon(COLOR_PROCESSING));
static ICON_WAITING: LazyLock<tray_icon::Icon> = LazyLock::new(|| disc_icon(COLOR_WAITING));

/// The tray icon for a coordinator state.
pub fn for_state(state: State) -> tray_icon::Icon {
    match state {
        State::Idle => ICON_IDLE.clone(),
        State::Recording => ICON_RECORDING.clone(),
        State::Processing => ICON_PROCESSING.clone(),
        State::Waiting => ICON_WAITING.clone(),
    }
}

fn disc_icon(color: (u8, u8, u8)) -> tray_icon::Icon {
    tray_icon::Icon::from_rgba(disc_rgba(color), SIZE, SIZE).expect("Failed to build icon")
}

fn disc_rgba((r, g, b): (u8, u8, u8)) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    let center = (SIZE as f32 - 1.0) / 2.0;
    let radius = SIZE as f32 / 2.0 - 1.5;
    for y in 0..SIZE {
        for x in 0..SIZE {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let alpha = if (dx * dx + dy * dy).sqrt() <= radius {
                255
            } else {
                0
            };
            rgba.extend_from_slice(&[r, g, b, alpha]);
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disc_fills_the_center_and_clears_the_corners() {
        let rgba = disc_rgba(COLOR_RECORDING);
        assert_eq!(rgba.len(), (SIZE * SIZE * 4) as usize);

        let pixel = |x: u32, y: u32| {
            let at = ((y * SIZE + x) * 4) as usize;
            (rgba[at], rgba[at + 1], rgba[at + 2], rgba[at + 3])
        };
        assert_eq!(pixel(SIZE / 2, SIZE / 2), (255, 59, 48, 255));
        assert_eq!(pixel(0, 0).3, 0);
        assert_eq!(pixel(SIZE - 1, SIZE - 1).3, 0);
    }
}
