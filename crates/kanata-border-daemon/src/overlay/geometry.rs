//! Border rectangle layout

use x11rb::protocol::xproto::Rectangle;

/// The four edge rectangles of a border ring: top, left, right, bottom
///
/// The thickness is clamped to half of the smaller screen dimension so no
/// rectangle extends past the opposite edge. Left and right span the full
/// height and overlap the corners of top and bottom.
pub fn border_rects(screen_width: u16, screen_height: u16, width: u16) -> [Rectangle; 4] {
    let w = width.min(screen_width / 2).min(screen_height / 2);

    [
        Rectangle {
            x: 0,
            y: 0,
            width: screen_width,
            height: w,
        },
        Rectangle {
            x: 0,
            y: 0,
            width: w,
            height: screen_height,
        },
        Rectangle {
            x: (screen_width - w) as i16,
            y: 0,
            width: w,
            height: screen_height,
        },
        Rectangle {
            x: 0,
            y: (screen_height - w) as i16,
            width: screen_width,
            height: w,
        },
    ]
}
