use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Insets {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

/// Fixed region sizes a card height is summed from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CardFrame {
    pub margin: Insets,
    pub header_height: f32,
    pub text_top_margin: f32,
    /// "Show more" affordance under truncated text.
    pub affordance_height: f32,
    pub media_top_margin: f32,
    pub image_height: f32,
    pub gallery_height: f32,
    pub footer_top_margin: f32,
    pub footer_height: f32,
}

impl Default for CardFrame {
    fn default() -> Self {
        Self {
            margin: Insets { top: 12.0, left: 12.0, bottom: 12.0, right: 12.0 },
            header_height: 36.0,
            text_top_margin: 10.0,
            affordance_height: 22.0,
            media_top_margin: 6.0,
            image_height: 269.0,
            gallery_height: 290.0,
            footer_top_margin: 18.0,
            footer_height: 24.0,
        }
    }
}

impl CardFrame {
    /// Width available to text once horizontal margins are removed.
    pub fn text_width(&self, available_width: f32) -> f32 {
        (available_width - self.margin.left - self.margin.right).max(0.0)
    }

    /// Media region for 0, 1 or many attachments (top margin included).
    pub fn media_height(&self, attachments: usize) -> f32 {
        match attachments {
            0 => 0.0,
            1 => self.media_top_margin + self.image_height,
            _ => self.media_top_margin + self.gallery_height,
        }
    }

    /// Everything except the text block, the affordance and the media region.
    pub fn chrome_height(&self) -> f32 {
        self.margin.top
            + self.header_height
            + self.text_top_margin
            + self.footer_top_margin
            + self.footer_height
            + self.margin.bottom
    }
}
