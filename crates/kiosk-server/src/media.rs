//! Snapshot imaging seam
//!
//! The kiosk never touches pixels itself. An [`ImagePipeline`] turns the
//! visitor's photo into the web preview carried by the session-active event
//! and composes the emailed snapshot on the grid described by
//! [`SnapshotLayout`]. Results carry their [`ImageFormat`] so previews and
//! attachments are labelled with what the bytes actually are.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use lookbook_infra_common::{Error, Result};
use lookbook_session_core::{OutfitSelection, Slot};
use tracing::debug;

pub const LOGO_LEFT: &str = "Logo_Left_static.png";
pub const LOGO_RIGHT: &str = "Logo_Right_static.png";

/// Encodings the kiosk accepts and produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detect the format from the file signature
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xff, 0xd8, 0xff, ..] => Some(ImageFormat::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some(ImageFormat::Png),
            [b'G', b'I', b'F', b'8', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Image bytes tagged with their encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
}

impl EncodedImage {
    /// Tag `bytes` with their sniffed format; unknown signatures are rejected
    pub fn sniffed(bytes: Bytes) -> Result<Self> {
        let format = ImageFormat::sniff(&bytes)
            .ok_or_else(|| Error::Validation("Photo must be a JPEG, PNG, GIF or WebP image".into()))?;
        Ok(Self { bytes, format })
    }

    /// `data:` URL for embedding in the session-active event
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), STANDARD.encode(&self.bytes))
    }
}

#[async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Web-sized preview of the visitor photo
    async fn preview(&self, photo: &Bytes) -> Result<EncodedImage>;

    /// Final snapshot with the photo and outfits placed on `layout`
    async fn compose(
        &self,
        photo: &Bytes,
        outfits: &OutfitSelection,
        layout: &SnapshotLayout,
    ) -> Result<EncodedImage>;
}

/// What goes into one grid cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// Static artwork by filename
    Asset(String),
    UserPhoto,
    Outfit(Slot, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPlacement {
    pub row: u32,
    pub col: u32,
    /// Pixel offset of the cell's top-left corner
    pub left: u32,
    pub top: u32,
    pub content: CellContent,
}

/// 3x3 snapshot grid
///
/// ```text
/// [logo left ] [visitor photo] [logo right ]
/// [left      ] [top          ] [right      ]
/// [          ] [bottom       ] [shoes      ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotLayout {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub gap: u32,
    pub padding: u32,
}

impl Default for SnapshotLayout {
    fn default() -> Self {
        Self {
            columns: 3,
            rows: 3,
            cell_width: 400,
            cell_height: 300,
            gap: 10,
            padding: 20,
        }
    }
}

impl SnapshotLayout {
    /// Canvas width and height in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        let span = |cells: u32, size: u32| size * cells + self.gap * cells.saturating_sub(1) + self.padding * 2;
        (span(self.columns, self.cell_width), span(self.rows, self.cell_height))
    }

    /// Top-left corner `(left, top)` of a cell
    pub fn cell_origin(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.padding + col * (self.cell_width + self.gap),
            self.padding + row * (self.cell_height + self.gap),
        )
    }

    /// Occupied cells for one snapshot, row by row; the bottom-left cell
    /// stays empty
    pub fn placements(&self, outfits: &OutfitSelection) -> Vec<CellPlacement> {
        let outfit = |slot: Slot| CellContent::Outfit(slot, outfits.get(slot).to_string());
        let cells = [
            (0, 0, CellContent::Asset(LOGO_LEFT.to_string())),
            (0, 1, CellContent::UserPhoto),
            (0, 2, CellContent::Asset(LOGO_RIGHT.to_string())),
            (1, 0, outfit(Slot::Left)),
            (1, 1, outfit(Slot::Top)),
            (1, 2, outfit(Slot::Right)),
            (2, 1, outfit(Slot::Bottom)),
            (2, 2, outfit(Slot::Shoes)),
        ];

        cells
            .into_iter()
            .map(|(row, col, content)| {
                let (left, top) = self.cell_origin(row, col);
                CellPlacement { row, col, left, top, content }
            })
            .collect()
    }
}

/// Pipeline that hands the photo through untouched, in its uploaded
/// format; pixel work is left to an external renderer
#[derive(Debug, Default, Clone)]
pub struct PassthroughPipeline;

#[async_trait]
impl ImagePipeline for PassthroughPipeline {
    async fn preview(&self, photo: &Bytes) -> Result<EncodedImage> {
        if photo.is_empty() {
            return Err(Error::Validation("photo is empty".into()));
        }
        EncodedImage::sniffed(photo.clone())
    }

    async fn compose(
        &self,
        photo: &Bytes,
        outfits: &OutfitSelection,
        layout: &SnapshotLayout,
    ) -> Result<EncodedImage> {
        let (width, height) = layout.canvas_size();
        debug!(
            "Composing {}x{} snapshot with {} cells",
            width,
            height,
            layout.placements(outfits).len()
        );
        EncodedImage::sniffed(photo.clone())
    }
}
