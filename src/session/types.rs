// SPDX-License-Identifier: GPL-3.0-only

//! Core types for scan results
//!
//! These types represent a single code instance reported by a detector for
//! one frame. They flow from the detector through the controller into the
//! session and finally out to whatever presents the results.

use crate::errors::DetectionError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Code family of a detection
///
/// `Unknown` is the sentinel carried by detections that were only localized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbology {
    Unknown,
    Ean13,
    Ean8,
    Upca,
    Upce,
    Code11,
    Code128,
    Code39,
    Code93,
    Itf,
    Qr,
    DataMatrix,
    Pdf417,
    MsiPlessey,
    Gs1Databar,
    Gs1DatabarLimited,
    Gs1DatabarExpanded,
    Codabar,
    Aztec,
    Maxicode,
    FiveDigitAddOn,
    TwoDigitAddOn,
}

impl Symbology {
    /// Number of decodable symbologies (everything except `Unknown`)
    pub const COUNT: usize = 21;

    /// All decodable symbologies, in table order
    pub const ALL: [Symbology; Self::COUNT] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Upca,
        Symbology::Upce,
        Symbology::Code11,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Itf,
        Symbology::Qr,
        Symbology::DataMatrix,
        Symbology::Pdf417,
        Symbology::MsiPlessey,
        Symbology::Gs1Databar,
        Symbology::Gs1DatabarLimited,
        Symbology::Gs1DatabarExpanded,
        Symbology::Codabar,
        Symbology::Aztec,
        Symbology::Maxicode,
        Symbology::FiveDigitAddOn,
        Symbology::TwoDigitAddOn,
    ];

    /// Position of this symbology in [`Symbology::ALL`], `None` for `Unknown`
    pub fn table_index(self) -> Option<usize> {
        match self {
            Symbology::Unknown => None,
            other => Some(other as usize - 1),
        }
    }

    /// Get display name for the symbology
    pub fn display_name(&self) -> &'static str {
        match self {
            Symbology::Unknown => "Unknown",
            Symbology::Ean13 => "EAN-13",
            Symbology::Ean8 => "EAN-8",
            Symbology::Upca => "UPC-A",
            Symbology::Upce => "UPC-E",
            Symbology::Code11 => "Code 11",
            Symbology::Code128 => "Code 128",
            Symbology::Code39 => "Code 39",
            Symbology::Code93 => "Code 93",
            Symbology::Itf => "ITF",
            Symbology::Qr => "QR",
            Symbology::DataMatrix => "Data Matrix",
            Symbology::Pdf417 => "PDF417",
            Symbology::MsiPlessey => "MSI Plessey",
            Symbology::Gs1Databar => "GS1 DataBar",
            Symbology::Gs1DatabarLimited => "GS1 DataBar Limited",
            Symbology::Gs1DatabarExpanded => "GS1 DataBar Expanded",
            Symbology::Codabar => "Codabar",
            Symbology::Aztec => "Aztec",
            Symbology::Maxicode => "MaxiCode",
            Symbology::FiveDigitAddOn => "Five-Digit Add-On",
            Symbology::TwoDigitAddOn => "Two-Digit Add-On",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A point in raw frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Location of a code as a polygon with 4 corners
///
/// Corners follow the code's own orientation: `top_left` is the top-left
/// corner of the code regardless of how it is rotated in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Quadrilateral {
    /// Axis-aligned quadrilateral covering the given pixel rectangle
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            top_left: Point::new(x, y),
            top_right: Point::new(x + width, y),
            bottom_left: Point::new(x, y + height),
            bottom_right: Point::new(x + width, y + height),
        }
    }

    /// Scale every corner by the same factor
    pub fn scaled(&self, factor: f64) -> Self {
        let s = |p: Point| Point::new(p.x * factor, p.y * factor);
        Self {
            top_left: s(self.top_left),
            top_right: s(self.top_right),
            bottom_left: s(self.bottom_left),
            bottom_right: s(self.bottom_right),
        }
    }
}

/// Identity of a code for duplicate filtering and caching
///
/// Two detections describe the same code iff symbology and data match
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub symbology: Symbology,
    pub data: Vec<u8>,
}

/// One localized or recognized code instance for one frame
///
/// Constructed through [`Detection::localized`] or [`Detection::recognized`],
/// which keeps the invariant that a localized-only detection has
/// `Symbology::Unknown`, no data and is never a GS1 data carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectionRecord", into = "DetectionRecord")]
pub struct Detection {
    symbology: Symbology,
    recognized: bool,
    gs1_data_carrier: bool,
    data: Vec<u8>,
    location: Quadrilateral,
    timestamp_ms: u64,
}

impl Detection {
    /// A code that was found in the frame but could not be decoded
    pub fn localized(location: Quadrilateral, timestamp_ms: u64) -> Self {
        Self {
            symbology: Symbology::Unknown,
            recognized: false,
            gs1_data_carrier: false,
            data: Vec::new(),
            location,
            timestamp_ms,
        }
    }

    /// A fully decoded code
    ///
    /// Fails when `symbology` is the `Unknown` sentinel.
    pub fn recognized(
        symbology: Symbology,
        data: impl Into<Vec<u8>>,
        gs1_data_carrier: bool,
        location: Quadrilateral,
        timestamp_ms: u64,
    ) -> Result<Self, DetectionError> {
        if symbology == Symbology::Unknown {
            return Err(DetectionError::UnknownSymbology);
        }
        Ok(Self {
            symbology,
            recognized: true,
            gs1_data_carrier,
            data: data.into(),
            location,
            timestamp_ms,
        })
    }

    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    pub fn is_recognized(&self) -> bool {
        self.recognized
    }

    pub fn is_gs1_data_carrier(&self) -> bool {
        self.gs1_data_carrier
    }

    /// Raw decoded bytes; may contain embedded NUL bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decoded data for display, with invalid UTF-8 replaced
    pub fn data_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn location(&self) -> &Quadrilateral {
        &self.location
    }

    /// Capture time of the frame this detection belongs to
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn key(&self) -> DuplicateKey {
        DuplicateKey {
            symbology: self.symbology,
            data: self.data.clone(),
        }
    }
}

/// Serialized form of a detection
///
/// Data is written as a string when it is printable UTF-8 and as a byte
/// array otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionRecord {
    #[serde(default = "unknown_symbology")]
    symbology: Symbology,
    recognized: bool,
    #[serde(default)]
    gs1_data_carrier: bool,
    #[serde(default)]
    data: Option<DataField>,
    #[serde(default)]
    location: Quadrilateral,
    #[serde(default)]
    timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DataField {
    Text(String),
    Bytes(Vec<u8>),
}

fn unknown_symbology() -> Symbology {
    Symbology::Unknown
}

impl TryFrom<DetectionRecord> for Detection {
    type Error = DetectionError;

    fn try_from(record: DetectionRecord) -> Result<Self, Self::Error> {
        if !record.recognized {
            if record.symbology != Symbology::Unknown || record.gs1_data_carrier {
                return Err(DetectionError::LocalizedWithAttributes);
            }
            return Ok(Detection::localized(record.location, record.timestamp_ms));
        }
        let data = match record.data {
            Some(DataField::Text(text)) => text.into_bytes(),
            Some(DataField::Bytes(bytes)) => bytes,
            None => Vec::new(),
        };
        Detection::recognized(
            record.symbology,
            data,
            record.gs1_data_carrier,
            record.location,
            record.timestamp_ms,
        )
    }
}

impl From<Detection> for DetectionRecord {
    fn from(detection: Detection) -> Self {
        let data = if !detection.recognized {
            None
        } else {
            match String::from_utf8(detection.data) {
                Ok(text) if !text.contains('\0') => Some(DataField::Text(text)),
                Ok(text) => Some(DataField::Bytes(text.into_bytes())),
                Err(e) => Some(DataField::Bytes(e.into_bytes())),
            }
        };
        Self {
            symbology: detection.symbology,
            recognized: detection.recognized,
            gs1_data_carrier: detection.gs1_data_carrier,
            data,
            location: detection.location,
            timestamp_ms: detection.timestamp_ms,
        }
    }
}

/// Detections for one processed camera frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,
    /// Detections in detector order
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(timestamp_ms: u64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp_ms,
            detections,
        }
    }
}
