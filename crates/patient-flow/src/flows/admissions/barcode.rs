use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of digits in a local admission barcode.
pub const BARCODE_LEN: usize = 13;

/// Attempts to draw a fresh barcode before giving up. The code space is
/// 10^13, so this bound is unreachable outside a corrupted store.
pub const MAX_MINT_ATTEMPTS: u32 = 64;

/// Human-readable 13-digit code printed on the wristband given to a patient
/// at intake. Unique across all admissions, ever.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

impl Barcode {
    pub fn parse(value: String) -> Result<Self, BarcodeError> {
        if value.len() != BARCODE_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BarcodeError::Format);
        }
        Ok(Self(value))
    }

    /// Draw a uniformly random code. Uniqueness is the caller's problem;
    /// the admission service re-draws while the code collides.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut digits = String::with_capacity(BARCODE_LEN);
        for _ in 0..BARCODE_LEN {
            digits.push(char::from(b'0' + rng.gen_range(0..10u8)));
        }
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Barcode {
    type Error = BarcodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Barcode> for String {
    fn from(value: Barcode) -> Self {
        value.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BarcodeError {
    #[error("barcode must be exactly 13 ascii digits")]
    Format,
    #[error("barcode space exhausted after {0} attempts")]
    Exhausted(u32),
    #[error("barcode rendering failed: {0}")]
    Render(String),
}

/// Descriptor for a rendered, scannable barcode image held by an external
/// artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedBarcode {
    pub storage_key: String,
}

/// Outbound collaborator that turns a barcode into a scannable image.
/// Rendering technology is outside the core; implementations may write a
/// file, call a label printer, or merely record the artifact key.
pub trait BarcodeRenderer: Send + Sync {
    fn render(&self, barcode: &Barcode) -> Result<RenderedBarcode, BarcodeError>;
}

/// Renderer for contexts that track artifacts without materialising images.
#[derive(Debug, Default, Clone)]
pub struct KeyOnlyRenderer;

impl BarcodeRenderer for KeyOnlyRenderer {
    fn render(&self, barcode: &Barcode) -> Result<RenderedBarcode, BarcodeError> {
        Ok(RenderedBarcode {
            storage_key: format!("barcodes/{barcode}.png"),
        })
    }
}
