//! Code 128 pass rendering.
//!
//! The identifier is encoded with character set B (printable ASCII) and
//! drawn as a grayscale PNG: one module is `module_width` pixels wide, bars
//! are `height` pixels tall, and a quiet zone of [`QUIET_ZONE_MODULES`]
//! white modules surrounds the symbol on both sides.

use barcoders::sym::code128::Code128;
use eventpass_core::code::{CodeError, CodeGenerator};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Width of the blank margin on each side, in modules.
pub const QUIET_ZONE_MODULES: u32 = 10;

/// Prefix that selects Code 128 character set B in `barcoders`.
const CHARSET_B: char = 'Ɓ';

const BAR: Luma<u8> = Luma([0]);
const SPACE: Luma<u8> = Luma([255]);

/// Renders identifiers as Code 128 PNG images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code128Generator {
    height: u32,
    module_width: u32,
}

impl Code128Generator {
    /// Create a generator with the given bar height and module width (pixels).
    ///
    /// Zero values are raised to one pixel.
    #[must_use]
    pub fn new(height: u32, module_width: u32) -> Self {
        Self {
            height: height.max(1),
            module_width: module_width.max(1),
        }
    }

    /// Bar height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width of one module in pixels.
    #[must_use]
    pub const fn module_width(&self) -> u32 {
        self.module_width
    }

    /// Encode `identifier` into modules (1 = bar, 0 = space).
    fn modules(&self, identifier: &str) -> Result<Vec<u8>, CodeError> {
        self.check(identifier)?;

        let symbol = Code128::new(format!("{CHARSET_B}{identifier}")).map_err(|e| {
            CodeError::Unsupported {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(symbol.encode())
    }

    fn rasterise(&self, modules: &[u8]) -> Result<GrayImage, CodeError> {
        let symbol_modules = u32::try_from(modules.len())
            .map_err(|_| CodeError::Render("symbol too wide".to_string()))?;
        let width = symbol_modules
            .checked_add(2 * QUIET_ZONE_MODULES)
            .and_then(|m| m.checked_mul(self.module_width))
            .ok_or_else(|| CodeError::Render("symbol too wide".to_string()))?;

        Ok(GrayImage::from_fn(width, self.height, |x, _| {
            let module = x / self.module_width;
            match module
                .checked_sub(QUIET_ZONE_MODULES)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| modules.get(i))
            {
                Some(1) => BAR,
                _ => SPACE,
            }
        }))
    }
}

impl Default for Code128Generator {
    fn default() -> Self {
        Self::new(100, 2)
    }
}

impl CodeGenerator for Code128Generator {
    fn check(&self, identifier: &str) -> Result<(), CodeError> {
        if identifier.is_empty() {
            return Err(CodeError::Unsupported {
                identifier: String::new(),
                reason: "identifier is empty".to_string(),
            });
        }

        match identifier.chars().find(|c| !(' '..='~').contains(c)) {
            Some(c) => Err(CodeError::Unsupported {
                identifier: identifier.to_string(),
                reason: format!("character {c:?} is outside Code 128 set B"),
            }),
            None => Ok(()),
        }
    }

    fn generate(&self, identifier: &str) -> Result<Vec<u8>, CodeError> {
        let modules = self.modules(identifier)?;
        let image = self.rasterise(&modules)?;

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CodeError::Render(e.to_string()))?;

        tracing::debug!(identifier, bytes = png.len(), "Rendered pass image");
        Ok(png)
    }
}
