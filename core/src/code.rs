//! Code generator trait.
//!
//! A code generator turns a registration identifier into a scannable image.
//! Generation is a pure function of the identifier: the same input always
//! yields byte-identical output, and no store is consulted.

use thiserror::Error;

/// Errors raised while encoding an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The identifier contains characters the symbology cannot represent.
    #[error("identifier {identifier:?} cannot be encoded: {reason}")]
    Unsupported {
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The raster could not be produced.
    #[error("failed to render code image: {0}")]
    Render(String),
}

/// Encodes identifiers into raster images.
pub trait CodeGenerator: Send + Sync {
    /// Check that `identifier` can be encoded, without rendering it.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Unsupported`] if the symbology cannot represent it.
    fn check(&self, identifier: &str) -> Result<(), CodeError>;

    /// Render `identifier` as an encoded image.
    ///
    /// # Errors
    ///
    /// - `Unsupported`: the identifier cannot be encoded
    /// - `Render`: the image encoder failed
    fn generate(&self, identifier: &str) -> Result<Vec<u8>, CodeError>;

    /// MIME type of the bytes produced by [`CodeGenerator::generate`].
    fn media_type(&self) -> &'static str {
        "image/png"
    }

    /// File extension matching [`CodeGenerator::media_type`].
    fn file_extension(&self) -> &'static str {
        "png"
    }
}
