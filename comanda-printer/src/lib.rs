//! # comanda-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - A printer-agnostic instruction stream ([`Document`])
//! - WPC1252 single-byte text encoding
//! - ESC/POS encoding of documents
//! - Multi-strategy delivery (direct port write, host spooler, raw TCP)
//!
//! Business logic (WHAT to print) stays in the agent:
//! - Kitchen tickets and receipts → comanda-agent
//!
//! ## Example
//!
//! ```ignore
//! use comanda_printer::{encode, DocumentBuilder, PrinterTransport, StrategyKind, Transport};
//!
//! let mut builder = DocumentBuilder::new(32);
//! builder.center();
//! builder.double_size();
//! builder.line("COCINA");
//! builder.reset_size();
//! builder.sep_double();
//! builder.left();
//! builder.line("Mesa 4");
//! builder.feed_and_cut(4);
//!
//! let transport = PrinterTransport::new(
//!     comanda_printer::default_spooler(),
//!     &StrategyKind::DEFAULT_ORDER,
//!     Duration::from_secs(8),
//! );
//! transport.send("TM-T20", &encode(&builder.build())).await?;
//! ```

mod document;
mod encoding;
mod error;
mod escpos;
pub mod transport;

// Re-exports
pub use document::{Align, Document, DocumentBuilder, FontSize, Instruction, RenderedLine};
pub use encoding::{
    encode_char, encode_text, normalize_newlines, pad_text, text_width, truncate_text, FieldAlign,
    ELLIPSIS,
};
pub use error::{PrintError, PrintResult};
pub use escpos::encode;
pub use transport::port::{PortInfo, PortKind};
pub use transport::spooler::{default_spooler, Spooler};
pub use transport::strategy::{DeliveryContext, DeliveryStrategy, StrategyKind};
pub use transport::{Delivery, PrinterTransport, StrategyFailure, Transport, TransportError};

#[cfg(not(windows))]
pub use transport::spooler::CupsSpooler;

#[cfg(windows)]
pub use transport::spooler::WindowsSpooler;
