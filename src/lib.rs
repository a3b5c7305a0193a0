//! # voltage_cs104
//!
//! IEC 60870-5-104 link layer and ASDU codec for Rust.
//!
//! This crate implements the IEC 60870-5-104 telecontrol protocol used in
//! power systems and SCADA applications: APDU framing over TCP, the
//! sequence-numbered session with its k/w windows and t1/t2/t3 timers, and
//! the application layer (ASDU) encoding.
//!
//! ## Features
//!
//! - **Framing**: I-frames, S-frames, U-frames as a `tokio_util` codec
//! - **Session**: windowed send with back-pressure, acknowledgement timers,
//!   keep-alive test frames, callback dispatch from a single driver task
//! - **Sans-IO core**: [`session::core::Core`] runs the state machine with
//!   explicit time input, usable without a runtime
//! - **ASDU codec**: monitor, control, system and parameter type
//!   identifications with configurable field widths
//! - **Both ends**: [`client::dial`] for controlling stations, [`Server`]
//!   for controlled stations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use voltage_cs104::{client, parse_asdu, Asdu, Config, Params, QOI_STATION};
//!
//! #[tokio::main]
//! async fn main() -> voltage_cs104::Result<()> {
//!     let session = client::dial("192.168.1.100:2404", Params::WIDE, Config::default()).await?;
//!
//!     session.on_asdu(|asdu| {
//!         for point in parse_asdu(&asdu) {
//!             println!("IOA {}: {:?}", point.ioa, point.value);
//!         }
//!     })?;
//!
//!     // Start data transfer, then request general interrogation
//!     session.start_data_transfer().await?;
//!     session.send_asdu(&Asdu::interrogation_command(1, QOI_STATION)).await?;
//!
//!     session.wait_closed().await
//! }
//! ```
//!
//! ## Protocol Overview
//!
//! IEC 60870-5-104 uses TCP/IP for communication (default port 2404).
//! The protocol defines three frame types:
//!
//! - **I-frame**: Information transfer (contains ASDU)
//! - **S-frame**: Supervisory (acknowledgment)
//! - **U-frame**: Unnumbered (control: STARTDT, STOPDT, TESTFR)
//!
//! ### APDU Structure
//!
//! ```text
//! APCI (6 bytes):
//! +--------+--------+--------+--------+--------+--------+
//! | 0x68   | Length | Control Field (4 bytes)           |
//! +--------+--------+--------+--------+--------+--------+
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod parser;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types
pub use client::dial;
pub use codec::{Apdu, Iec104Codec};
pub use config::{
    Config, FloatByteOrder, Params, DEFAULT_K, DEFAULT_PORT, DEFAULT_T0, DEFAULT_T1, DEFAULT_T2,
    DEFAULT_T3, DEFAULT_W,
};
pub use error::{AbortReason, CodecError, FrameError, Iec104Error, Result};
pub use parser::{parse_asdu, parse_payload};
pub use server::Server;
pub use session::{Session, SessionBuilder, SessionState};
pub use types::*;
