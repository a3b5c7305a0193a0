//! IEC 60870-5-104 type definitions.
//!
//! This module contains all the core types for the IEC 104 protocol:
//!
//! - `Apci` - Application Protocol Control Information and sequence arithmetic
//! - `TypeId` - Type identification (M_SP_NA_1, etc.)
//! - `Cot` - Cause of transmission
//! - `Element` - Information element payloads and quality descriptors
//! - `Cp56Time2a` / `Cp24Time2a` / `Cp16Time2a` - Binary time tags
//! - `Asdu` - Application Service Data Unit
//! - `DataPoint` - Unified data point structure

mod apci;
mod asdu;
mod cot;
mod data;
mod element;
mod reader;
mod time;
mod type_id;

pub use apci::*;
pub use asdu::*;
pub use cot::*;
pub use data::*;
pub use element::*;
pub use time::*;
pub use type_id::*;
