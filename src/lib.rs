//! # tabsniff
//!
//! A **delimited text reader** for files that were written for people rather
//! than parsers: free-form metadata above the table, a header that may or may
//! not be there, missing-value markers, the odd malformed line.
//!
//! ## Key Features
//!
//! - **Sniffing** - infer the dialect, metadata block, header and column types
//!   from a bounded sample
//! - **Casting** - turn cells into ints, floats, complex numbers, times, dates,
//!   datetimes or strings
//! - **Tabs** - declarative row filters (equality, membership, comparison,
//!   regex, arbitrary predicates) plus column projection
//! - **Chunked reads** - stream rows in fixed-size chunks from seekable files,
//!   compressed files or one-shot streams
//! - **Error log** - every cast failure, malformed line and ragged row is
//!   recorded, never silently dropped
//!
//! ## Quick Start
//!
//! ```
//! use std::io::Cursor;
//! use tabsniff::{CellValue, ReadOptions, Reader, Tab};
//!
//! # fn main() -> tabsniff::Result<()> {
//! let text = "\
//! Experiment: open field
//! Number,Start_Time,Annotation
//! 1,08:01:10,resting
//! 2,08:03:42,exploring
//! 3,08:05:19,grooming
//! ";
//! let mut reader = Reader::new(Cursor::new(text));
//! assert_eq!(reader.header()?.names, ["Number", "Start_Time", "Annotation"]);
//!
//! reader.tab("Annotation", Tab::equal("exploring"))?;
//! let rows: Vec<_> = reader
//!     .read(ReadOptions::default())?
//!     .collect::<tabsniff::Result<Vec<_>>>()?
//!     .concat();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get("Number"), Some(&CellValue::Int(2)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`reader`] - the [`Reader`] and its chunk iterator
//! - [`sniffer`] - metadata, header and type inference
//! - [`parsing`] - cell types, values and the caster
//! - [`tabs`] - row filters and column selection
//! - [`source`] - line sources and the repositionable cursor
//! - [`io`] - compression codecs for path-based reading
//! - [`errorlog`] - the per-reader log of recoverable errors
//! - [`testing`] - fixtures and assertions for tests

pub mod dialect;
pub mod error;
pub mod errorlog;
pub mod io;
pub mod parsing;
pub mod reader;
pub mod row;
pub mod sample;
pub mod sniffer;
pub mod source;
pub mod tabs;
pub mod testing;

pub use dialect::Dialect;
pub use error::{Result, TabError};
pub use errorlog::{ErrorKind, ErrorLog, LoggedError};
pub use parsing::{CastFailure, CellType, CellValue, Formats, cast, classify, convert};
pub use reader::{Chunks, HeaderSpec, MISSING, ReadOptions, Reader, ReaderConfig, ReaderState};
pub use row::Row;
pub use sample::{Sample, Skips};
pub use sniffer::{ColumnTypes, Header, Heuristic, MetaData, SniffConfig, Sniffer};
pub use source::{LineCursor, LineSource};
pub use tabs::{ColumnSelect, Comparison, Op, Tab, Tabulator};
