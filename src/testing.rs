//! Testing utilities for code that reads delimited files.
//!
//! - **Fixtures**: build metadata / header / data texts with [`DsvFixture`]
//! - **Mock I/O**: put fixture text into temporary files with [`write_temp`]
//! - **Assertions**: compare rows and check chunk shapes
//!
//! # Quick Start
//!
//! ```
//! use std::io::Cursor;
//! use tabsniff::testing::*;
//! use tabsniff::{ReadOptions, Reader};
//!
//! # fn main() -> tabsniff::Result<()> {
//! let fixture = annotations_fixture();
//! let mut reader = Reader::new(Cursor::new(fixture.build()));
//! let chunks: Vec<_> = reader
//!     .read(ReadOptions::default().with_chunksize(2))?
//!     .collect::<tabsniff::Result<_>>()?;
//! assert_chunk_sizes(&chunks, 2);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use mock_io::*;
