//! The reader: lazy sniffing, header overrides, tab declaration and chunked reads.
//!
//! ## Lifecycle
//!
//! A [`Reader`] starts [`ReaderState::Unsniffed`]. The first call that needs
//! structure (header, metadata, types, tabs or a read) samples the source and
//! moves to `Sniffed`. [`Reader::read`] returns a [`Chunks`] iterator that
//! borrows the reader mutably, so nothing can reconfigure it mid-read. A read
//! that runs to the end leaves the reader `Exhausted`; starting another read
//! repositions the source (reseeking, reopening or replaying) and begins
//! again. Dropping a [`Chunks`] early returns the reader to `Sniffed`.
//!
//! ```no_run
//! use tabsniff::{Reader, ReadOptions, Tab};
//! # fn main() -> tabsniff::Result<()> {
//! let mut reader = Reader::from_path("trial.csv")?;
//! reader.tab("Annotation", Tab::equal("exploring"))?;
//! for chunk in reader.read(ReadOptions::default())? {
//!     for row in chunk? {
//!         println!("{}", serde_json::to_string(&row).unwrap_or_default());
//!     }
//! }
//! eprintln!("{}", reader.errors());
//! # Ok(())
//! # }
//! ```

use crate::dialect::{Dialect, Tokenizer};
use crate::error::{Result, TabError};
use crate::errorlog::ErrorLog;
use crate::parsing::{self, CellType, CellValue, Formats};
use crate::row::Row;
use crate::sample::Skips;
use crate::sniffer::{ColumnTypes, Header, MetaData, SniffConfig, Sniffer};
use crate::source::{LineCursor, LineSource, PathSource, SeekableSource, StreamSource};
use crate::tabs::{ColumnSelect, Compiled, Tab, Tabulator};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufRead, Seek};
use std::path::Path;
use std::sync::Arc;

/// Raw strings treated as missing values by default.
pub const MISSING: [&str; 8] = ["", "-", "NA", "N/A", "NaN", "nan", "null", "None"];

/// Reader settings. Every field has a default, so partial JSON configs load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Lexical dialect; guessed from the sample when absent.
    pub dialect: Option<Dialect>,
    pub sniff: SniffConfig,
    /// Number of trailing sampled data rows that vote on column types.
    pub poll: usize,
    /// Raw strings that do not vote on column types.
    pub exclude: Vec<String>,
    /// Default rows per chunk.
    pub chunksize: usize,
    pub formats: Formats,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            sniff: SniffConfig::default(),
            poll: 10,
            exclude: MISSING.iter().map(|s| s.to_string()).collect(),
            chunksize: 200_000,
            formats: Formats::standard(),
        }
    }
}

impl ReaderConfig {
    /// # Errors
    /// Fails on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json).context("parse reader config")?;
        Ok(config)
    }

    /// # Errors
    /// Fails when the file cannot be read or holds malformed JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parse reader config {}", path.display()))?;
        Ok(config)
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    #[must_use]
    pub fn with_sniff(mut self, sniff: SniffConfig) -> Self {
        self.sniff = sniff;
        self
    }

    #[must_use]
    pub fn with_poll(mut self, poll: usize) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub fn with_exclude<S: Into<String>>(mut self, exclude: impl IntoIterator<Item = S>) -> Self {
        self.exclude = exclude.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_chunksize(mut self, chunksize: usize) -> Self {
        self.chunksize = chunksize;
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.formats = formats;
        self
    }
}

/// How the reader names its columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderSpec {
    /// Use the sniffed header.
    #[default]
    Sniffed,
    /// Use this source line as the header; lines above it are metadata.
    Line(usize),
    /// Use these names; their count must match the sniffed column count.
    Names(Vec<String>),
    /// Positional names `Column_0..`.
    Generic,
}

/// Per-read parameters. Unset fields fall back to the sniffed structure and
/// the reader config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// First line to read; requires an explicit header.
    pub start: Option<usize>,
    /// Lines to leave out; defaults to the sniff config's skips.
    pub skips: Option<Skips>,
    /// Only these lines are read.
    pub indices: Option<BTreeSet<usize>>,
    pub chunksize: Option<usize>,
}

impl ReadOptions {
    #[must_use]
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn with_skips(mut self, skips: impl Into<Skips>) -> Self {
        self.skips = Some(skips.into());
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices = Some(indices.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_chunksize(mut self, chunksize: usize) -> Self {
        self.chunksize = Some(chunksize);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unsniffed,
    Sniffed,
    Reading,
    Exhausted,
}

#[derive(Debug, Clone)]
struct Resolved {
    header: Header,
    metadata: MetaData,
    data_start: usize,
}

/// Sniffs, types, filters and reads one delimited source.
pub struct Reader {
    cursor: LineCursor,
    config: ReaderConfig,
    state: ReaderState,
    sniffer: Option<Sniffer>,
    header_spec: HeaderSpec,
    resolved: Option<Resolved>,
    tabulator: Option<Tabulator>,
    errors: ErrorLog,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("header_spec", &self.header_spec)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

impl Reader {
    /// A reader over a seekable stream such as a file or an in-memory buffer.
    pub fn new<R: BufRead + Seek + 'static>(inner: R) -> Self {
        Self::with_cursor(LineCursor::new(SeekableSource::new(inner)))
    }

    /// A reader over a single-pass stream.
    ///
    /// Lines consumed while sniffing are kept so the first read can replay
    /// them; reads that need lines outside that window fail with
    /// [`TabError::SourceExhausted`].
    pub fn from_stream<R: BufRead + 'static>(inner: R) -> Self {
        Self::from_source(StreamSource::new(inner))
    }

    /// A reader over a file, decompressing by extension or magic bytes.
    ///
    /// # Errors
    /// Fails when the file cannot be opened or decoded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_cursor(LineCursor::new(PathSource::open(path)?)))
    }

    /// A reader over any [`LineSource`], retaining sniffed lines for replay.
    pub fn from_source(source: impl LineSource + 'static) -> Self {
        let mut cursor = LineCursor::new(source);
        cursor.retain();
        Self::with_cursor(cursor)
    }

    fn with_cursor(cursor: LineCursor) -> Self {
        Self {
            cursor,
            config: ReaderConfig::default(),
            state: ReaderState::Unsniffed,
            sniffer: None,
            header_spec: HeaderSpec::Sniffed,
            resolved: None,
            tabulator: None,
            errors: ErrorLog::new(),
        }
    }

    /// Replace the configuration, discarding anything sniffed so far.
    #[must_use]
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self.invalidate();
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = Some(dialect);
        self.invalidate();
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    fn invalidate(&mut self) {
        self.sniffer = None;
        self.resolved = None;
        self.tabulator = None;
        self.state = ReaderState::Unsniffed;
    }

    /// Resample with new sniffing parameters on next use.
    ///
    /// Cached header, metadata and types are discarded and declared tabs are
    /// cleared; a header override is kept.
    pub fn set_sniff(&mut self, sniff: SniffConfig) {
        log::debug!("sniff config changed to {sniff:?}");
        self.config.sniff = sniff;
        self.invalidate();
    }

    /// The sniffer, sampling the source on first use.
    ///
    /// # Errors
    /// Sampling failures and [`TabError::EmptySource`].
    pub fn sniffer(&mut self) -> Result<&Sniffer> {
        if self.sniffer.is_none() {
            let sniffer = Sniffer::new(
                &mut self.cursor,
                self.config.sniff.clone(),
                self.config.dialect,
                &self.config.formats,
                &self.config.exclude,
            )?;
            self.sniffer = Some(sniffer);
            self.state = ReaderState::Sniffed;
        }
        self.sniffer.as_ref().ok_or(TabError::EmptySource)
    }

    /// # Errors
    /// See [`sniffer`](Self::sniffer).
    pub fn dialect(&mut self) -> Result<Dialect> {
        Ok(self.sniffer()?.dialect())
    }

    fn resolved(&mut self) -> Result<&Resolved> {
        if self.resolved.is_none() {
            let spec = self.header_spec.clone();
            let resolved = self.resolve(&spec)?;
            self.resolved = Some(resolved);
        }
        self.resolved.as_ref().ok_or(TabError::EmptySource)
    }

    fn resolve(&mut self, spec: &HeaderSpec) -> Result<Resolved> {
        let sniffer = self.sniffer()?;
        let sniffed = Resolved {
            header: sniffer.header().clone(),
            metadata: sniffer.metadata().clone(),
            data_start: sniffer.data_start(),
        };
        let width = sniffer.width();
        let dialect = sniffer.dialect();
        match spec {
            HeaderSpec::Sniffed => Ok(sniffed),
            HeaderSpec::Generic => Ok(Resolved {
                header: Header::generic(width),
                ..sniffed
            }),
            HeaderSpec::Names(names) => {
                if names.len() != width {
                    return Err(TabError::HeaderLength {
                        expected: width,
                        got: names.len(),
                    });
                }
                Ok(Resolved {
                    header: Header::new(None, names.as_slice(), None),
                    ..sniffed
                })
            }
            HeaderSpec::Line(n) => self.header_from_line(*n, dialect.tokenizer()),
        }
    }

    fn header_from_line(&mut self, n: usize, tokenizer: Tokenizer) -> Result<Resolved> {
        self.cursor.seek(0)?;
        let mut above = Vec::with_capacity(n);
        loop {
            let Some((line, raw)) = self.cursor.next_line()? else {
                return Err(TabError::SourceExhausted { line: n });
            };
            if line < n {
                above.push(raw);
                continue;
            }
            let cells = tokenizer.split(&raw).unwrap_or_else(|bad| bad.cells);
            let metadata = if n == 0 {
                MetaData::empty(0)
            } else {
                MetaData {
                    lines: 0..n,
                    string: Some(above.join("\n")),
                }
            };
            return Ok(Resolved {
                header: Header::new(Some(n), cells.as_slice(), Some(raw)),
                metadata,
                data_start: n + 1,
            });
        }
    }

    /// Override how columns are named.
    ///
    /// Declared tabs and column selections are cleared.
    ///
    /// # Errors
    /// [`TabError::HeaderLength`] when explicit names do not match the sniffed
    /// column count; [`TabError::SourceExhausted`] when a header line cannot
    /// be reached. The previous header stays in effect on error.
    pub fn set_header(&mut self, spec: HeaderSpec) -> Result<()> {
        let resolved = self.resolve(&spec)?;
        log::debug!("header set to {:?}", resolved.header.names);
        self.header_spec = spec;
        self.resolved = Some(resolved);
        self.tabulator = None;
        Ok(())
    }

    pub fn header_spec(&self) -> &HeaderSpec {
        &self.header_spec
    }

    /// # Errors
    /// See [`sniffer`](Self::sniffer).
    pub fn header(&mut self) -> Result<&Header> {
        Ok(&self.resolved()?.header)
    }

    /// # Errors
    /// See [`sniffer`](Self::sniffer).
    pub fn metadata(&mut self) -> Result<&MetaData> {
        Ok(&self.resolved()?.metadata)
    }

    /// First line of the data section.
    ///
    /// # Errors
    /// See [`sniffer`](Self::sniffer).
    pub fn data_start(&mut self) -> Result<usize> {
        Ok(self.resolved()?.data_start)
    }

    /// Column types voted by the configured poll, sized to the header.
    ///
    /// # Errors
    /// See [`sniffer`](Self::sniffer).
    pub fn types(&mut self) -> Result<ColumnTypes> {
        let width = self.resolved()?.header.len();
        let (poll, exclude) = (self.config.poll, self.config.exclude.clone());
        let mut types = self.sniffer()?.types(poll, &exclude);
        types.types.resize(width, CellType::Str);
        types.mixed.resize(width, false);
        Ok(types)
    }

    fn tabulator(&mut self) -> Result<&mut Tabulator> {
        if self.tabulator.is_none() {
            let header = self.header()?.clone();
            self.tabulator = Some(Tabulator::new(&header));
        }
        self.tabulator.as_mut().ok_or(TabError::EmptySource)
    }

    /// Bind a tab to a column, replacing an earlier tab on the same column.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] when `column` is not in the header.
    pub fn tab(&mut self, column: &str, tab: Tab) -> Result<()> {
        self.tabulator()?.tab(column, tab)
    }

    /// Bind several tabs; none are bound if any column is unknown.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] for the first unknown column.
    pub fn tabs<S: AsRef<str>>(&mut self, tabs: impl IntoIterator<Item = (S, Tab)>) -> Result<()> {
        self.tabulator()?.tab_all(tabs)
    }

    /// Restrict emitted rows to the chosen columns.
    ///
    /// # Errors
    /// [`TabError::UnknownColumn`] for columns absent from the header.
    pub fn select<C: Into<ColumnSelect>>(&mut self, columns: impl IntoIterator<Item = C>) -> Result<()> {
        self.tabulator()?.select(columns.into_iter().map(Into::into))
    }

    /// Drop all tabs and the column selection.
    pub fn clear_tabs(&mut self) {
        if let Some(t) = self.tabulator.as_mut() {
            t.clear();
        }
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Total number of lines in the source.
    ///
    /// # Errors
    /// [`TabError::SourceExhausted`] for single-pass sources.
    pub fn line_count(&mut self) -> Result<usize> {
        self.cursor.line_count()
    }

    /// Start a chunked read of the data section.
    ///
    /// # Errors
    /// - [`TabError::InvalidChunksize`] for a chunk size of zero
    /// - [`TabError::HeaderRequired`] for an explicit start without an
    ///   explicit header
    /// - [`TabError::SourceExhausted`] when a single-pass source has already
    ///   moved past the start line
    ///
    /// A start beyond the last line is not an error: the read yields one
    /// empty chunk.
    pub fn read(&mut self, options: ReadOptions) -> Result<Chunks<'_>> {
        self.start_read(options, None, false)
    }

    /// The first `n` rows a default read would produce.
    ///
    /// On single-pass sources the lines consumed stay available to a later read.
    ///
    /// # Errors
    /// As for [`read`](Self::read).
    pub fn peek(&mut self, n: usize) -> Result<Vec<Row>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let options = ReadOptions::default().with_chunksize(n);
        let rows = {
            let mut chunks = self.start_read(options, Some(n), true)?;
            chunks.next_chunk()?.unwrap_or_default()
        };
        self.state = ReaderState::Sniffed;
        Ok(rows)
    }

    fn start_read(&mut self, options: ReadOptions, limit: Option<usize>, keep_window: bool) -> Result<Chunks<'_>> {
        let chunksize = options.chunksize.unwrap_or(self.config.chunksize);
        if chunksize == 0 {
            return Err(TabError::InvalidChunksize(chunksize));
        }
        if let Some(start) = options.start
            && self.header_spec == HeaderSpec::Sniffed
        {
            return Err(TabError::HeaderRequired { start });
        }

        let dialect = self.dialect()?;
        let data_start = self.data_start()?;
        let header = self.header()?.clone();
        let types = self.types()?;
        self.tabulator()?;
        let compiled = match &self.tabulator {
            Some(t) => t.compile(&types, &self.config.formats),
            None => Tabulator::new(&header).compile(&types, &self.config.formats),
        };

        let start = options
            .start
            .or_else(|| options.indices.as_ref().and_then(|ix| ix.first().copied()))
            .unwrap_or(data_start);
        let last = options.indices.as_ref().and_then(|ix| ix.last().copied());
        let skips = options.skips.unwrap_or_else(|| self.config.sniff.skips.clone());

        self.cursor.seek(start)?;
        if !keep_window {
            self.cursor.release();
        }
        self.state = ReaderState::Reading;
        log::debug!(
            "reading from line {start} in chunks of {chunksize}; types {:?}",
            types.types
        );

        let width = header.len();
        let targets = types
            .types
            .iter()
            .enumerate()
            .map(|(i, ty)| (!types.is_mixed(i)).then_some(*ty))
            .collect();
        Ok(Chunks {
            reader: self,
            names: header.names.into(),
            width,
            targets,
            hints: vec![None; width],
            compiled,
            tokenizer: dialect.tokenizer(),
            skips,
            indices: options.indices,
            last,
            chunksize,
            limit,
            yielded: 0,
            scanned: 0,
            emitted: 0,
            done: false,
        })
    }
}

/// Pull iterator over the chunks of one read.
///
/// Every chunk but the last holds exactly `chunksize` rows. A read always
/// yields at least one chunk, possibly empty.
pub struct Chunks<'a> {
    reader: &'a mut Reader,
    names: Arc<[String]>,
    width: usize,
    /// Cast target per column; `None` tries every type.
    targets: Vec<Option<CellType>>,
    hints: Vec<Option<usize>>,
    compiled: Compiled,
    tokenizer: Tokenizer,
    skips: Skips,
    indices: Option<BTreeSet<usize>>,
    last: Option<usize>,
    chunksize: usize,
    limit: Option<usize>,
    yielded: usize,
    scanned: usize,
    emitted: usize,
    done: bool,
}

impl Chunks<'_> {
    /// Next chunk, or `None` once the read is finished.
    ///
    /// # Errors
    /// I/O failures from the source; the read ends after one.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<Row>>> {
        if self.done {
            return Ok(None);
        }
        let mut chunk = Vec::with_capacity(self.chunksize.min(4096));
        loop {
            let capped = self.limit.is_some_and(|l| self.emitted >= l);
            let past_last = self.last.is_some_and(|l| self.reader.cursor.position() > l);
            if capped || past_last {
                return Ok(self.finish(chunk));
            }
            let next = match self.reader.cursor.next_line() {
                Ok(next) => next,
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            };
            let Some((line, raw)) = next else {
                return Ok(self.finish(chunk));
            };
            if self.skips.contains(line)
                || self.indices.as_ref().is_some_and(|ix| !ix.contains(&line))
                || raw.trim().is_empty()
            {
                continue;
            }
            self.scanned += 1;
            if let Some(row) = self.process(line, &raw) {
                chunk.push(row);
                self.emitted += 1;
                if chunk.len() == self.chunksize {
                    self.yielded += 1;
                    log::trace!("chunk {} ready at line {line}", self.yielded);
                    return Ok(Some(chunk));
                }
            }
        }
    }

    fn finish(&mut self, chunk: Vec<Row>) -> Option<Vec<Row>> {
        self.done = true;
        self.reader.state = ReaderState::Exhausted;
        log::info!(
            "read finished: {} lines scanned, {} rows kept, {} errors logged",
            self.scanned,
            self.emitted,
            self.reader.errors.len()
        );
        if chunk.is_empty() && self.yielded > 0 {
            return None;
        }
        self.yielded += 1;
        Some(chunk)
    }

    fn process(&mut self, line: usize, raw: &str) -> Option<Row> {
        let reader = &mut *self.reader;
        let cells = match self.tokenizer.split(raw) {
            Ok(cells) => cells,
            Err(bad) => {
                log::warn!("line {line} is malformed: {}", bad.reason);
                reader.errors.malformed(line, raw, bad.reason);
                bad.cells
            }
        };
        if cells.len() != self.width {
            reader.errors.ragged(
                line,
                raw,
                format!("expected {} cells, found {}", self.width, cells.len()),
            );
        }

        let mut values = Vec::with_capacity(self.width);
        for (i, name) in self.names.iter().enumerate() {
            let Some(cell) = cells.get(i) else {
                values.push(None);
                continue;
            };
            let value = match self.targets[i] {
                Some(_) if reader.config.exclude.iter().any(|m| m == cell) => CellValue::Str(cell.clone()),
                None => parsing::convert(cell, &reader.config.formats),
                Some(ty) => parsing::cast_hinted(cell, ty, &reader.config.formats, &mut self.hints[i])
                    .unwrap_or_else(|failure| {
                        reader.errors.cast(line, name, cell, failure.reason);
                        CellValue::Str(cell.clone())
                    }),
            };
            values.push(Some(value));
        }

        let row = Row::new(line, Arc::clone(&self.names), values);
        if !self.compiled.accepts(&cells, &row) {
            return None;
        }
        Some(self.compiled.project(row))
    }
}

impl Iterator for Chunks<'_> {
    type Item = Result<Vec<Row>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl Drop for Chunks<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.reader.state = ReaderState::Sniffed;
        }
    }
}

