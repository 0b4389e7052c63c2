//! Line sources and the cursor that serves lines to the sniffer and reader.
//!
//! A [`LineSource`] yields raw lines in order and may or may not be able to
//! start over. [`LineCursor`] numbers the lines, repositions on request and,
//! while retention is on, keeps the lines it served so a single-pass stream
//! can still be revisited after sniffing.

use crate::error::{Result, TabError};
use crate::io::compression;
use std::collections::VecDeque;
use std::io::{self, BufRead, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// An ordered supply of lines with an optional ability to restart.
pub trait LineSource {
    /// Next line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Reposition before the first line. Returns `false` if the source cannot.
    fn rewind(&mut self) -> io::Result<bool>;
}

fn read_trimmed<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    Ok(Some(line))
}

/// In-memory buffers, open files and anything else that can seek.
#[derive(Debug)]
pub struct SeekableSource<R> {
    inner: R,
}

impl<R: BufRead + Seek> SeekableSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead + Seek> LineSource for SeekableSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        read_trimmed(&mut self.inner)
    }

    fn rewind(&mut self) -> io::Result<bool> {
        self.inner.seek(SeekFrom::Start(0))?;
        Ok(true)
    }
}

/// Pipes, sockets and other single-pass input.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

impl<R: BufRead> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead> LineSource for StreamSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        read_trimmed(&mut self.inner)
    }

    fn rewind(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

/// A file on disk, possibly compressed. Rewinding reopens the file.
pub struct PathSource {
    path: PathBuf,
    inner: io::BufReader<Box<dyn io::Read>>,
}

impl PathSource {
    /// # Errors
    /// Fails when the file cannot be opened or decoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = compression::open_path(&path)?;
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for PathSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSource").field("path", &self.path).finish()
    }
}

impl LineSource for PathSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        read_trimmed(&mut self.inner)
    }

    fn rewind(&mut self) -> io::Result<bool> {
        self.inner = compression::open_path(&self.path).map_err(io::Error::other)?;
        Ok(true)
    }
}

/// Numbered, repositionable access to a [`LineSource`].
pub struct LineCursor {
    source: Box<dyn LineSource>,
    /// Index the source will assign to the next line it yields.
    next: usize,
    /// Lines served ahead of the source after a backward seek.
    pending: VecDeque<(usize, String)>,
    /// Contiguous run of served lines kept for replay.
    retained: Vec<(usize, String)>,
    retaining: bool,
}

impl std::fmt::Debug for LineCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineCursor")
            .field("position", &self.position())
            .field("retained", &self.retained.len())
            .field("retaining", &self.retaining)
            .finish()
    }
}

impl LineCursor {
    pub fn new(source: impl LineSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            next: 0,
            pending: VecDeque::new(),
            retained: Vec::new(),
            retaining: false,
        }
    }

    /// Index of the line the next call to [`next_line`](Self::next_line) returns.
    pub fn position(&self) -> usize {
        self.pending.front().map_or(self.next, |(i, _)| *i)
    }

    /// Next numbered line, or `None` at end of input.
    ///
    /// # Errors
    /// Propagates I/O failures from the source.
    pub fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        let item = match self.pending.pop_front() {
            Some(item) => Some(item),
            None => match self.source.read_line()? {
                Some(line) => {
                    let i = self.next;
                    self.next += 1;
                    Some((i, line))
                }
                None => None,
            },
        };
        if self.retaining
            && let Some((i, line)) = &item
            && self.retained.last().is_none_or(|(j, _)| j < i)
        {
            self.retained.push((*i, line.clone()));
        }
        Ok(item)
    }

    /// Start keeping served lines so they can be replayed later.
    pub fn retain(&mut self) {
        self.retained.clear();
        self.retaining = true;
    }

    /// Stop retaining and drop the replay window.
    pub fn release(&mut self) {
        self.retaining = false;
        self.retained.clear();
        self.retained.shrink_to_fit();
    }

    /// Move so that the next line served is `line`.
    ///
    /// Forward moves read and discard. Backward moves replay retained lines
    /// when they cover `line`, rewind the source otherwise.
    ///
    /// # Errors
    /// [`TabError::SourceExhausted`] when `line` is behind the cursor, outside
    /// the replay window and the source cannot rewind.
    pub fn seek(&mut self, line: usize) -> Result<()> {
        if line < self.position() {
            let covered = self.retained.first().is_some_and(|(first, _)| *first <= line);
            if covered {
                let mut replay: VecDeque<(usize, String)> = self
                    .retained
                    .iter()
                    .filter(|(i, _)| *i >= line)
                    .cloned()
                    .collect();
                let last = replay.back().map(|(i, _)| *i);
                replay.extend(self.pending.drain(..).filter(|(i, _)| last.is_none_or(|l| *i > l)));
                self.pending = replay;
            } else if self.source.rewind()? {
                log::trace!("rewound source to reach line {line}");
                self.pending.clear();
                self.next = 0;
            } else {
                return Err(TabError::SourceExhausted { line });
            }
        }
        while self.position() < line {
            if self.next_line()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Count every line in the source, then return to the current position.
    ///
    /// # Errors
    /// [`TabError::SourceExhausted`] for sources that cannot rewind.
    pub fn line_count(&mut self) -> Result<usize> {
        let here = self.position();
        if !self.source.rewind()? {
            return Err(TabError::SourceExhausted { line: 0 });
        }
        self.pending.clear();
        self.next = 0;
        let mut count = 0;
        while self.source.read_line()?.is_some() {
            count += 1;
        }
        self.source.rewind()?;
        self.next = 0;
        self.seek(here)?;
        Ok(count)
    }
}
