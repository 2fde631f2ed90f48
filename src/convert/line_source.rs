//! Lookahead line source
//!
//! Wraps a buffered reader with a FIFO pushback queue so the control-flow
//! translator can peek several lines ahead before deciding how to emit the
//! current one. Cached lines are always drained before a new physical line is
//! read, so downstream consumers see lines in exactly the original order.

use std::collections::VecDeque;
use std::io::BufRead;

pub struct LineSource<R: BufRead> {
    reader: R,
    cache: VecDeque<String>,
    finished: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            cache: VecDeque::new(),
            finished: false,
        }
    }

    /// Next line to process: the oldest cached line when any are cached,
    /// otherwise the next physical line. `None` at end of input.
    pub fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if let Some(line) = self.cache.pop_front() {
            return Ok(Some(line));
        }
        self.read_raw()
    }

    /// Ensure up to `count` lines are cached (fewer near end of input).
    pub fn fill(&mut self, count: usize) -> std::io::Result<()> {
        while self.cache.len() < count {
            match self.read_raw()? {
                Some(line) => self.cache.push_back(line),
                None => break,
            }
        }
        Ok(())
    }

    /// Look at a cached line without consuming it. Call [`Self::fill`] first.
    pub fn peek(&self, index: usize) -> Option<&str> {
        self.cache.get(index).map(String::as_str)
    }

    /// Consume the oldest cached line, if any.
    pub fn take_cached(&mut self) -> Option<String> {
        self.cache.pop_front()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn read_raw(&mut self) -> std::io::Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let mut buffer = String::new();
        if self.reader.read_line(&mut buffer)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        while buffer.ends_with('\n') || buffer.ends_with('\r') {
            buffer.pop();
        }
        Ok(Some(buffer))
    }
}
