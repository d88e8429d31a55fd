//! Upload progress reporting.

use std::io::{self, Read};

/// Bytes sent so far out of the total request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole percentage, rounded; an empty body counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.loaded.min(self.total) * 100 + self.total / 2) / self.total;
        pct as u8
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

/// `Read` adapter that reports the running byte count after every
/// non-empty read.
pub struct ProgressReader<'a, R> {
    inner: R,
    loaded: u64,
    total: u64,
    on_progress: &'a mut dyn FnMut(UploadProgress),
}

impl<'a, R: Read> ProgressReader<'a, R> {
    pub fn new(inner: R, total: u64, on_progress: &'a mut dyn FnMut(UploadProgress)) -> Self {
        Self {
            inner,
            loaded: 0,
            total,
            on_progress,
        }
    }

    pub fn loaded(&self) -> u64 {
        self.loaded
    }
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.loaded += n as u64;
            (self.on_progress)(UploadProgress {
                loaded: self.loaded,
                total: self.total,
            });
        }
        Ok(n)
    }
}
