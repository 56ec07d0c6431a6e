use std::cmp::min;
use std::fs::File;
use std::io;
use std::path::Path;

/// A subproduct file with positional read support.
///
/// Each call names its own offset, so the locator can check headers and scan
/// windows without tracking a file cursor.
pub trait Source {
    /// Reads bytes at `offset` into `buf`.
    ///
    /// Returns the number of bytes read. A short read means the end of the
    /// source was reached.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Reads exactly `buf.len()` bytes at `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut total = 0;

        while total < buf.len() {
            let n = self.read_at(offset + total as u64, &mut buf[total..])?;

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected EOF in subproduct",
                ));
            }

            total += n;
        }

        Ok(())
    }

    /// Returns the total length in bytes.
    fn len(&self) -> u64;

    /// Returns `true` if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A subproduct file opened from disk.
#[derive(Debug)]
pub struct SubproductFile {
    file: File,
    len: u64,
}

impl SubproductFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        Ok(Self { file, len })
    }
}

impl Source for SubproductFile {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(&self.file, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(&self.file, buf, offset)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

impl Source for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };

        if start >= <[u8]>::len(self) {
            return Ok(0);
        }

        let n = min(buf.len(), <[u8]>::len(self) - start);

        buf[..n].copy_from_slice(&self[start..start + n]);

        Ok(n)
    }

    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }
}

impl Source for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }

    fn len(&self) -> u64 {
        Source::len(self.as_slice())
    }
}
