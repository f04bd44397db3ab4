//! Reading a whole file into memory before parsing.

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

/// The complete contents of an input file.
pub enum Source {
    Owned(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mapped(Mmap),
}

impl Source {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let len = file.metadata()?.len() as usize;

        #[cfg(feature = "mmap")]
        {
            // Zero-length files cannot be mapped on every platform.
            if len > 0 {
                // SAFETY: the map is read-only and lives as long as the Source.
                let map = unsafe { Mmap::map(&file)? };
                return Ok(Source::Mapped(map));
            }
        }

        let mut buf = Vec::with_capacity(len);
        file.read_to_end(&mut buf)?;
        Ok(Source::Owned(buf))
    }

    pub fn len(&self) -> usize {
        (**self).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Source::Owned(buf) => buf,
            #[cfg(feature = "mmap")]
            Source::Mapped(map) => map,
        }
    }
}

impl AsRef<[u8]> for Source {
    fn as_ref(&self) -> &[u8] {
        self
    }
}
