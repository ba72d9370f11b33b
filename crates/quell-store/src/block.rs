//! Sample blocks and the on-disk block store

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};

/// Largest number of samples a single block holds.
pub const MAX_BLOCK_LEN: usize = 1 << 18;

/// One immutable run of samples
///
/// Blocks never change after creation; sequences share them by reference
/// count. Silence costs no storage, sealed appends live in memory until
/// spilled, and spilled blocks are raw little-endian f32 files.
#[derive(Clone)]
pub enum Block {
    /// `len` samples of silence
    Silent {
        /// Run length in samples
        len: usize,
    },
    /// Samples held in memory
    Mem(Arc<[f32]>),
    /// Samples in a store file
    File(Arc<FileBlock>),
}

impl Block {
    /// Samples in this block.
    pub fn len(&self) -> usize {
        match self {
            Block::Silent { len } => *len,
            Block::Mem(samples) => samples.len(),
            Block::File(file) => file.len,
        }
    }

    /// True when the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `out.len()` samples starting at `offset` into `out`.
    pub fn read(&self, offset: usize, out: &mut [f32]) -> StoreResult<()> {
        let block_len = self.len();
        if offset + out.len() > block_len {
            return Err(StoreError::ReadBeyondBlock {
                offset,
                len: out.len(),
                block_len,
            });
        }
        match self {
            Block::Silent { .. } => {
                out.fill(0.0);
                Ok(())
            }
            Block::Mem(samples) => {
                out.copy_from_slice(&samples[offset..offset + out.len()]);
                Ok(())
            }
            Block::File(file) => file.read(offset, out),
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Block::Silent { len } => write!(f, "Silent({len})"),
            Block::Mem(samples) => write!(f, "Mem({})", samples.len()),
            Block::File(file) => write!(f, "File({}, {:?})", file.len, file.path),
        }
    }
}

/// A sealed block backed by a raw f32 file
pub struct FileBlock {
    path: PathBuf,
    len: usize,
    file: Mutex<File>,
}

impl FileBlock {
    /// Open `path` as a block of `len` samples, checking the size on disk.
    pub fn open(path: PathBuf, len: usize) -> StoreResult<Self> {
        let file = File::open(&path)?;
        let expected = len as u64 * 4;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(StoreError::BlockFileMismatch {
                path: path.display().to_string(),
                expected,
                actual,
            });
        }
        Ok(Self {
            path,
            len,
            file: Mutex::new(file),
        })
    }

    /// Samples in this block.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File this block reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, offset: usize, out: &mut [f32]) -> StoreResult<()> {
        let mut bytes = vec![0u8; out.len() * 4];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset as u64 * 4))?;
            file.read_exact(&mut bytes)?;
        }
        for (sample, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }
}

/// Directory of sealed block files
///
/// Hands out monotonically numbered raw f32 files. Dropping the store does
/// not remove them; lifetime of the directory is the caller's business.
#[derive(Debug)]
pub struct BlockStore {
    dir: PathBuf,
    next_id: AtomicU64,
}

impl BlockStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next_id: AtomicU64::new(0),
        })
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `samples` as a new block file and return the sealed block.
    pub fn write_block(&self, samples: &[f32]) -> StoreResult<Block> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("block-{id:08}.qsb"));

        let mut writer = BufWriter::new(File::create(&path)?);
        for &sample in samples {
            writer.write_all(&sample.to_le_bytes())?;
        }
        writer.flush()?;

        Ok(Block::File(Arc::new(FileBlock::open(path, samples.len())?)))
    }
}
