use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use crate::encoder::{EncodedState, STATE_LEN};
use super::ExperienceRecord;

pub const PIECE_MAGIC: &[u8; 8] = b"PIEMEMP1"; // one rotating piece
pub const RING_MAGIC: &[u8; 8] = b"PIEMEMR1"; // ring-buffer snapshot
pub const PAGED_MAGIC: &[u8; 8] = b"PIEMEMT1"; // tiered snapshot

// Record layout (LE): u16 fen_len, fen bytes, f32 reward, i8 state[384]
pub fn write_record<W: Write>(w: &mut W, rec: &ExperienceRecord) -> Result<()> {
    let fen = rec.fen.as_bytes();
    let len = u16::try_from(fen.len()).context("fen longer than 65535 bytes")?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(fen)?;
    w.write_all(&rec.reward.to_le_bytes())?;
    let mut buf = [0u8; STATE_LEN];
    for (b, v) in buf.iter_mut().zip(rec.state.0.iter()) { *b = (*v as i8) as u8; }
    w.write_all(&buf)?;
    Ok(())
}

pub fn read_record<R: Read>(r: &mut R) -> Result<ExperienceRecord> {
    let mut b2 = [0u8; 2];
    r.read_exact(&mut b2).context("read fen length")?;
    let mut fen = vec![0u8; u16::from_le_bytes(b2) as usize];
    r.read_exact(&mut fen).context("read fen")?;
    let fen = String::from_utf8(fen).context("fen is not utf-8")?;
    let mut b4 = [0u8; 4];
    r.read_exact(&mut b4).context("read reward")?;
    let reward = f32::from_le_bytes(b4);
    let mut buf = [0u8; STATE_LEN];
    r.read_exact(&mut buf).context("read state")?;
    let mut state = EncodedState::zeros();
    for (v, b) in state.0.iter_mut().zip(buf.iter()) { *v = *b as i8 as f32; }
    Ok(ExperienceRecord { state, fen, reward })
}

pub fn write_section<W: Write>(w: &mut W, recs: &[ExperienceRecord]) -> Result<()> {
    w.write_all(&(recs.len() as u64).to_le_bytes())?;
    for rec in recs { write_record(w, rec)?; }
    Ok(())
}

pub fn read_section<R: Read>(r: &mut R) -> Result<Vec<ExperienceRecord>> {
    let mut b8 = [0u8; 8];
    r.read_exact(&mut b8).context("read record count")?;
    let n = u64::from_le_bytes(b8) as usize;
    let mut out = Vec::with_capacity(n.min(1 << 20));
    for i in 0..n {
        out.push(read_record(r).with_context(|| format!("record {i} of {n}"))?);
    }
    Ok(out)
}

pub fn read_magic<R: Read>(r: &mut R, magic: &[u8; 8]) -> Result<()> {
    let mut got = [0u8; 8];
    r.read_exact(&mut got).context("read magic")?;
    if &got != magic { bail!("bad magic: expected {:?}", String::from_utf8_lossy(magic)); }
    Ok(())
}

/// Write through a `.tmp` sibling and rename into place so an interrupted
/// write never leaves a truncated file under the final name.
pub fn write_atomic<P, F>(path: P, body: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
        }
    }
    let tmp = tmp_path(path);
    let written = (|| -> Result<()> {
        let f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::new(f);
        body(&mut w).with_context(|| format!("write {}", tmp.display()))?;
        w.flush()?;
        w.get_ref().sync_all()?;
        drop(w);
        fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
    })();
    if written.is_err() {
        // Never leave a half-written sibling behind; the final name is untouched.
        let _ = fs::remove_file(&tmp);
    }
    written
}

pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(f))
}

pub fn write_records<P: AsRef<Path>>(path: P, magic: &[u8; 8], recs: &[ExperienceRecord]) -> Result<()> {
    write_atomic(path, |w| {
        w.write_all(magic)?;
        write_section(w, recs)
    })
}

pub fn read_records<P: AsRef<Path>>(path: P, magic: &[u8; 8]) -> Result<Vec<ExperienceRecord>> {
    let path = path.as_ref();
    let mut r = open_reader(path)?;
    read_magic(&mut r, magic).with_context(|| format!("{}", path.display()))?;
    read_section(&mut r).with_context(|| format!("{}", path.display()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
