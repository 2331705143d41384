use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::pending::Mutation;

/// One entry in the pending-mutation journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalRecord {
    Staged { ticket: Ulid, mutation: Mutation },
    Committed { ticket: Ulid },
    RolledBack { ticket: Ulid },
}

/// Encode a single record to [len][bincode][crc32] format.
fn encode_record(writer: &mut impl Write, record: &JournalRecord) -> io::Result<()> {
    let payload =
        bincode::serialize(record).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only journal of optimistic mutations.
///
/// Format per entry: `[u32: len][bincode: JournalRecord][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - A truncated or corrupt tail is discarded on replay.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Journal {
    /// Open (or create) the journal at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Append one record and fsync before returning.
    pub fn append(&mut self, record: &JournalRecord) -> io::Result<()> {
        encode_record(&mut self.writer, record)?;
        self.appends_since_compact += 1;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replace the journal with `records`: write a temp file, fsync, rename
    /// it over the journal and reopen.
    pub fn compact(&mut self, records: &[JournalRecord]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("journal.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for record in records {
                encode_record(&mut writer, record)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Read every valid record from disk. Stops at the first truncated or
    /// corrupt entry.
    pub fn replay(path: &Path) -> io::Result<Vec<JournalRecord>> {
        Ok(read_valid(path)?.0)
    }

    /// Replay, then cut the file back to the last valid record so later
    /// appends are not stranded behind a torn tail.
    pub fn recover(path: &Path) -> io::Result<Vec<JournalRecord>> {
        let (records, valid_len) = read_valid(path)?;
        match fs::metadata(path) {
            Ok(meta) if meta.len() > valid_len => {
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(records)
    }
}

/// Valid records and the byte length they occupy at the head of the file.
fn read_valid(path: &Path) -> io::Result<(Vec<JournalRecord>, u64)> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut valid_len = 0u64;

    loop {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
            Err(e) => return Err(e),
        }

        let mut crc_buf = [0u8; 4];
        match reader.read_exact(&mut crc_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
            Err(e) => return Err(e),
        }
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            break;
        }

        match bincode::deserialize::<JournalRecord>(&payload) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
        valid_len += 8 + len as u64;
    }

    Ok((records, valid_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::*;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("courtgrid_test_journal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn staged() -> JournalRecord {
        JournalRecord::Staged {
            ticket: Ulid::new(),
            mutation: Mutation::PlaceBlock(CalendarEvent {
                court_id: Ulid::new(),
                date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                span: Span::new(600, 660),
                kind: EventKind::Blocked {
                    id: Ulid::new(),
                    reason: BlockReason::PrivateEvent,
                    note: Some("club night".into()),
                },
            }),
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.journal");
        let first = staged();
        let ticket = match &first {
            JournalRecord::Staged { ticket, .. } => *ticket,
            _ => unreachable!(),
        };
        let records = vec![first, JournalRecord::Committed { ticket }];

        {
            let mut journal = Journal::open(&path).unwrap();
            for r in &records {
                journal.append(r).unwrap();
            }
            assert_eq!(journal.appends_since_compact(), 2);
        }

        assert_eq!(Journal::replay(&path).unwrap(), records);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.journal");
        let record = staged();
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.append(&record).unwrap();
        }
        // Partial second entry, as after a crash mid-write
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9u8, 0, 0, 0, 1, 2]).unwrap();
        }

        assert_eq!(Journal::replay(&path).unwrap(), vec![record]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.journal");
        assert!(Journal::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn replay_stops_at_bad_crc() {
        let path = tmp_path("bad_crc.journal");
        let record = JournalRecord::RolledBack { ticket: Ulid::new() };
        {
            let payload = bincode::serialize(&record).unwrap();
            let mut f = File::create(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }
        assert!(Journal::replay(&path).unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.journal");
        let live = staged();
        let later = staged();
        {
            let mut journal = Journal::open(&path).unwrap();
            for _ in 0..10 {
                let churn = staged();
                journal.append(&churn).unwrap();
            }
            journal.append(&live).unwrap();
            let before = fs::metadata(&path).unwrap().len();

            journal.compact(std::slice::from_ref(&live)).unwrap();
            assert_eq!(journal.appends_since_compact(), 0);
            let after = fs::metadata(&path).unwrap().len();
            assert!(after < before, "compacted journal should be smaller: {after} < {before}");

            journal.append(&later).unwrap();
        }

        assert_eq!(Journal::replay(&path).unwrap(), vec![live, later]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn recover_cuts_torn_tail() {
        let path = tmp_path("recover.journal");
        let first = staged();
        let second = staged();
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.append(&first).unwrap();
        }
        let valid = fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9u8, 0, 0, 0, 1, 2]).unwrap();
        }

        assert_eq!(Journal::recover(&path).unwrap(), vec![first.clone()]);
        assert_eq!(fs::metadata(&path).unwrap().len(), valid);

        // Records appended after recovery are readable again
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.append(&second).unwrap();
        }
        assert_eq!(Journal::replay(&path).unwrap(), vec![first, second]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn recover_nonexistent_file() {
        let path = tmp_path("recover_nonexistent.journal");
        assert!(Journal::recover(&path).unwrap().is_empty());
        assert!(!path.exists());
    }
}
