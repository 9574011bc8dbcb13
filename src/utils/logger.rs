//! Run log: an actor appending timestamped lines to a size-rotated file.

use actix::prelude::*;
use chrono::Local;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One log line
pub struct LogMsg {
    pub level: LevelFilter,
    pub message: String,
}
impl Message for LogMsg { type Result = (); }

/// Flushes buffered lines to disk.
pub struct Flush;
impl Message for Flush { type Result = std::io::Result<()>; }

pub struct LoggerActor {
    writer: BufWriter<File>,
    level: LevelFilter,
    file_path: PathBuf,
    /// Rotate once the file grows past this many bytes
    max_size: u64,
    current_size: u64,
}

impl LoggerActor {
    pub fn new(file_path: impl AsRef<Path>, level: LevelFilter, max_size: u64) -> std::io::Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = Self::open(&file_path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            writer: BufWriter::new(file),
            level,
            file_path,
            max_size,
            current_size,
        })
    }

    fn open(path: &Path) -> std::io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.file_path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Moves the current file to `<name>.backup` and starts a fresh one.
    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        if self.current_size <= self.max_size {
            return Ok(());
        }
        self.writer.flush()?;
        let backup = self.backup_path();
        if backup.exists() {
            std::fs::remove_file(&backup)?;
        }
        std::fs::rename(&self.file_path, &backup)?;
        self.writer = BufWriter::new(Self::open(&self.file_path)?);
        self.current_size = 0;
        Ok(())
    }

    fn write_line(&mut self, level: LevelFilter, message: &str) -> std::io::Result<()> {
        if level > self.level {
            return Ok(());
        }
        let line = format!(
            "{} [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );
        self.rotate_if_needed()?;
        self.writer.write_all(line.as_bytes())?;
        self.current_size += line.len() as u64;
        if level <= LevelFilter::Warn {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl Actor for LoggerActor {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let _ = self.writer.flush();
    }
}

impl Handler<LogMsg> for LoggerActor {
    type Result = ();
    fn handle(&mut self, msg: LogMsg, _ctx: &mut Self::Context) {
        if let Err(e) = self.write_line(msg.level, &msg.message) {
            eprintln!("failed to write run log: {}", e);
        }
    }
}

impl Handler<Flush> for LoggerActor {
    type Result = std::io::Result<()>;
    fn handle(&mut self, _msg: Flush, _ctx: &mut Self::Context) -> Self::Result {
        self.writer.flush()
    }
}

/// Shorthands on the actor's address
pub trait LoggerExt {
    fn log_at(&self, level: LevelFilter, message: &str);

    fn info(&self, message: &str) {
        self.log_at(LevelFilter::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log_at(LevelFilter::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log_at(LevelFilter::Error, message);
    }

    fn debug(&self, message: &str) {
        self.log_at(LevelFilter::Debug, message);
    }
}

impl LoggerExt for Addr<LoggerActor> {
    fn log_at(&self, level: LevelFilter, message: &str) {
        self.do_send(LogMsg { level, message: message.to_string() });
    }
}
