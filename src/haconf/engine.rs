//! Public parser engine
//!
//! [`ConfigParser`] is the entry point: it parses text into the section registry,
//! exposes the accessor API over it and renders it back. One `parking_lot` mutex
//! guards the registry, so an engine can be shared between threads; every public
//! method takes the lock for its whole duration.
//!
//! ```text
//! let parser = ConfigParser::new(Options::default());
//! parser.load_data("global\n  daemon\n")?;
//! parser.insert(SectionKind::Global, "", "maxconn", Record::int(4096), None)?;
//! parser.save("/etc/haproxy/haproxy.cfg")?;
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::haconf::directive::{Data, Record, ResultLine};
use crate::haconf::error::{Error, Result};
use crate::haconf::options::Options;
use crate::haconf::processing;
use crate::haconf::registry::Registry;
use crate::haconf::section::SectionKind;
use crate::haconf::writer;

/// HAProxy configuration parser and writer
pub struct ConfigParser {
    options: Options,
    registry: Mutex<Registry>,
}

impl ConfigParser {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            registry: Mutex::new(Registry::new(options)),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the whole configuration with the text read from `reader`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. Lines no parser accepts never
    /// fail the call.
    pub fn process<R: Read>(&self, mut reader: R) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);

        let mut registry = self.registry.lock();
        registry.reset();
        processing::process(&mut registry, text.lines());
        debug!(bytes = bytes.len(), "configuration parsed");
        Ok(())
    }

    pub fn load_data(&self, data: &str) -> Result<()> {
        self.process(data.as_bytes())
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path.as_ref())?;
        self.process(BufReader::new(file))
    }

    pub fn get(&self, kind: SectionKind, section: &str, keyword: &str) -> Result<Data> {
        self.registry.lock().get(kind, section, keyword)
    }

    pub fn get_one(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
        index: usize,
    ) -> Result<Record> {
        self.registry.lock().get_one(kind, section, keyword, index)
    }

    /// The lines one directive renders to, without indentation
    pub fn get_result(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
    ) -> Result<Vec<ResultLine>> {
        self.registry.lock().get_result(kind, section, keyword)
    }

    pub fn get_pre_comments(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
    ) -> Result<Vec<String>> {
        self.registry.lock().get_pre_comments(kind, section, keyword)
    }

    /// Replace a directive's data; `None` clears it (or the entry at `index`)
    pub fn set(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
        data: Option<Data>,
        index: Option<usize>,
    ) -> Result<()> {
        self.registry.lock().set(kind, section, keyword, data, index)
    }

    pub fn set_pre_comments(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
        comments: Vec<String>,
    ) -> Result<()> {
        self.registry
            .lock()
            .set_pre_comments(kind, section, keyword, comments)
    }

    pub fn delete(&self, kind: SectionKind, section: &str, keyword: &str, index: usize) -> Result<()> {
        self.registry
            .lock()
            .delete_entry(kind, section, keyword, index)
    }

    pub fn insert(
        &self,
        kind: SectionKind,
        section: &str,
        keyword: &str,
        record: Record,
        index: Option<usize>,
    ) -> Result<()> {
        self.registry
            .lock()
            .insert(kind, section, keyword, record, index)
    }

    pub fn has_parser(&self, kind: SectionKind, keyword: &str) -> bool {
        self.registry.lock().has_parser(kind, keyword)
    }

    pub fn sections_get(&self, kind: SectionKind) -> Vec<String> {
        self.registry.lock().names(kind)
    }

    pub fn sections_create(&self, kind: SectionKind, name: &str) -> Result<()> {
        self.registry.lock().create(kind, name)
    }

    pub fn sections_delete(&self, kind: SectionKind, name: &str) -> Result<()> {
        self.registry.lock().delete(kind, name)
    }

    pub fn sections_defaults_from_get(&self, kind: SectionKind, name: &str) -> Result<Option<String>> {
        self.registry.lock().defaults_from_get(kind, name)
    }

    /// Set or clear (`None` or `Some("")`) a section's `from` clause
    pub fn sections_defaults_from_set(
        &self,
        kind: SectionKind,
        name: &str,
        from: Option<&str>,
    ) -> Result<()> {
        self.registry.lock().defaults_from_set(kind, name, from)
    }

    /// Text prefixed with `# _md5hash=<hex>` of the rest. The hash is stored, so plain
    /// renders afterwards carry the same header.
    pub fn string_with_hash(&self) -> String {
        writer::render_with_hash(&mut self.registry.lock())
    }

    fn render(&self) -> String {
        if self.options.use_md5_hash {
            self.string_with_hash()
        } else {
            writer::render(&self.registry.lock(), false)
        }
    }

    /// Write the rendered text to `path` atomically, under an advisory lock on
    /// `<path>.lock`.
    ///
    /// A failed write wins over a failed unlock; an unlock failure alone comes back as
    /// [`Error::Unlock`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.render();

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        FileExt::lock_exclusive(&lock)?;

        let written = write_atomically(path, &text);
        let unlocked = FileExt::unlock(&lock);
        written?;
        unlocked.map_err(Error::Unlock)?;

        info!(path = %path.display(), bytes = text.len(), "configuration saved");
        Ok(())
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl fmt::Display for ConfigParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for ConfigParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigParser")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

fn write_atomically(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
