//! Bag composition: writing payloads, tag files, and manifests.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use filetime::FileTime;
use jiff::Zoned;
use tracing::info;

use crate::bagfile::BagItFile;
use crate::config::EngineConfig;
use crate::digest::{Algorithm, HasherSet};
use crate::errors::BagError;
use crate::events::{BagObserver, TaskEvent, TaskKind};
use crate::kv::KeyValueCollection;
use crate::profile::{Profile, BAGIT_TXT, BAG_INFO_TXT};
use crate::validator::{ValidationReport, Validator};

/// One payload source: an absolute path and its destination inside the bag.
#[derive(Debug, Clone)]
pub struct BagSource {
    pub source: PathBuf,
    /// Destination path relative to the payload directory (a `data/` prefix
    /// is accepted and normalized away).
    pub rel_path: String,
}

impl BagSource {
    pub fn new(source: impl Into<PathBuf>, rel_path: impl Into<String>) -> Self {
        BagSource {
            source: source.into(),
            rel_path: rel_path.into(),
        }
    }

    fn payload_path(&self) -> String {
        let rel = self.rel_path.trim_start_matches('/');
        if rel.starts_with("data/") {
            rel.to_string()
        } else {
            format!("data/{rel}")
        }
    }
}

/// Result of a completed bagging run. A bag only counts as written once
/// every output is finalized.
#[derive(Debug)]
pub struct BagOutcome {
    pub bag_path: PathBuf,
    pub payload_bytes: u64,
    pub payload_files: u64,
    pub files_written: u64,
    /// Manifest and tag manifest names emitted, in write order.
    pub manifests: Vec<String>,
}

/// Pick the digest algorithms for payload manifests when the profile does
/// not pin them down.
pub fn choose_algorithms(profile: &Profile) -> BTreeSet<Algorithm> {
    let both: BTreeSet<Algorithm> = profile
        .manifests_required
        .intersection(&profile.tag_manifests_required)
        .copied()
        .collect();
    if !both.is_empty() {
        return both;
    }
    if !profile.manifests_required.is_empty() {
        return profile.manifests_required.clone();
    }
    if !profile.tag_manifests_required.is_empty() {
        return profile.tag_manifests_required.clone();
    }
    if let Some(best) = Algorithm::strongest_of(&profile.manifests_allowed) {
        return BTreeSet::from([best]);
    }
    BTreeSet::from([Algorithm::Sha512])
}

/// Tags filled in by the bagger itself.
const AUTO_TAGS: [&str; 4] = ["Payload-Oxum", "Bagging-Date", "Bagging-Software", "Bag-Size"];

/// Builds a bag into a directory or a tar archive.
pub struct Bagger<'a> {
    profile: &'a Profile,
    config: &'a EngineConfig,
    observer: &'a dyn BagObserver,
}

impl<'a> Bagger<'a> {
    pub fn new(profile: &'a Profile, config: &'a EngineConfig, observer: &'a dyn BagObserver) -> Self {
        Bagger {
            profile,
            config,
            observer,
        }
    }

    /// Write the bag and self-check the result with the same profile.
    pub fn write_validated(
        &self,
        output: &Path,
        sources: &[BagSource],
    ) -> Result<(BagOutcome, ValidationReport), BagError> {
        let outcome = self.write(output, sources)?;
        let report = Validator::new(self.profile, self.config, self.observer).validate(output);
        Ok((outcome, report))
    }

    /// Write the bag: payloads, tag files, manifests, tag manifests.
    pub fn write(&self, output: &Path, sources: &[BagSource]) -> Result<BagOutcome, BagError> {
        self.check_required_tags()?;

        let payload_algorithms = if self.profile.manifests_required.is_empty() {
            choose_algorithms(self.profile)
        } else {
            self.profile.manifests_required.clone()
        };
        let tag_algorithms = self.profile.tag_manifests_required.clone();

        let mut ordered: Vec<(String, &BagSource)> = sources
            .iter()
            .map(|s| (s.payload_path(), s))
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));
        for source in sources {
            if !source.source.exists() {
                return Err(BagError::SourceMissing(source.source.clone()));
            }
        }

        let mut sink = open_sink(output)?;
        let mut files: BTreeMap<String, BagItFile> = BTreeMap::new();
        let mut payload_bytes = 0u64;
        let total = ordered.len() as u64;

        for (index, (rel, source)) in ordered.iter().enumerate() {
            self.config.pace();
            let meta = source_meta(&source.source)?;
            let mut reader = File::open(&source.source).map_err(|e| BagError::SourceReadFailed {
                path: source.source.clone(),
                source: e,
            })?;
            let mut hashers = HasherSet::new(payload_algorithms.iter().copied());
            let mut hashing = HashingReader {
                inner: &mut reader,
                hashers: &mut hashers,
            };
            sink.put_stream(rel, &meta, &mut hashing)
                .map_err(|e| BagError::WriteFailed {
                    path: output.join(rel),
                    source: e,
                })?;

            let mut file = BagItFile::new(rel.clone(), meta.size);
            file.checksums = hashers.finish();
            payload_bytes += meta.size;
            files.insert(rel.clone(), file);

            let percent = if total > 0 {
                ((index as u64 + 1) as f32 / total as f32) * 100.0
            } else {
                100.0
            };
            self.observer.on_task(
                &TaskEvent::new(TaskKind::Add, rel.as_str(), format!("Packed {rel}"))
                    .with_percent(percent),
            );
        }
        let payload_files = files.len() as u64;

        // Tag files, payload manifests, then tag manifests; tar entries are
        // strictly sequential, so everything funnels through the one sink.
        let tag_file_bytes = self.render_tag_files(payload_bytes, payload_files);
        for (rel, bytes) in &tag_file_bytes {
            self.put_tag_bytes(&mut sink, output, rel, bytes, &tag_algorithms, &mut files)?;
        }

        let mut manifests = Vec::new();
        for algorithm in &payload_algorithms {
            let rel = format!("manifest-{algorithm}.txt");
            let bytes = render_manifest(*algorithm, files.values().filter(|f| f.role.is_payload()));
            self.put_tag_bytes(&mut sink, output, &rel, &bytes, &tag_algorithms, &mut files)?;
            manifests.push(rel);
        }

        for algorithm in &tag_algorithms {
            let rel = format!("tagmanifest-{algorithm}.txt");
            let bytes = render_manifest(
                *algorithm,
                files
                    .values()
                    .filter(|f| f.role.is_tag() || f.role.is_payload_manifest()),
            );
            sink.put_bytes(&rel, &bytes).map_err(|e| BagError::WriteFailed {
                path: output.join(&rel),
                source: e,
            })?;
            files.insert(rel.clone(), BagItFile::new(rel.clone(), bytes.len() as u64));
            manifests.push(rel);
        }

        sink.finalize().map_err(|e| BagError::WriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?;

        info!(bag = ?output, files = files.len(), payload_bytes, "Bag written");
        Ok(BagOutcome {
            bag_path: output.to_path_buf(),
            payload_bytes,
            payload_files,
            files_written: files.len() as u64,
            manifests,
        })
    }

    fn check_required_tags(&self) -> Result<(), BagError> {
        for tag in &self.profile.tags {
            let auto = tag.tag_file == BAG_INFO_TXT && AUTO_TAGS.contains(&tag.tag_name.as_str());
            if tag.required && !tag.empty_ok && !auto && tag.effective_value().is_none() {
                return Err(BagError::MissingTagValue {
                    tag: tag.tag_name.clone(),
                    file: tag.tag_file.clone(),
                });
            }
        }
        Ok(())
    }

    /// Render every tag file's bytes: bagit.txt first, bag-info.txt second,
    /// any custom tag files after.
    fn render_tag_files(&self, payload_bytes: u64, payload_files: u64) -> Vec<(String, Vec<u8>)> {
        let mut rendered = Vec::new();
        let mut tag_files = self.profile.tag_files();
        tag_files.sort_by_key(|f| match *f {
            BAGIT_TXT => (0, f.to_string()),
            BAG_INFO_TXT => (1, f.to_string()),
            other => (2, other.to_string()),
        });

        for tag_file in tag_files {
            let mut pairs = KeyValueCollection::new();
            for definition in self.profile.tags_for_file(tag_file) {
                if let Some(value) = definition.effective_value() {
                    pairs.add(&definition.tag_name, value);
                } else if tag_file == BAG_INFO_TXT {
                    if let Some(value) = auto_value(
                        &definition.tag_name,
                        payload_bytes,
                        payload_files,
                    ) {
                        pairs.add(&definition.tag_name, value);
                    }
                }
            }
            if tag_file == BAG_INFO_TXT && !pairs.contains_key("Payload-Oxum") {
                pairs.add("Payload-Oxum", format!("{payload_bytes}.{payload_files}"));
            }
            if pairs.is_empty() {
                continue;
            }
            rendered.push((tag_file.to_string(), render_tag_file(&pairs)));
        }
        rendered
    }

    fn put_tag_bytes(
        &self,
        sink: &mut Box<dyn BagSink>,
        output: &Path,
        rel: &str,
        bytes: &[u8],
        tag_algorithms: &BTreeSet<Algorithm>,
        files: &mut BTreeMap<String, BagItFile>,
    ) -> Result<(), BagError> {
        let mut hashers = HasherSet::new(tag_algorithms.iter().copied());
        hashers.update(bytes);
        sink.put_bytes(rel, bytes).map_err(|e| BagError::WriteFailed {
            path: output.join(rel),
            source: e,
        })?;
        let mut file = BagItFile::new(rel.to_string(), bytes.len() as u64);
        file.checksums = hashers.finish();
        files.insert(rel.to_string(), file);
        self.observer.on_task(&TaskEvent::new(
            TaskKind::Add,
            rel,
            format!("Wrote {rel}"),
        ));
        Ok(())
    }
}

fn auto_value(tag_name: &str, payload_bytes: u64, payload_files: u64) -> Option<String> {
    match tag_name {
        "Payload-Oxum" => Some(format!("{payload_bytes}.{payload_files}")),
        "Bagging-Date" => Some(Zoned::now().date().to_string()),
        "Bagging-Software" => Some(format!("satchel {}", env!("CARGO_PKG_VERSION"))),
        "Bag-Size" => Some(human_size(payload_bytes)),
        _ => None,
    }
}

/// `Name: Value` lines, LF-terminated, sorted by name; embedded newlines
/// fold into continuation lines with a single leading space.
fn render_tag_file(pairs: &KeyValueCollection) -> Vec<u8> {
    let mut lines: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    for (name, value) in lines {
        let mut parts = value.split('\n');
        out.push_str(&name);
        out.push_str(": ");
        out.push_str(parts.next().unwrap_or_default());
        out.push('\n');
        for continuation in parts {
            out.push(' ');
            out.push_str(continuation);
            out.push('\n');
        }
    }
    out.into_bytes()
}

/// `<digest><SP><path>` lines sorted by path.
fn render_manifest<'f>(
    algorithm: Algorithm,
    files: impl Iterator<Item = &'f BagItFile>,
) -> Vec<u8> {
    let mut entries: Vec<(&str, &str)> = files
        .filter_map(|f| f.checksum(algorithm).map(|d| (f.rel_path.as_str(), d)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (rel, digest) in entries {
        out.push_str(digest);
        out.push(' ');
        out.push_str(rel);
        out.push('\n');
    }
    out.into_bytes()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10)];
    for (unit, factor) in UNITS {
        if bytes >= factor {
            return format!("{:.1} {unit}", bytes as f64 / factor as f64);
        }
    }
    format!("{bytes} bytes")
}

struct SourceMeta {
    size: u64,
    mode: Option<u32>,
    mtime_secs: Option<i64>,
}

fn source_meta(path: &Path) -> Result<SourceMeta, BagError> {
    let metadata = fs::metadata(path).map_err(|_| BagError::SourceMissing(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(BagError::SourceMissing(path.to_path_buf()));
    }
    let mtime_secs = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);
    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        Some(metadata.permissions().mode())
    };
    #[cfg(not(unix))]
    let mode = None;
    Ok(SourceMeta {
        size: metadata.len(),
        mode,
        mtime_secs,
    })
}

struct HashingReader<'h, R> {
    inner: R,
    hashers: &'h mut HasherSet,
}

impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hashers.update(&buf[..n]);
        Ok(n)
    }
}

/// Write sink capability: a bag directory or a tar archive.
trait BagSink {
    fn put_stream(&mut self, rel: &str, meta: &SourceMeta, reader: &mut dyn Read)
        -> io::Result<()>;
    fn put_bytes(&mut self, rel: &str, data: &[u8]) -> io::Result<()>;
    fn finalize(&mut self) -> io::Result<()>;
}

fn open_sink(output: &Path) -> Result<Box<dyn BagSink>, BagError> {
    let is_tar = output
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("tar"))
        .unwrap_or(false);
    let sink: Box<dyn BagSink> = if is_tar {
        let bag_name = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bag".to_string());
        let file = File::create(output).map_err(|e| BagError::WriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?;
        Box::new(TarSink {
            builder: tar::Builder::new(file),
            bag_name,
        })
    } else {
        fs::create_dir_all(output).map_err(|e| BagError::WriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?;
        Box::new(DirSink {
            root: output.to_path_buf(),
        })
    };
    Ok(sink)
}

struct DirSink {
    root: PathBuf,
}

impl DirSink {
    fn prepare(&self, rel: &str) -> io::Result<PathBuf> {
        let full = self.root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(full)
    }
}

impl BagSink for DirSink {
    fn put_stream(
        &mut self,
        rel: &str,
        meta: &SourceMeta,
        reader: &mut dyn Read,
    ) -> io::Result<()> {
        let full = self.prepare(rel)?;
        let mut out = File::create(&full)?;
        io::copy(reader, &mut out)?;
        drop(out);
        #[cfg(unix)]
        if let Some(mode) = meta.mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full, fs::Permissions::from_mode(mode))?;
        }
        if let Some(secs) = meta.mtime_secs {
            filetime::set_file_mtime(&full, FileTime::from_unix_time(secs, 0))?;
        }
        Ok(())
    }

    fn put_bytes(&mut self, rel: &str, data: &[u8]) -> io::Result<()> {
        let full = self.prepare(rel)?;
        fs::write(full, data)
    }

    fn finalize(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct TarSink {
    builder: tar::Builder<File>,
    bag_name: String,
}

impl TarSink {
    fn header(&self, size: u64, mode: u32, mtime: i64) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_size(size);
        header.set_mode(mode);
        header.set_mtime(mtime.max(0) as u64);
        header.set_uid(0);
        header.set_gid(0);
        header
    }

    fn now_secs() -> i64 {
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl BagSink for TarSink {
    fn put_stream(
        &mut self,
        rel: &str,
        meta: &SourceMeta,
        reader: &mut dyn Read,
    ) -> io::Result<()> {
        let mut header = self.header(
            meta.size,
            meta.mode.unwrap_or(0o644),
            meta.mtime_secs.unwrap_or_else(Self::now_secs),
        );
        self.builder
            .append_data(&mut header, format!("{}/{rel}", self.bag_name), reader)
    }

    fn put_bytes(&mut self, rel: &str, data: &[u8]) -> io::Result<()> {
        let mut header = self.header(data.len() as u64, 0o644, Self::now_secs());
        self.builder
            .append_data(&mut header, format!("{}/{rel}", self.bag_name), data)
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.builder.finish()
    }
}
