/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! File-level driver for the `baker` command.
//!
//! Reads an XML document, writes it back out through the position-tracking
//! serializer and optionally writes the Source Map v3 file for the output.
//! When the input was itself produced by an earlier pass, its map can be
//! supplied so that the new map points at the first input.

use anyhow::{Context, Result};
use baker_source_map::{DecodedMap, MappingStore, SourceMap, encode};
use baker_xml::{ParseOptions, SerializeOptions, parse_with_options, write_document};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Source name recorded for documents read from stdin.
pub const STDIN_SOURCE: &str = "<stdin>";

/// Input and output locations for one conversion. `-` stands for stdin or
/// stdout.
#[derive(Debug, Clone)]
pub struct Job {
    pub html_in: PathBuf,
    pub html_out: PathBuf,
    pub source_map: Option<PathBuf>,
    pub source_map_input: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub parse: ParseOptions,
    pub serialize: SerializeOptions,
}

/// Parse `content`, serialize it to `writer` and return its mappings,
/// traced through `upstream` when given.
pub fn bake<W: Write>(
    content: &str,
    source: &str,
    writer: W,
    upstream: Option<&DecodedMap>,
    options: &Options,
) -> Result<MappingStore> {
    let root = parse_with_options(content, &options.parse)
        .with_context(|| format!("Failed to parse {}", source))?;

    let mut store = MappingStore::new();
    write_document(&root, writer, source, &mut store, &options.serialize)
        .with_context(|| format!("Failed to serialize {}", source))?;

    match upstream {
        Some(upstream) => store
            .apply_source_map(upstream)
            .context("Failed to apply input source map"),
        None => Ok(store),
    }
}

/// Run one conversion end to end.
pub fn convert_file(job: &Job, options: &Options) -> Result<()> {
    let content = read_input(&job.html_in)?;
    let source = source_name(&job.html_in);

    let upstream = job
        .source_map_input
        .as_deref()
        .map(read_source_map)
        .transpose()?;

    let mut writer = BufWriter::new(open_output(&job.html_out)?);
    let mut store = bake(&content, &source, &mut writer, upstream.as_ref(), options)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", job.html_out.display()))?;

    if !is_stdio(&job.html_out) {
        if let Some(name) = job.html_out.file_name() {
            store = store.with_file(name.to_string_lossy());
        }
    }

    tracing::info!(
        input = %source,
        output = %job.html_out.display(),
        mappings = store.len(),
        "Converted document"
    );

    if let Some(path) = &job.source_map {
        write_source_map(&store, path)?;
    }
    Ok(())
}

fn write_source_map(store: &MappingStore, path: &Path) -> Result<()> {
    let map = encode(store).context("Failed to encode source map")?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create source map file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    map.to_writer(&mut writer)
        .with_context(|| format!("Failed to write source map file: {}", path.display()))?;
    writer.flush()?;

    tracing::info!(path = %path.display(), sources = map.sources.len(), "Wrote source map");
    Ok(())
}

fn read_source_map(path: &Path) -> Result<DecodedMap> {
    let file = File::open(path)
        .with_context(|| format!("Failed to read source map file: {}", path.display()))?;
    let map = SourceMap::from_reader(BufReader::new(file))
        .and_then(|map| DecodedMap::new(&map))
        .with_context(|| format!("Failed to decode source map file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded input source map");
    Ok(map)
}

fn read_input(path: &Path) -> Result<String> {
    if is_stdio(path) {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(Box::new(file))
}

fn source_name(path: &Path) -> String {
    if is_stdio(path) {
        STDIN_SOURCE.to_string()
    } else {
        path.to_string_lossy().into_owned()
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}
