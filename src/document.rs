//! Project document: the persisted form of a feature store
//!
//! Trace points and net elements keep their order so a save/load cycle
//! reproduces the store exactly.

use crate::features::{Connector, ConfirmedVia, Counters, ElectricalNet, Trace, Via};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub version: u32,
    #[serde(default)]
    pub vias: Vec<Via>,
    #[serde(default)]
    pub confirmed_vias: Vec<ConfirmedVia>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub nets: Vec<ElectricalNet>,
    #[serde(default)]
    pub counters: Counters,
}

impl ProjectDocument {
    pub const CURRENT_VERSION: u32 = 1;
}

pub fn save_document<P: AsRef<Path>>(path: P, doc: &ProjectDocument) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.flush()?;
    tracing::info!(
        "[Document] Saved {} traces, {} nets to {}",
        doc.traces.len(),
        doc.nets.len(),
        path.display()
    );
    Ok(())
}

pub fn load_document<P: AsRef<Path>>(path: P) -> anyhow::Result<ProjectDocument> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let doc: ProjectDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    anyhow::ensure!(
        doc.version <= ProjectDocument::CURRENT_VERSION,
        "unsupported document version {} (newest known is {})",
        doc.version,
        ProjectDocument::CURRENT_VERSION
    );
    Ok(doc)
}
