//! Grouping of sections into complete logical tables.
//!
//! A table is keyed by (table_id, table_id_extension); it is complete once
//! every section_number in `0..=last_section_number` of one version has
//! arrived. A new version supersedes any in-progress aggregation for the
//! same identity.

use std::collections::HashMap;

use crate::section::Section;

/// All sections of one (table_id, table_id_extension, version), in
/// section_number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub table_id: u8,
    pub table_id_extension: u16,
    pub version: u8,
    sections: Vec<Section>,
}

impl Table {
    /// Assembles a table directly from its sections, for the encode
    /// direction. Sections must share one identity/version and cover
    /// `0..=last_section_number` in order.
    pub fn from_sections(sections: Vec<Section>) -> anyhow::Result<Self> {
        let first = match sections.first() {
            Some(s) => s,
            None => anyhow::bail!("a table needs at least one section"),
        };
        let (table_id, ext, version) =
            (first.table_id(), first.table_id_extension(), first.version());
        if sections.len() != first.last_section_number() as usize + 1 {
            anyhow::bail!(
                "expected {} sections, got {}",
                first.last_section_number() as usize + 1,
                sections.len()
            );
        }
        for (i, s) in sections.iter().enumerate() {
            if s.table_id() != table_id
                || s.table_id_extension() != ext
                || s.version() != version
            {
                anyhow::bail!("section {i} belongs to a different table");
            }
            if s.section_number() as usize != i {
                anyhow::bail!("section_number {} at position {i}", s.section_number());
            }
        }
        Ok(Self { table_id, table_id_extension: ext, version, sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Concatenated payload bytes of all sections in order.
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for s in &self.sections {
            out.extend_from_slice(s.payload());
        }
        out
    }
}

/// In-progress aggregation for one identity.
struct Assembly {
    version: u8,
    slots: Vec<Option<Section>>,
    filled: usize,
}

impl Assembly {
    fn new(section: &Section) -> Self {
        Self {
            version: section.version(),
            slots: vec![None; section.last_section_number() as usize + 1],
            filled: 0,
        }
    }
}

#[derive(Default)]
pub struct TableAggregator {
    pending: HashMap<(u8, u16), Assembly>,
}

impl TableAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a valid section; returns the table once the last missing
    /// slot fills. Later delivery of an already-present slot wins.
    pub fn accept(&mut self, section: Section) -> Option<Table> {
        let key = (section.table_id(), section.table_id_extension());

        let stale = self.pending.get(&key).is_some_and(|asm| {
            asm.version != section.version()
                || asm.slots.len() != section.last_section_number() as usize + 1
        });
        if stale {
            // content superseded: restart from this section
            self.pending.remove(&key);
        }
        let asm = self
            .pending
            .entry(key)
            .or_insert_with(|| Assembly::new(&section));

        let n = section.section_number() as usize;
        if n >= asm.slots.len() {
            // inconsistent numbering within one version; drop the part
            return None;
        }
        if asm.slots[n].is_none() {
            asm.filled += 1;
        }
        asm.slots[n] = Some(section);

        if asm.filled < asm.slots.len() {
            return None;
        }
        let asm = self.pending.remove(&key)?;
        let sections: Vec<Section> = asm.slots.into_iter().flatten().collect();
        let first = sections.first()?;
        Some(Table {
            table_id: first.table_id(),
            table_id_extension: first.table_id_extension(),
            version: asm.version,
            sections,
        })
    }

    /// Discards every in-progress aggregation.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
