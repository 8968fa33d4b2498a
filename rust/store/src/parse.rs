// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parse pipeline - buffer in, [`DataStore`] out.
//!
//! Phases run in a fixed order, each reported through the progress callback:
//!
//! | phase           | percent  |
//! |-----------------|----------|
//! | `scanning`      | 0 - 40   |
//! | `converting`    | 40 - 70  |
//! | `relationships` | 70 - 80  |
//! | `properties`    | 80 - 90  |
//! | `spatial`       | 90 - 95  |
//! | `units`         | 95 - 99  |
//! | `complete`      | 100      |

use std::sync::Arc;
use std::time::Instant;

use ifc_graph_core::{
    has_step_marker, parse_header, parse_stream, EntityExtractor, EntityIndexBuilder,
    ExtractedEntity, IfcType, IndexedRecord, ParseEvent, StreamConfig, TypeRegistry,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::columnar::EntityTable;
use crate::config::{PropertyMode, StoreConfig};
use crate::error::Result;
use crate::graph::RelationshipGraph;
use crate::properties::{owner_links, EagerProperties, OnDemandProperties, PropertySource};
use crate::relationships::{extract_edges, spec_for, RelationEdge};
use crate::spatial::{SpatialHierarchy, SpatialSource};
use crate::store::DataStore;
use crate::units::length_unit_scale;
use crate::warnings::{WarningKind, Warnings};

/// Shortest buffer that can hold a single record (`#1=A();`)
pub const MIN_FILE_LEN: usize = 7;

/// Records per conversion batch when progress reporting is disabled
const DEFAULT_BATCH: usize = 10_000;

/// Coarse progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub phase: String,
    pub percent: f32,
}

impl Progress {
    pub fn new(phase: impl Into<String>, percent: f32) -> Self {
        Self {
            phase: phase.into(),
            percent: percent.clamp(0.0, 100.0),
        }
    }
}

/// Interpolate within a phase's percent band
#[inline]
fn band(start: f32, end: f32, fraction: f32) -> f32 {
    start + (end - start) * fraction.clamp(0.0, 1.0)
}

/// Parse a buffer into a data store.
///
/// Structural problems (too short, not STEP) fail the whole parse;
/// problems with single records become warnings on the store.
pub fn parse<F>(buffer: impl Into<Arc<[u8]>>, config: &StoreConfig, mut on_progress: F) -> Result<DataStore>
where
    F: FnMut(Progress),
{
    let start = Instant::now();
    let source: Arc<[u8]> = buffer.into();
    tracing::info!(
        bytes = source.len(),
        scan_mode = ?config.scan_mode,
        property_mode = %config.property_mode,
        "Starting parse"
    );

    let content_len = trimmed_len(&source);
    if content_len < MIN_FILE_LEN {
        return Err(ifc_graph_core::Error::TooShort {
            len: content_len,
            min: MIN_FILE_LEN,
        }
        .into());
    }

    // Scanning
    on_progress(Progress::new("scanning", 0.0));
    let mut builder = EntityIndexBuilder::with_capacity_for(source.len());
    let stream = parse_stream(
        &source,
        StreamConfig {
            mode: config.scan_mode,
            progress_interval: config.progress_interval,
        },
    );
    for event in stream {
        match &event {
            ParseEvent::Entity(record) => builder.add_entity(record),
            ParseEvent::Progress { .. } => {
                let percent = event.percent().unwrap_or(0.0) / 100.0;
                on_progress(Progress::new("scanning", band(0.0, 40.0, percent)));
            }
            ParseEvent::Complete { .. } => {}
        }
    }
    let index = Arc::new(builder.build());

    if index.is_empty() && !has_step_marker(&source) {
        return Err(ifc_graph_core::Error::NotStepFormat(
            "no ISO-10303-21 marker and no entity records".into(),
        )
        .into());
    }
    tracing::debug!(records = index.len(), "Scanned entity records");

    let header = parse_header(&source);
    let extractor = EntityExtractor::new(&source, &index);
    let mut warnings = Warnings::default();
    for skipped in index.unindexed() {
        let err = ifc_graph_core::Error::TooManyTypes {
            id: skipped.id,
            type_name: skipped.type_name.clone(),
            limit: TypeRegistry::CAPACITY,
        };
        warnings.push(WarningKind::TooManyTypes, skipped.id, skipped.line, err.to_string());
    }

    // Converting
    on_progress(Progress::new("converting", 40.0));
    let records = index.records();
    let batch = match config.progress_interval {
        0 => DEFAULT_BATCH,
        n => n,
    };
    let mut table = EntityTable::with_capacity(records.len());
    let mut edges: Vec<RelationEdge> = Vec::new();
    for (n, chunk) in records.chunks(batch).enumerate() {
        let extracted: Vec<_> = if config.parallel {
            chunk.par_iter().map(|r| extractor.try_extract(r)).collect()
        } else {
            chunk.iter().map(|r| extractor.try_extract(r)).collect()
        };

        for (record, result) in chunk.iter().zip(extracted) {
            match result {
                Ok(entity) if config.strict_types && entity.ifc_type.is_none() => {
                    let name = index.registry().name(record.type_code).unwrap_or_default();
                    warnings.push(
                        WarningKind::UnknownType,
                        record.id,
                        record.line,
                        ifc_graph_core::Error::InvalidIfcType(name.to_string()).to_string(),
                    )
                }
                Ok(entity) => convert(&entity, record, &mut table, &mut edges, &mut warnings),
                Err(err) => warnings.push(
                    WarningKind::UnreadableEntity,
                    record.id,
                    record.line,
                    err.to_string(),
                ),
            }
        }

        let done = ((n + 1) * batch).min(records.len());
        on_progress(Progress::new(
            "converting",
            band(40.0, 70.0, done as f32 / records.len().max(1) as f32),
        ));
    }
    tracing::debug!(
        rows = table.len(),
        strings = table.strings().len(),
        edges = edges.len(),
        "Built columnar table"
    );

    // Relationships
    on_progress(Progress::new("relationships", 70.0));
    let owners = owner_links(&edges);
    let graph = RelationshipGraph::from_edges(edges);
    tracing::debug!(edges = graph.edge_count(), "Built relationship graph");

    // Properties
    on_progress(Progress::new("properties", 80.0));
    let properties: Box<dyn PropertySource> = match config.property_mode {
        PropertyMode::Eager => Box::new(EagerProperties::build(&extractor, owners, config.parallel)),
        PropertyMode::OnDemand => Box::new(OnDemandProperties::new(
            Arc::clone(&source),
            Arc::clone(&index),
            owners,
            config.cache_on_demand,
        )),
    };

    // Spatial
    on_progress(Progress::new("spatial", 90.0));
    let spatial = SpatialHierarchy::build(&SpatialSource {
        graph: &graph,
        index: &index,
        table: &table,
        extractor: &extractor,
    });

    // Units
    on_progress(Progress::new("units", 95.0));
    let length_unit_scale = index
        .ids_of(IfcType::IfcProject)
        .first()
        .map(|&project| length_unit_scale(&extractor, project))
        .unwrap_or(1.0);

    let warnings = warnings.into_vec();
    tracing::info!(
        entities = table.len(),
        records = index.len(),
        relationships = graph.edge_count(),
        spatial_nodes = spatial.len(),
        warnings = warnings.len(),
        schema = %header.schema,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Parse complete"
    );
    on_progress(Progress::new("complete", 100.0));

    Ok(DataStore {
        source,
        index,
        entities: table,
        graph,
        properties,
        spatial,
        header,
        length_unit_scale,
        warnings,
        config: config.clone(),
    })
}

/// Add one extracted entity to the table and collect its relationship edges
fn convert(
    entity: &ExtractedEntity,
    record: &IndexedRecord,
    table: &mut EntityTable,
    edges: &mut Vec<RelationEdge>,
    warnings: &mut Warnings,
) {
    table.push(entity);

    let Some(spec) = entity.ifc_type.and_then(spec_for) else {
        return;
    };
    match extract_edges(entity, spec) {
        Ok(found) => edges.extend(found),
        Err(reason) => warnings.push(
            WarningKind::DroppedRelationship,
            record.id,
            record.line,
            format!("{} dropped: {}", spec.ifc_type, reason),
        ),
    }
}

/// Length without leading and trailing ASCII whitespace
fn trimmed_len(buffer: &[u8]) -> usize {
    let start = buffer
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(buffer.len());
    let end = buffer
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    end - start
}
