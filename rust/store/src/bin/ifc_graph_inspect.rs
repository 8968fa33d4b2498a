// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ifc-graph-inspect - parse an IFC file and print a JSON summary.
//!
//! ```text
//! ifc-graph-inspect <file.ifc> [--fast] [--on-demand] [--strict-types]
//!                   [--worker] [--pretty] [--json-logs]
//!                   [--type IFCWALL]... [--where PSET.PROP OP VALUE] [--limit N]
//! ```
//!
//! Defaults come from the environment (`IFC_SCAN_MODE`, `IFC_PROPERTY_MODE`,
//! `WORKER_THREADS`, ...); flags override them. Logs go to stderr and are
//! filtered by `RUST_LOG`.

use anyhow::{bail, Context};
use ifc_graph_store::{
    parse, CompareOp, DataStore, ParseWorker, Progress, PropertyMode, PropertyValue, ScanMode,
    StoreConfig,
};
use serde_json::{json, Value};

#[derive(Debug, Default)]
struct Args {
    path: String,
    fast: bool,
    on_demand: bool,
    strict_types: bool,
    worker: bool,
    pretty: bool,
    json_logs: bool,
    types: Vec<String>,
    filter: Option<(String, String, CompareOp, PropertyValue)>,
    limit: Option<usize>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--fast" => args.fast = true,
            "--on-demand" => args.on_demand = true,
            "--strict-types" => args.strict_types = true,
            "--worker" => args.worker = true,
            "--pretty" => args.pretty = true,
            "--json-logs" => args.json_logs = true,
            "--type" => args.types.push(it.next().context("--type needs a type name")?),
            "--limit" => {
                let n = it.next().context("--limit needs a number")?;
                args.limit = Some(n.parse().with_context(|| format!("bad limit '{}'", n))?);
            }
            "--where" => {
                let target = it.next().context("--where needs PSET.PROP")?;
                let op = it.next().context("--where needs an operator")?;
                let value = it.next().context("--where needs a value")?;
                let (pset, prop) = target
                    .rsplit_once('.')
                    .with_context(|| format!("expected PSET.PROP, got '{}'", target))?;
                let op: CompareOp = op.parse().map_err(anyhow::Error::msg)?;
                args.filter = Some((pset.to_string(), prop.to_string(), op, operand(&value)));
            }
            flag if flag.starts_with("--") => bail!("unknown flag '{}'", flag),
            path if args.path.is_empty() => args.path = path.to_string(),
            extra => bail!("unexpected argument '{}'", extra),
        }
    }
    if args.path.is_empty() {
        bail!("usage: ifc-graph-inspect <file.ifc> [flags]");
    }
    Ok(args)
}

/// Interpret a command-line operand as a number, boolean or text
fn operand(raw: &str) -> PropertyValue {
    if let Ok(i) = raw.parse::<i64>() {
        return PropertyValue::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return PropertyValue::Real(f);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => PropertyValue::Boolean(true),
        "false" => PropertyValue::Boolean(false),
        _ => PropertyValue::Text(raw.to_string()),
    }
}

fn init_logging(json_logs: bool) {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,ifc_graph_store=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn summary(store: &DataStore, args: &Args) -> Value {
    let types: Vec<Value> = store
        .type_counts()
        .into_iter()
        .take(20)
        .map(|(name, count)| json!({ "type": name, "count": count }))
        .collect();

    let spatial = store.spatial();
    let storeys: Vec<Value> = spatial
        .storeys()
        .into_iter()
        .filter_map(|id| spatial.node(id))
        .map(|node| {
            json!({
                "id": node.id,
                "name": node.name,
                "elevation": node.elevation,
                "elements": spatial.by_storey(node.id).len(),
            })
        })
        .collect();

    let mut out = json!({
        "file": args.path,
        "schema": store.schema().as_str(),
        "entities": store.entity_count(),
        "records": store.record_count(),
        "relationships": store.graph().edge_count(),
        "spatial_nodes": spatial.len(),
        "property_owners": store.properties().owner_count(),
        "property_mode": store.properties().mode(),
        "length_unit_scale": store.length_unit_scale(),
        "warnings": store.warnings().len(),
        "types": types,
        "storeys": storeys,
    });

    if !args.types.is_empty() || args.filter.is_some() {
        let mut query = store.query();
        for ty in &args.types {
            query = query.of_type_name(ty);
        }
        if let Some((pset, prop, op, value)) = &args.filter {
            query = query.where_property(pset.as_str(), prop.as_str(), *op, value.clone());
        }
        if let Some(limit) = args.limit {
            query = query.limit(limit);
        }
        let matches: Vec<Value> = query
            .execute()
            .into_iter()
            .map(|node| {
                json!({
                    "id": node.id(),
                    "type": node.type_name(),
                    "name": node.name(),
                    "global_id": node.global_id(),
                    "storey": node.storey().map(|s| s.id()),
                })
            })
            .collect();
        out["query"] = Value::Array(matches);
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(args.json_logs);

    let mut config = StoreConfig::from_env();
    if args.fast {
        config = config.with_scan_mode(ScanMode::Fast);
    }
    if args.on_demand {
        config = config.with_property_mode(PropertyMode::OnDemand);
    }
    if args.strict_types {
        config = config.with_strict_types(true);
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("failed to build the rayon pool")?;

    let buffer = std::fs::read(&args.path).with_context(|| format!("reading {}", args.path))?;
    tracing::info!(
        path = %args.path,
        bytes = buffer.len(),
        worker_threads = config.worker_threads,
        "Inspecting file"
    );

    let report = |p: Progress| tracing::debug!(phase = %p.phase, percent = p.percent, "Progress");
    let store = if args.worker {
        ParseWorker::spawn(buffer, config).finish(report).await?
    } else {
        parse(buffer, &config, report)?
    };

    let out = summary(&store, &args);
    let text = if args.pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    println!("{}", text);
    Ok(())
}
