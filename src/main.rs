use anyhow::{Context, Result};
use condition_compiler::ast::HierarchyList;
use condition_compiler::config::ModelConfig;
use condition_compiler::model::QueryContext;
use condition_compiler::render::render_select;
use condition_compiler::FilterCompiler;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tracing::{info, warn};

const MODEL_FILE: &str = "condition_model.json";

/// Sample input: `Customer.State = CA and (Order.Total > 100 or Order.Status starts with "ship")`
const SAMPLE_LIST: &str = r#"[
  {"kind": "condition", "level": 0, "item": {
    "attribute": {"entity": "Customer", "attribute": "State"},
    "condition": {"operator": "EQUAL_TO", "values": [{"literal": {"type": "string", "value": "CA"}}]}}},
  {"kind": "junction", "level": 0, "relation": "and"},
  {"kind": "condition", "level": 1, "item": {
    "attribute": {"entity": "Order", "attribute": "Total"},
    "condition": {"operator": "GREATER_THAN", "values": [{"literal": {"type": "double", "value": 100.0}}]}}},
  {"kind": "junction", "level": 1, "relation": "or"},
  {"kind": "condition", "level": 1, "item": {
    "attribute": {"entity": "Order", "attribute": "Status"},
    "condition": {"operator": "STARTING_WITH", "values": [{"literal": {"type": "string", "value": "ship"}}]}}}
]"#;

/// Loads the model file, falling back to the built-in sample model.
fn load_model() -> ModelConfig {
    match ModelConfig::from_json_file(MODEL_FILE) {
        Ok(config) => {
            info!(file = MODEL_FILE, entities = config.model.entities.len(), "loaded logical model");
            config
        }
        Err(e) => {
            warn!("{}, using the built-in sample model", e);
            ModelConfig::sample()
        }
    }
}

/// Compiles one JSON condition list and prints the tree, parameters and SQL.
fn compile_and_print(config: &ModelConfig, compiler: &FilterCompiler, input: &str) -> Result<()> {
    let items: HierarchyList = serde_json::from_str(input).context("invalid condition list")?;

    let mut ctx = QueryContext::logical(Arc::new(config.model.clone()));
    let compiled = compiler.compile(&items, &mut ctx)?;

    println!("\n[Filter tree]:");
    match &compiled.tree {
        Some(tree) => println!("{}", serde_json::to_string_pretty(tree)?),
        None => println!("(empty)"),
    }

    if !compiled.variables.is_empty() {
        println!("\n[Parameters]:");
        for (name, value) in compiled.variables.iter() {
            println!("  {} = {:?}", name, value);
        }
    }

    let sql = render_select(&compiled, &ctx, "dual", compiler.config().dialect)?;
    println!("\n[SQL preview]:\n{}\n", sql);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("--- Condition list compiler ---");

    let config = load_model();
    let compiler = FilterCompiler::from_config(config.compiler.clone());

    println!("\n[Sample condition list]:\n{}", SAMPLE_LIST);
    compile_and_print(&config, &compiler, SAMPLE_LIST)?;

    println!("Enter a condition list as JSON on one line (Ctrl-D to quit).");
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                if let Err(e) = compile_and_print(&config, &compiler, line) {
                    println!("✗ {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
