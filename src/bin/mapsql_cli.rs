use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mapsql::core::{MapperOptions, ParamBag, Value};
use mapsql::evaluator::{RequestContext, TagEvaluator};
use mapsql::mapping::{DataTable, TypeHandlerRegistry};
use mapsql::statement::{StatementCatalog, StatementRegistry};

/// mapsql statement renderer
///
/// Loads statement documents and renders `Scope.Id {json-params}` to SQL and
/// bound parameters without touching a database.
#[derive(Parser, Debug)]
#[command(name = "mapsql_cli")]
#[command(about = "Render mapped SQL statements from the command line", long_about = None)]
struct Args {
    /// Statement document (JSON); may be repeated
    #[arg(short = 'D', long = "document", required = true)]
    documents: Vec<PathBuf>,

    /// Options file (defaults to ./mapsql.toml when present)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Render a single request and exit, e.g. `User.GetList {"id": 1}`
    #[arg(short = 'e', long)]
    execute: Option<String>,
}

struct Session {
    registry: StatementRegistry,
    options: MapperOptions,
    handlers: TypeHandlerRegistry,
}

impl Session {
    fn load(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let options = MapperOptions::load(args.config.as_deref())?;
        let mut registry = StatementRegistry::new();
        for path in &args.documents {
            let json = std::fs::read_to_string(path)?;
            let loaded = registry.load_json(&json)?;
            eprintln!("Loaded {loaded} statements from {}", path.display());
        }
        Ok(Self {
            registry,
            options,
            handlers: TypeHandlerRegistry::new(),
        })
    }

    /// Render `Scope.Id [json]` and print SQL plus parameters
    fn render(&self, line: &str) -> Result<(), Box<dyn std::error::Error>> {
        let (full_id, params) = match line.split_once(char::is_whitespace) {
            Some((id, rest)) => (id, rest.trim()),
            None => (line, ""),
        };
        let Some((scope, id)) = full_id.split_once('.') else {
            return Err(format!("expected Scope.Id, got '{full_id}'").into());
        };

        let bag = if params.is_empty() {
            ParamBag::new()
        } else {
            let json: serde_json::Value = serde_json::from_str(params)?;
            ParamBag::from_serialize(&json)?
        };
        let bag = bag.ignoring_case(self.options.ignore_parameter_case);

        let statement = self.registry.get(scope, id)?;
        let mut ctx = RequestContext::new(scope, id).with_request(bag);
        TagEvaluator::new(&self.registry, &self.options, &self.handlers).evaluate(&statement, &mut ctx)?;

        println!("{}", ctx.sql());
        if !ctx.parameters().is_empty() {
            let table = DataTable::new(
                vec!["parameter".to_string(), "value".to_string(), "type".to_string()],
                ctx.parameters()
                    .iter()
                    .map(|p| {
                        vec![
                            Value::Text(p.name.clone()),
                            p.value.clone(),
                            Value::Text(p.value.type_name().to_string()),
                        ]
                    })
                    .collect(),
            );
            println!("{}", table.render());
        }
        Ok(())
    }

    fn list(&self) {
        for id in self.registry.full_ids() {
            println!("  {id}");
        }
    }
}

fn print_help() {
    println!("Usage: Scope.Id [json-params]");
    println!("  e.g. User.GetList {{\"name\": \"ann\", \"ids\": [1, 2]}}");
    println!("Meta-commands:");
    println!("  \\l, \\list      - List statements");
    println!("  \\o, \\options   - Show effective options");
    println!("  \\q, \\quit      - Quit");
    println!("  \\?, \\help      - Show this help");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let session = Session::load(&args)?;

    if let Some(line) = args.execute.as_deref() {
        return session.render(line.trim());
    }

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".mapsql_cli_history");
        p
    });
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    println!("mapsql {} - {} statements loaded", env!("CARGO_PKG_VERSION"), session.registry.len());
    println!("Type \\? for help, \\q to quit.\n");

    loop {
        match rl.readline("mapsql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    "\\q" | "\\quit" | "quit" | "exit" => break,
                    "\\l" | "\\list" => session.list(),
                    "\\o" | "\\options" => println!("{:#?}", session.options),
                    "\\?" | "\\h" | "\\help" => print_help(),
                    _ if line.starts_with('\\') => {
                        println!("Unknown meta-command: {line}. Use \\? for help.");
                    }
                    _ => {
                        if let Err(e) = session.render(line) {
                            eprintln!("Error: {e}");
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    Ok(())
}
