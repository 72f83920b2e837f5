//! Scrape sandbox CLI
//!
//! Manages a Docker sandbox for running Playwright scraping scripts.

use std::sync::Arc;

use clap::Parser;

use scrape_sandbox::assistant::{CodeGenerator, OpenAiAssistant};
use scrape_sandbox::cli::{Args, SubCommand};
use scrape_sandbox::config::{check_build_context, SandboxConfig, Validate};
use scrape_sandbox::export::{default_output, read_records, resolve_input};
use scrape_sandbox::layout::SandboxLayout;
use scrape_sandbox::process::SystemRunner;
use scrape_sandbox::sandbox::SandboxManager;
use scrape_sandbox::templates::{
    async_template, basic_template, script_file_name, EXAMPLE_SCRIPT_NAME,
};
use scrape_sandbox::{Error, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(args).await {
        if let Error::Build { stdout, stderr, .. } = &e {
            print_build_output(stdout, stderr);
        }
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(args: Args) -> Result<()> {
    let layout = SandboxLayout::new(&args.root)?;
    let config = SandboxConfig::load(layout.root(), args.config.as_deref())?;

    let mut validation = config.validate();
    validation
        .warnings
        .extend(check_build_context(&config.build_context_dir(layout.root())).warnings);
    for warning in validation.into_result()? {
        tracing::warn!("{}", warning);
    }

    let manager = SandboxManager::new(&config, layout, Arc::new(SystemRunner::new()));

    match args.command {
        SubCommand::Status => {
            let status = manager.status().await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", status);
            }
        }
        SubCommand::Build => {
            println!("Building image {}...", manager.identity().image_name);
            manager.build().await?;
            println!("Image {} built", manager.identity().image_name);
        }
        SubCommand::Interactive => {
            println!(
                "Starting interactive sandbox {} (Ctrl+C to leave)",
                manager.identity().instance_name
            );
            manager.interactive().await?;
            println!("Interactive session ended");
        }
        SubCommand::Script { script_name } => {
            manager.run_script(&script_name).await?;
            println!("Script {} finished", script_name);
        }
        SubCommand::Stop => {
            let report = manager.stop_report().await;
            if let Some(warning) = &report.warning {
                eprintln!("Warning: {}", warning);
            }
            println!("{}", report);
        }
        SubCommand::Example => {
            let path = manager.create_example()?;
            println!("Example script created: {}", path.display());
            println!("Run it with: sandbox script {}", EXAMPLE_SCRIPT_NAME);
        }
        SubCommand::Template {
            name,
            url,
            use_async,
        } => {
            let created_at = chrono::Local::now();
            let content = if use_async {
                async_template(created_at)
            } else {
                basic_template(&url, created_at)
            };
            let path = manager
                .layout()
                .write_script(&script_file_name(&name), &content)?;
            println!("Template created: {}", path.display());
        }
        SubCommand::Generate { prompt, output } => {
            let assistant = OpenAiAssistant::from_config(&config.assistant)?;
            let code = assistant.generate(&prompt).await?;
            match output {
                Some(name) => {
                    let path = manager
                        .layout()
                        .write_script(&script_file_name(&name), &code)?;
                    println!("Generated script saved: {}", path.display());
                }
                None => println!("{}", code),
            }
        }
        SubCommand::Export {
            input,
            format,
            output,
        } => {
            let input = resolve_input(&input, &manager.layout().data_dir());
            let records = read_records(&input)?;
            let output = output.unwrap_or_else(|| default_output(&input, format));
            let path = format.exporter().export(&records, &output)?;
            println!(
                "Exported {} records as {}: {}",
                records.len(),
                format,
                path.display()
            );
        }
    }

    Ok(())
}

fn print_build_output(stdout: &str, stderr: &str) {
    if !stdout.trim().is_empty() {
        eprintln!("--- build stdout ---\n{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        eprintln!("--- build stderr ---\n{}", stderr.trim_end());
    }
}
