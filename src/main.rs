// ┌─┐┬─┐─┐ ┬┬┬  ┬  ┌─┐┬ ┬┬─┐┌─┐┌┬┐┌─┐┬─┐
// ├─┤├┬┘┌┴┬┘│└┐┌┘  │  │ │├┬┘├─┤ │ │ │├┬┘
// ┴ ┴┴└─┴ └─┴ └┘   └─┘└─┘┴└─┴ ┴ ┴ └─┘┴└─

// Requires an OpenAI API key or a local Ollama.
// Turns a research wish into an arXiv query, lets a model pick and explain the best papers, saves them as JSON.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use anyhow::Result;
use arxiv_curator::config::Args;
use arxiv_curator::pipeline::RunSummary;
use arxiv_curator::progress::LogBuffer;
use arxiv_curator::web::start_web_server;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_summary(summary: &RunSummary) {
    println!("{}", "=".repeat(64));
    println!("Query: {}", summary.query);
    println!(
        "Selected {} of {} retrieved papers",
        summary.report.papers.len(),
        summary.candidates
    );
    println!("Saved to: {}", summary.output.display());
    println!("{}", "=".repeat(64));

    for paper in &summary.report.papers {
        println!("\n{}", paper.title);
        println!("Authors: {}", paper.authors.join(", "));
        println!("Published: {}", paper.published);
        println!("Abstract: {}", paper.abstract_text);
        println!("PDF: {}", paper.pdf_url);
        println!("Why Selected: {}", paper.explanation);
        println!("{}", "-".repeat(64));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        provider = ?args.provider,
        model = %args.model_name(),
        output = %args.output.display(),
        "configuration loaded"
    );

    let pipeline = args.build_pipeline().await?;

    match &args.wish {
        Some(wish) => {
            let summary = pipeline.kickoff(wish).await?;
            print_summary(&summary);
        }
        None => start_web_server(pipeline, LogBuffer::new(), args.port).await,
    }

    Ok(())
}
