use clap::{Parser, Subcommand};
use cv_press::bib::Library;
use cv_press::cite::{CitationSource, Formatter};
use cv_press::pdf::{self, ChromePrinter, PdfOptions};
use cv_press::{config, output, render};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cv-press")]
#[command(about = "Format a CV from TOML sections and BibTeX files into HTML and PDF")]
#[command(long_about = "\
Format a CV from TOML sections and BibTeX files into HTML and PDF

The project directory holds a cv.toml and the bibliographies it lists:

  my-cv/
  ├── cv.toml              # Profile, sections, documents, theme
  ├── publications.bib     # Citation keys must be unique across all files
  └── talks/               # A directory contributes every *.bib beneath it
      └── 2020.bib

Sections hold either free-text items or citation keys. Each document picks
sections by id and is written as <output>.html, then printed to <output>.pdf
with headless Chrome.

Supported entry types: article, inproceedings (conference), techreport
(report), incollection.

Run 'cv-press gen-config' to generate a documented cv.toml.")]
#[command(version)]
struct Cli {
    /// Project directory containing cv.toml
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Write HTML only, skip printing PDFs
    #[arg(long)]
    no_pdf: bool,

    /// Build only the named documents (by output name); repeatable
    #[arg(long = "document", value_name = "OUTPUT")]
    documents: Vec<String>,
}

#[derive(clap::Args, Clone)]
struct CiteArgs {
    /// Citation keys to format
    #[arg(required = true)]
    keys: Vec<String>,

    /// Print a JSON object mapping key to HTML
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render every document to HTML, then print PDFs
    Build(BuildArgs),
    /// Load the project and resolve every citation without writing files
    Check,
    /// Format individual citations
    Cite(CiteArgs),
    /// Print a stock cv.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build(args) => {
            let config = config::load_config(&cli.project)?;

            println!("==> Loading bibliography");
            let library = Library::load(&config.bibliography_paths(&cli.project))?;
            output::print_load_output(library.sources(), &cli.project);

            let formatter = Formatter::new(&library, config.name_style());
            let documents = render::select_documents(&config, &args.documents)?;

            println!("==> Writing HTML → {}", cli.output.display());
            let mut rendered =
                render::render_documents(&config, &documents, &formatter, &cli.output)?;
            output::print_render_output(&rendered, Path::new(""));

            if args.no_pdf {
                rendered.iter_mut().for_each(|d| d.wants_pdf = false);
            }
            if rendered.iter().any(|d| d.wants_pdf) {
                println!("==> Printing PDF");
                let options = PdfOptions::from(&config.pdf);
                let printed = pdf::print_documents(&ChromePrinter, &rendered, &options)?;
                output::print_pdf_output(&printed, Path::new(""));
            }

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.project.display());
            let config = config::load_config(&cli.project)?;
            let library = Library::load(&config.bibliography_paths(&cli.project))?;
            output::print_load_output(library.sources(), &cli.project);

            let formatter = Formatter::new(&library, config.name_style());
            let documents = render::select_documents(&config, &[])?;
            let resolved = render::resolve_all(&config, &documents, &formatter)?;
            output::print_check_output(&resolved);
            println!("==> Project is valid");
        }
        Command::Cite(args) => {
            let config = config::load_config(&cli.project)?;
            let library = Library::load(&config.bibliography_paths(&cli.project))?;
            let formatter = Formatter::new(&library, config.name_style());

            let citations = args
                .keys
                .iter()
                .map(|key| Ok((key.clone(), formatter.reference(key)?)))
                .collect::<Result<Vec<_>, cv_press::cite::CiteError>>()?;

            if args.json {
                let map: BTreeMap<_, _> = citations.into_iter().collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                output::print_citations(&citations);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
