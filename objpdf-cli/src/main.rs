use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use objpdf::parser::XRefEntry;
use objpdf::writer::serialize::to_bytes;
use objpdf::{CompressionLevel, Document, DocumentInfo, ObjectId, WriterConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "objpdf",
    about = "Inspect and rewrite the object graph of PDF files",
    version,
    author
)]
struct Cli {
    /// Log parser and writer activity
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, object count and document information
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// List the merged cross-reference table
    Xref {
        /// Input PDF file
        input: PathBuf,
    },

    /// Print one object in PDF syntax
    Show {
        /// Input PDF file
        input: PathBuf,

        /// Object number
        number: u32,

        /// Generation number
        #[arg(default_value_t = 0)]
        generation: u16,
    },

    /// Write the document again with a cross-reference stream
    Rewrite {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Stream compression: none, fastest, optimal or smallest
        #[arg(short, long, default_value = "optimal")]
        compression: CompressionLevel,

        /// Pack eligible objects into object streams
        #[arg(long)]
        pack: bool,
    },

    /// Change document information fields and save
    SetInfo {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        keywords: Option<String>,

        #[arg(long)]
        creator: Option<String>,

        #[arg(long)]
        producer: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            let mut doc = open(&input)?;
            let info = doc.info()?;

            println!("PDF Information for: {}", input.display());
            println!("==========================================");
            println!("PDF Version: {}", doc.version());
            println!("Objects: {}", doc.object_count()?);
            println!("Encrypted: {}", if doc.is_encrypted() { "yes" } else { "no" });
            print_info(&info);
        }

        Commands::Xref { input } => {
            let doc = open(&input)?;
            for (number, entry) in doc.xref_table().iter() {
                match entry {
                    XRefEntry::Free { next, generation } => {
                        println!("{number} {generation} free next={next}")
                    }
                    XRefEntry::Indirect { offset, generation } => {
                        println!("{number} {generation} offset={offset}")
                    }
                    XRefEntry::Compressed { container, index } => {
                        println!("{number} 0 in-stream={container} index={index}")
                    }
                }
            }
        }

        Commands::Show {
            input,
            number,
            generation,
        } => {
            let mut doc = open(&input)?;
            let id = ObjectId::new(number, generation);
            let Some(object) = doc.get_object(id)? else {
                bail!("object {number} {generation} not found");
            };

            let mut out = std::io::stdout().lock();
            writeln!(out, "{number} {generation} obj")?;
            out.write_all(&to_bytes(object.value()))?;
            writeln!(out, "\nendobj")?;
        }

        Commands::Rewrite {
            input,
            output,
            compression,
            pack,
        } => {
            let mut doc = open(&input)?;
            let config = WriterConfig::default()
                .with_compression(compression)
                .with_object_streams(pack);
            debug!("rewriting with {:?}", config);
            save(&mut doc, &output, &config)?;

            println!("Rewritten to {}", output.display());
        }

        Commands::SetInfo {
            input,
            output,
            title,
            author,
            subject,
            keywords,
            creator,
            producer,
        } => {
            let mut doc = open(&input)?;
            let mut changed = false;

            if let Some(title) = title {
                doc.set_title(title)?;
                changed = true;
            }
            if let Some(author) = author {
                doc.set_author(author)?;
                changed = true;
            }
            if let Some(subject) = subject {
                doc.set_subject(subject)?;
                changed = true;
            }
            if let Some(keywords) = keywords {
                doc.set_keywords(keywords)?;
                changed = true;
            }
            if let Some(creator) = creator {
                doc.set_creator(creator)?;
                changed = true;
            }
            if let Some(producer) = producer {
                doc.set_producer(producer)?;
                changed = true;
            }
            if changed {
                doc.update_modification_date()?;
            } else {
                info!("no information fields given, saving unchanged");
            }

            save(&mut doc, &output, &WriterConfig::default())?;
            println!("Document information updated in {}", output.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("failed to open {}", path.display()))
}

fn save(doc: &mut Document, path: &Path, config: &WriterConfig) -> Result<()> {
    doc.save_to_path(path, config)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn print_info(info: &DocumentInfo) {
    let fields = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if let Some(date) = &info.creation_date {
        println!("Created: {date}");
    }
    if let Some(date) = &info.modification_date {
        println!("Modified: {date}");
    }
}
