//! dumpxref - Inspect PDF trailers, xref tables and objects
//!
//! A command line tool for dumping the trailer chain, the merged
//! cross-reference table, the page list or individual objects of a PDF.

use clap::{ArgGroup, Parser};
use memmap2::Mmap;
use quire_core::config::ParseOptions;
use quire_core::document::PdfDocument;
use quire_core::model::{IndirectRef, PdfObject};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::Level;

/// Stream output for a dumped object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamCodec {
    Serialized,
    Raw,
    Decoded,
}

#[derive(Parser, Debug)]
#[command(
    name = "dumpxref",
    version,
    about = "Dump the trailers, xref table, pages or objects of a PDF file"
)]
#[command(group(ArgGroup::new("codec").args(["raw_stream", "binary_stream"])))]
struct Args {
    /// PDF file to inspect
    #[arg(required = true)]
    file: PathBuf,

    /// Use debug logging level
    #[arg(short = 'd', long)]
    debug: bool,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Print every trailer, newest first
    #[arg(short = 't', long = "trailers")]
    show_trailers: bool,

    /// Print the merged xref table
    #[arg(short = 'x', long = "xref")]
    show_xref: bool,

    /// Print the page list in document order
    #[arg(short = 'p', long = "pages")]
    show_pages: bool,

    /// Object IDs to dump
    #[arg(short = 'i', long = "objects", value_delimiter = ',')]
    objids: Vec<u32>,

    /// Write stream objects as raw bytes
    #[arg(short = 'r', long = "raw-stream")]
    raw_stream: bool,

    /// Write stream objects with their filter decoded
    #[arg(short = 'b', long = "binary-stream")]
    binary_stream: bool,

    /// Byte offset of the %PDF header within the file
    #[arg(long, default_value_t = 0)]
    start_offset: usize,
}

fn dump_trailers<W: Write>(out: &mut W, doc: &PdfDocument) -> io::Result<()> {
    for (index, trailer) in doc.trailers().iter().enumerate() {
        writeln!(out, "% trailer {index}")?;
        out.write_all(&trailer.to_bytes())?;
        writeln!(out)?;
    }
    if let Some(offset) = doc.last_xref_section_offset() {
        writeln!(out, "startxref {offset}")?;
    }
    Ok(())
}

fn dump_xref<W: Write>(out: &mut W, doc: &PdfDocument) -> io::Result<()> {
    writeln!(out, "{:>8} {:>12} {:>5}", "id", "offset", "gen")?;
    for (object_id, entry) in doc.xref().entries() {
        writeln!(
            out,
            "{object_id:>8} {:>12} {:>5}",
            entry.offset, entry.generation
        )?;
    }
    writeln!(out, "size {}", doc.xref().len())?;
    Ok(())
}

fn dump_pages<W: Write>(out: &mut W, doc: &PdfDocument) -> io::Result<()> {
    for (pageno, page) in doc.pages().iter().enumerate() {
        writeln!(out, "{} {page}", pageno + 1)?;
    }
    Ok(())
}

fn dump_object<W: Write>(
    out: &mut W,
    doc: &mut PdfDocument,
    object_id: u32,
    codec: StreamCodec,
) -> Result<(), Box<dyn Error>> {
    let entry = doc
        .xref()
        .get(object_id)
        .ok_or_else(|| format!("object {object_id} not in xref table"))?;
    let reference = IndirectRef::new(object_id, entry.generation);
    let value = doc.materialize(reference)?;
    match (value, codec) {
        (PdfObject::Stream(stream), StreamCodec::Raw) => out.write_all(stream.raw_data())?,
        (PdfObject::Stream(stream), StreamCodec::Decoded) => out.write_all(&stream.decode()?)?,
        (value, _) => {
            writeln!(out, "{}", reference.definition())?;
            out.write_all(&value.to_bytes())?;
            writeln!(out, "\nendobj")?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let file = File::open(&args.file)?;
    // SAFETY: the file is opened read-only and not modified while mapped.
    let mmap = unsafe { Mmap::map(&file)? };
    let options = ParseOptions::default().with_start_offset(args.start_offset);
    let mut doc = PdfDocument::from_mmap(mmap, options)?;

    let codec = if args.raw_stream {
        StreamCodec::Raw
    } else if args.binary_stream {
        StreamCodec::Decoded
    } else {
        StreamCodec::Serialized
    };

    let mut out: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(&args.outfile)?))
    };

    let nothing_selected =
        !args.show_trailers && !args.show_xref && !args.show_pages && args.objids.is_empty();
    if args.show_trailers || nothing_selected {
        dump_trailers(&mut out, &doc)?;
    }
    if args.show_xref {
        dump_xref(&mut out, &doc)?;
    }
    if args.show_pages {
        dump_pages(&mut out, &doc)?;
    }
    for object_id in &args.objids {
        dump_object(&mut out, &mut doc, *object_id, codec)?;
    }

    out.flush()?;
    Ok(())
}
