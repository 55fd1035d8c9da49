//! editpages - Reorder pages and edit document info with an incremental update
//!
//! A command line tool that appends a new catalog, a flattened page tree and
//! an optional Info dictionary to an existing PDF without rewriting it.

use chrono::{DateTime, Utc};
use clap::Parser;
use quire_core::config::ParseOptions;
use quire_core::document::{IncrementalWriter, PdfDocument};
use quire_core::model::PdfDict;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(
    name = "editpages",
    version,
    about = "Reorder or drop pages and set document info by appending an incremental update"
)]
struct Args {
    /// PDF file to update
    #[arg(required = true)]
    file: PathBuf,

    /// Use debug logging level
    #[arg(short = 'd', long)]
    debug: bool,

    /// Copy the input here and update the copy instead of the input
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// New page order as comma-separated page numbers (1-based)
    #[arg(long, value_delimiter = ',')]
    pages: Vec<usize>,

    /// Document title
    #[arg(long)]
    title: Option<String>,

    /// Document author
    #[arg(long)]
    author: Option<String>,

    /// Document subject
    #[arg(long)]
    subject: Option<String>,

    /// Comment line written before the update
    #[arg(long)]
    comment: Option<String>,
}

/// Set the given text entries and, if any was set, stamp `ModDate` with `now`.
/// Returns whether the dictionary changed.
fn edit_info<'a>(
    info: &mut PdfDict,
    fields: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    now: DateTime<Utc>,
) -> bool {
    let mut edited = false;
    for (key, value) in fields {
        if let Some(value) = value {
            info.set_text(key, value);
            edited = true;
        }
    }
    if edited {
        info.set_date("ModDate", now.naive_utc());
    }
    edited
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let target = match &args.outfile {
        Some(outfile) => {
            fs::copy(&args.file, outfile)?;
            outfile.clone()
        }
        None => args.file.clone(),
    };

    let mut doc = PdfDocument::open(&target, ParseOptions::default())?;

    if !args.pages.is_empty() {
        let current = doc.pages().to_vec();
        let mut order = Vec::with_capacity(args.pages.len());
        for pageno in &args.pages {
            let page = pageno
                .checked_sub(1)
                .and_then(|index| current.get(index))
                .ok_or_else(|| format!("page {pageno} out of range 1..={}", current.len()))?;
            order.push(*page);
        }
        *doc.pages_mut() = order;
    }

    edit_info(
        doc.info_mut(),
        [
            ("Title", args.title.as_deref()),
            ("Author", args.author.as_deref()),
            ("Subject", args.subject.as_deref()),
        ],
        Utc::now(),
    );

    // The document releases its mapping before the writer touches the file.
    doc.close();
    let out = OpenOptions::new().read(true).write(true).open(&target)?;
    let mut writer = IncrementalWriter::new(&mut doc, out)?;
    if let Some(comment) = &args.comment {
        writer.write_comment(comment)?;
    }
    let root = writer.write_catalog()?;
    let startxref = writer.write_xref_and_trailer(None)?;
    writer.finish()?;

    info!(root = %root, startxref, pages = doc.pages().len(), "appended update");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_mod_date_is_utc() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = tokyo
            .with_ymd_and_hms(2026, 10, 19, 6, 26, 44)
            .unwrap()
            .with_timezone(&Utc);
        let mut info = PdfDict::new();
        assert!(edit_info(&mut info, [("Title", Some("X"))], now));

        assert_eq!(
            info.get("ModDate").unwrap().as_bytes().unwrap(),
            b"D:20261018212644Z"
        );
        assert_eq!(info.get_date("ModDate").unwrap(), Some(now.naive_utc()));
        assert_eq!(info.get_text("Title").unwrap().as_deref(), Some("X"));
    }

    #[test]
    fn test_no_fields_leaves_info_alone() {
        let mut info = PdfDict::new();
        assert!(!edit_info(&mut info, [("Title", None), ("Author", None)], Utc::now()));
        assert!(info.is_empty());
    }
}
