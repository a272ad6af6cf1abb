//! rt11dir - RT-11 volume image tool
//!
//! Lists directories, copies files to and from volume images, splits
//! directory segments and initializes new images.

mod pattern;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rt11_common::date::format_date_word;
use rt11_common::{Config, Error, RtDate, decode_rad50};
use rt11_storage::{
    BlockStore, CreateOptions, CreateOutcome, DirectoryListing, EntryKind, FormatOptions,
    ImageFile, SpaceSummary, Volume,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rt11dir")]
#[command(about = "Inspect and modify RT-11 volume images")]
#[command(version)]
struct Args {
    /// Volume image file
    image: PathBuf,

    /// Configuration file
    #[arg(short, long, default_value = "rt11dir.toml")]
    config: String,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the volume directory
    List {
        /// Names only
        #[arg(long)]
        brief: bool,
        /// Include empty regions
        #[arg(long)]
        empty: bool,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
        /// Show the directory segment chain
        #[arg(long)]
        segments: bool,
    },
    /// Copy files from the volume to the host
    CopyFrom {
        /// Volume name pattern (NAME.EXT, `*` and `?` allowed)
        #[arg(default_value = "*.*")]
        pattern: String,
        /// Destination directory
        #[arg(long)]
        to: Option<String>,
        /// Skip files that already exist on the host
        #[arg(long)]
        no_replace: bool,
    },
    /// Copy host files onto the volume
    CopyTo {
        /// Host files (wildcards in the file name are expanded)
        #[arg(required = true)]
        sources: Vec<String>,
        /// Skip files already present on the volume
        #[arg(long)]
        no_replace: bool,
        /// Date to record (dd-MMM-yy), today when unset
        #[arg(long)]
        date: Option<String>,
    },
    /// Split a directory segment in two
    Split {
        /// Segment number
        segment: u16,
    },
    /// Show the home block
    Home,
    /// Create and format a new image
    Init {
        /// Image size in blocks
        #[arg(long)]
        blocks: u32,
        /// Directory segment slots (1-31)
        #[arg(long)]
        segments: Option<u16>,
        /// Extra bytes per directory entry
        #[arg(long)]
        extra_bytes: Option<u16>,
        /// Block holding directory segment 1
        #[arg(long)]
        first_dir_block: Option<u16>,
        /// Overwrite an existing image
        #[arg(long)]
        force: bool,
    },
}

fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        return Ok(Config::default());
    }
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    Ok(toml::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to parse config file: {}", e);
        Config::default()
    }))
}

fn open_volume(image: &Path, read_only: bool) -> Result<Volume<ImageFile>> {
    let file = ImageFile::open(image, read_only)?;
    Volume::open(file).with_context(|| format!("{} is not a usable volume", image.display()))
}

fn report_warnings(listing: &DirectoryListing) {
    for warning in &listing.warnings {
        eprintln!("Warning: directory listing incomplete: {}", warning);
    }
}

fn list(image: &Path, brief: bool, show_empty: bool, json: bool, segments: bool) -> Result<()> {
    let volume = open_volume(image, true)?;
    let listing = volume.read_directory()?;
    let space = SpaceSummary::from_entries(&listing.entries);

    if json {
        let doc = serde_json::json!({
            "image": image.display().to_string(),
            "directory": listing,
            "space": space,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    if !brief {
        println!("Directory of {}", image.display());
        println!();
    }

    for entry in &listing.entries {
        match entry.kind() {
            EntryKind::Empty if !show_empty => continue,
            EntryKind::Permanent | EntryKind::Empty => {}
            EntryKind::Tentative | EntryKind::EndOfSegment => continue,
        }
        let label = if entry.kind() == EntryKind::Empty {
            "<EMPTY>".to_string()
        } else {
            entry.name().to_string()
        };

        if brief {
            println!("{label}");
            continue;
        }
        let date = if entry.kind() == EntryKind::Empty {
            String::new()
        } else {
            format_date_word(entry.entry.date)
        };
        let line = format!(
            "{:<12} len={:<6} start={:<6} {}",
            label,
            entry.length(),
            entry.start_block,
            date
        );
        println!("{}", line.trim_end());
    }

    if !brief {
        println!();
        println!("Files: {}", space.files);
        println!("Total used blocks: {}", space.used_blocks);
        println!("Total free blocks: {}", space.free_blocks);
    }

    if segments {
        println!();
        println!(
            "Segments: {} of {} in use (highest {})",
            listing.segments.len(),
            listing.total_segments,
            listing.highest_in_use
        );
        println!("{:<8} {:<8} {:<6} {:<8} {:<10}", "SEGMENT", "BLOCK", "NEXT", "ENTRIES", "FREE SLOTS");
        println!("{}", "-".repeat(44));
        for seg in &listing.segments {
            println!(
                "{:<8} {:<8} {:<6} {:<8} {:<10}",
                seg.number, seg.block, seg.next_segment, seg.entries, seg.free_slots
            );
        }
    }

    report_warnings(&listing);
    Ok(())
}

fn destination_dir(to: Option<&str>) -> PathBuf {
    let Some(to) = to else {
        return PathBuf::from(".");
    };
    let path = Path::new(to);
    // a trailing wildcard names files, keep only its directory
    if pattern::has_wildcard(to) {
        return match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
    }
    path.to_path_buf()
}

fn copy_from(image: &Path, pattern: &str, to: Option<&str>, no_replace: bool) -> Result<()> {
    let volume = open_volume(image, true)?;
    let listing = volume.read_directory()?;
    report_warnings(&listing);

    let dest = destination_dir(to);
    let volume_pattern = pattern::VolumePattern::new(pattern);
    let matches: Vec<_> = listing
        .files()
        .filter(|e| volume_pattern.matches(e.name()))
        .collect();
    if matches.is_empty() {
        return Err(Error::FileNotFound(pattern.to_string()))
            .with_context(|| format!("no files on {} match", image.display()));
    }

    for entry in matches {
        let out = dest.join(entry.name().to_string());
        if no_replace && out.exists() {
            println!("Skipping {}: already exists (no-replace)", out.display());
            continue;
        }
        let data = volume
            .read_file(entry)
            .with_context(|| format!("cannot copy {}", entry.name()))?;
        std::fs::write(&out, &data)
            .with_context(|| format!("failed writing {}", out.display()))?;
        info!("copied {} ({} bytes)", entry.name(), data.len());
        println!("Copied {} -> {}", entry.name(), out.display());
    }
    Ok(())
}

fn expand_sources(sources: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for source in sources {
        let path = Path::new(source);
        let file_part = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        if pattern::has_wildcard(&file_part) {
            let found = pattern::expand_host_wildcard(path)
                .with_context(|| format!("cannot expand {source}"))?;
            if found.is_empty() {
                bail!("no host files match {source}");
            }
            paths.extend(found);
        } else {
            if !path.is_file() {
                bail!("source file does not exist: {source}");
            }
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn copy_to(image: &Path, sources: &[String], options: &CreateOptions) -> Result<()> {
    let paths = expand_sources(sources)?;
    let mut volume = open_volume(image, false)?;

    for path in paths {
        let host_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        let data =
            std::fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;

        match volume
            .create_file(&host_name, &data, options)
            .with_context(|| format!("cannot copy {}", path.display()))?
        {
            CreateOutcome::Created(entry) => println!(
                "Copied {} -> {} ({} blocks at block {})",
                path.display(),
                entry.name(),
                entry.length(),
                entry.start_block
            ),
            CreateOutcome::Skipped(entry) => {
                println!(
                    "Skipping {}: already exists on volume (no-replace)",
                    entry.name()
                );
            }
        }
    }
    Ok(())
}

fn split(image: &Path, segment: u16) -> Result<()> {
    let mut volume = open_volume(image, false)?;
    let outcome = volume.split_segment(segment)?;
    println!(
        "Split segment {}: {} entries kept, {} moved to segment {}",
        outcome.segment, outcome.kept, outcome.moved, outcome.new_segment
    );
    println!("Highest segment in use: {}", outcome.highest_in_use);
    Ok(())
}

fn home(image: &Path) -> Result<()> {
    let volume = open_volume(image, true)?;
    let home = volume.home_block()?;

    println!("Home block of {}", image.display());
    println!();
    println!("Bad block table (word 16):");
    if home.bad_blocks.is_empty() {
        println!("  (no bad blocks registered)");
    }
    for (i, entry) in home.bad_blocks.iter().enumerate() {
        println!("  Entry {}: block {}, count {}", i, entry.block, entry.count);
    }
    println!();
    println!(
        "First directory block (word 234): {} (effective {})",
        home.first_dir_block_raw,
        home.first_dir_block()
    );
    println!("Pack cluster size (word 233): {}", home.pack_cluster_size);
    println!(
        "System version (word 235): {:#06x} ({})",
        home.system_version,
        decode_rad50(home.system_version)
    );
    Ok(())
}

fn init(image: &Path, blocks: u32, options: &FormatOptions, force: bool) -> Result<()> {
    if image.exists() && !force {
        bail!("{} already exists, use --force to overwrite", image.display());
    }
    let file = ImageFile::create(image, blocks)?;
    let volume = Volume::format(file, options)?;
    let listing = volume.read_directory()?;

    println!(
        "Initialized {}: {} blocks, {} directory segments, data starts at block {}",
        image.display(),
        volume.store().total_blocks(),
        listing.total_segments,
        listing.data_start_block
    );
    println!(
        "Free blocks: {}",
        SpaceSummary::from_entries(&listing.entries).free_blocks
    );
    Ok(())
}

fn transfer_date(cli: Option<&str>, config: Option<&str>) -> Result<Option<RtDate>> {
    match cli.or(config) {
        Some(s) => Ok(Some(RtDate::parse(s)?)),
        None => {
            let today = RtDate::today();
            if today.is_none() {
                warn!("current date cannot be represented, files will carry no date");
            }
            Ok(today)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::List {
            brief,
            empty,
            json,
            segments,
        } => list(&args.image, brief, empty, json, segments),
        Commands::CopyFrom {
            pattern,
            to,
            no_replace,
        } => copy_from(
            &args.image,
            &pattern,
            to.as_deref(),
            no_replace || config.transfer.no_replace,
        ),
        Commands::CopyTo {
            sources,
            no_replace,
            date,
        } => {
            let options = CreateOptions {
                date: transfer_date(date.as_deref(), config.transfer.date.as_deref())?,
                no_replace: no_replace || config.transfer.no_replace,
            };
            copy_to(&args.image, &sources, &options)
        }
        Commands::Split { segment } => split(&args.image, segment),
        Commands::Home => home(&args.image),
        Commands::Init {
            blocks,
            segments,
            extra_bytes,
            first_dir_block,
            force,
        } => {
            let defaults = FormatOptions::from(&config.format);
            let options = FormatOptions {
                total_segments: segments.unwrap_or(defaults.total_segments),
                extra_bytes: extra_bytes.unwrap_or(defaults.extra_bytes),
                first_dir_block: first_dir_block.unwrap_or(defaults.first_dir_block),
            };
            init(&args.image, blocks, &options, force)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "rt11dir",
            "disk.dsk",
            "copy-to",
            "a.txt",
            "b.txt",
            "--no-replace",
            "--date",
            "15-JAN-97",
        ])
        .unwrap();
        let Commands::CopyTo {
            sources,
            no_replace,
            date,
        } = args.command
        else {
            panic!("expected copy-to");
        };
        assert_eq!(sources, vec!["a.txt", "b.txt"]);
        assert!(no_replace);
        assert_eq!(date.as_deref(), Some("15-JAN-97"));

        let args = Args::try_parse_from(["rt11dir", "disk.dsk", "copy-from"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::CopyFrom { ref pattern, .. } if pattern == "*.*"
        ));
    }

    #[test]
    fn test_load_config_missing_and_malformed() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert_eq!(
            load_config(missing.to_str().unwrap()).unwrap(),
            Config::default()
        );

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[transfer\nno_replace = ").unwrap();
        assert_eq!(load_config(bad.to_str().unwrap()).unwrap(), Config::default());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[transfer]\nno_replace = true\n").unwrap();
        assert!(load_config(good.to_str().unwrap()).unwrap().transfer.no_replace);
    }

    #[test]
    fn test_transfer_date_precedence() {
        let date = transfer_date(Some("01-FEB-85"), Some("15-JAN-97")).unwrap();
        assert_eq!(date, Some(RtDate::new(1985, 2, 1).unwrap()));

        let date = transfer_date(None, Some("15-JAN-97")).unwrap();
        assert_eq!(date, Some(RtDate::new(1997, 1, 15).unwrap()));

        assert!(transfer_date(Some("bogus"), None).is_err());
    }

    #[test]
    fn test_destination_dir() {
        assert_eq!(destination_dir(None), PathBuf::from("."));
        assert_eq!(destination_dir(Some("out")), PathBuf::from("out"));
        assert_eq!(destination_dir(Some("out/*.*")), PathBuf::from("out"));
        assert_eq!(destination_dir(Some("*.*")), PathBuf::from("."));
    }

    #[test]
    fn test_copy_round_trip_through_image() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("disk.dsk");
        init(&image, 512, &FormatOptions::default(), false).unwrap();
        assert!(init(&image, 512, &FormatOptions::default(), false).is_err());

        let src = dir.path().join("notes.txt");
        std::fs::write(&src, b"volume contents").unwrap();
        let options = CreateOptions::default();
        copy_to(&image, &[src.to_string_lossy().to_string()], &options).unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        copy_from(&image, "*.TXT", Some(out.to_str().unwrap()), false).unwrap();

        let copied = std::fs::read(out.join("NOTES.TXT")).unwrap();
        assert_eq!(copied.len(), 512);
        assert!(copied.starts_with(b"volume contents"));

        let err = copy_from(&image, "*.SAV", Some(out.to_str().unwrap()), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::FileNotFound(p)) if p == "*.SAV"
        ));
    }
}
