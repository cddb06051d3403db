use std::fs::{self, File};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use memmap2::Mmap;
use rayon::prelude::*;
use rootcause::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use naomilib::data::provenance::{Provenance, file_name_of};
use naomilib::export::image::{ImageFormat, save_act, save_raster};
use naomilib::models::archive::{read_archive_table, swap_words};
use naomilib::models::report::ModelReport;
use naomilib::models::{
    AxisTransform, DecodeOptions, FormatRevision, NaomiModel, Orientation, decode_model,
    write_model,
};
use naomilib::textures::{self, decode_pvr, parse_pvp, texture_path};

/// Inspect, dump and patch NaomiLib models; decode PVR textures.
#[derive(Parser)]
#[command(name = "naomilib", version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Info {
        #[arg(required = true)]
        inputs: Vec<String>,

        #[arg(long)]
        report: bool,

        /// Write each report to `Log/<file>.txt` next to the model
        #[arg(long)]
        log: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    Dump {
        model: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Apply an edited `dump` document back onto its model file
    Patch {
        model: PathBuf,
        document: PathBuf,
    },
    Archive {
        archive: PathBuf,

        #[arg(long)]
        extract: Option<PathBuf>,

        /// Byte-swap every word of extracted children
        #[arg(long, requires = "extract")]
        swap: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    Texture {
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Palette for paletted textures (defaults to a `.pvp` beside each texture)
        #[arg(long)]
        palette: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,

        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        flip: bool,

        #[arg(long)]
        act: bool,
    },
}

#[derive(Args, Clone, Copy)]
struct DecodeArgs {
    #[arg(long, default_value = "y")]
    orientation: Orientation,

    #[arg(long)]
    negate_x: bool,

    #[arg(long, value_enum, default_value_t = RevisionArg::Current)]
    revision: RevisionArg,
}

#[derive(ValueEnum, Clone, Copy)]
enum RevisionArg {
    Legacy,
    Current,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Png,
    Bmp,
    Tga,
}

impl From<OutputFormat> for ImageFormat {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tga => ImageFormat::Tga,
        }
    }
}

impl DecodeArgs {
    fn options(self) -> DecodeOptions {
        DecodeOptions::builder()
            .transform(AxisTransform::new(self.orientation, self.negate_x))
            .revision(match self.revision {
                RevisionArg::Legacy => FormatRevision::Legacy,
                RevisionArg::Current => FormatRevision::Current,
            })
            .build()
    }
}

/// Everything `patch` needs to re-apply an edited model to its source file.
#[derive(Serialize, Deserialize)]
struct EditDocument {
    provenance: Provenance,
    options: DecodeOptions,
    model: NaomiModel,
}

fn map_file(path: &Path) -> Result<Mmap, Report> {
    let file = File::open(path).context_with(|| format!("Could not open {}", path.display()))?;
    // Safety: inputs are only read, and are not expected to change while mapped.
    let mmap = unsafe { Mmap::map(&file) }
        .context_with(|| format!("Could not map {}", path.display()))?;
    Ok(mmap)
}

/// Expand glob patterns; plain paths that exist are taken as is.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, Report> {
    let mut paths = Vec::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if path.exists() {
            paths.push(path);
            continue;
        }
        let matches = glob::glob(input).context_with(|| format!("Invalid pattern {input}"))?;
        let before = paths.len();
        paths.extend(matches.filter_map(Result::ok).filter(|p| p.is_file()));
        if paths.len() == before {
            warn!(pattern = %input, "no files matched");
        }
    }
    Ok(paths)
}

fn progress(len: usize) -> ProgressBar {
    if len < 2 {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len as u64).with_style(style)
}

fn summarize(name: &str, model: &NaomiModel) -> String {
    let textures: Vec<String> = model
        .meshes
        .iter()
        .filter(|m| m.header.has_texture())
        .map(|m| m.header.texture_id.to_string())
        .collect();
    format!(
        "{name}: {:?}, {}, {} meshes, {} vertices, {} triangles, textures [{}]",
        model.endianness,
        model.header.index_mode.label(),
        model.meshes.len(),
        model.vertex_count(),
        model.triangle_count(),
        textures.join(", ")
    )
}

fn inspect_model(
    path: &Path,
    options: &DecodeOptions,
    report: bool,
    log: bool,
) -> Result<String, Report> {
    let data = map_file(path)?;
    let model = decode_model(&data, options)
        .context_with(|| format!("Failed to decode {}", path.display()))?;
    let mut out = summarize(&path.display().to_string(), &model);
    if report || log {
        let text = ModelReport::new(&model, options.revision).to_string();
        if log {
            write_log(path, &text)?;
        }
        if report {
            out.push('\n');
            out.push_str(&text);
        }
    }
    for mesh in model.meshes.iter().filter(|m| m.header.has_texture()) {
        if let Some(texture) = texture_path(path, mesh.header.texture_id, "png")
            && !texture.is_file()
        {
            debug!(texture = %texture.display(), "referenced texture not found");
        }
    }
    Ok(out)
}

fn info(inputs: &[String], report: bool, log: bool, decode: DecodeArgs) -> Result<(), Report> {
    let paths = expand_inputs(inputs)?;
    let options = decode.options();
    let bar = progress(paths.len());
    let results: Vec<(PathBuf, Result<String, Report>)> = paths
        .into_par_iter()
        .progress_with(bar)
        .map(|path| {
            let result = inspect_model(&path, &options, report, log);
            (path, result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(text) => println!("{text}"),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err:?}", path.display());
            }
        }
    }
    if failed > 0 {
        return Err(rootcause::report!("{failed} model(s) failed to decode"));
    }
    Ok(())
}

fn write_log(model_path: &Path, text: &str) -> Result<(), Report> {
    let dir = model_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("Log");
    fs::create_dir_all(&dir).context("Could not create log directory")?;
    let name = model_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let log_path = dir.join(format!("{name}.txt"));
    fs::write(&log_path, text).context("Could not write model log")?;
    info!(path = %log_path.display(), "model log saved");
    Ok(())
}

fn dump(model_path: &Path, output: Option<PathBuf>, decode: DecodeArgs) -> Result<(), Report> {
    let data = map_file(model_path)?;
    let options = decode.options();
    let model = decode_model(&data, &options).context("Failed to decode model")?;
    let document = EditDocument {
        provenance: Provenance::new(file_name_of(model_path), &data),
        options,
        model,
    };
    let output = output.unwrap_or_else(|| model_path.with_extension("json"));
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize model")?;
    fs::write(&output, json).context_with(|| format!("Could not write {}", output.display()))?;
    info!(path = %output.display(), "wrote edit document");
    Ok(())
}

fn patch(model_path: &Path, document_path: &Path) -> Result<(), Report> {
    let json = fs::read_to_string(document_path)
        .context_with(|| format!("Could not read {}", document_path.display()))?;
    let document: EditDocument =
        serde_json::from_str(&json).context("Edit document is not valid")?;
    write_model(
        model_path,
        &document.provenance,
        &document.model,
        &document.options,
    )
    .context_with(|| format!("Failed to patch {}", model_path.display()))?;
    Ok(())
}

fn archive(
    archive_path: &Path,
    extract: Option<PathBuf>,
    swap: bool,
    decode: DecodeArgs,
) -> Result<(), Report> {
    let data = map_file(archive_path)?;
    let table = read_archive_table(&data).context("Failed to read archive table")?;
    let options = decode.options();
    println!(
        "{}: {:?} archive, {} children",
        archive_path.display(),
        table.endianness,
        table.entries.len()
    );

    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(dir) = &extract {
        fs::create_dir_all(dir).context("Could not create output directory")?;
    }

    let lines: Vec<String> = table
        .entries
        .par_iter()
        .progress_with(progress(table.entries.len()))
        .map(|entry| {
            let child = match table.child(entry) {
                Ok(child) => child,
                Err(err) => return format!("  child {}: {err}", entry.index),
            };
            if let Some(dir) = &extract {
                let out = dir.join(format!("{stem}_{}.bin", entry.index));
                let bytes = if swap { swap_words(child) } else { child.to_vec() };
                if let Err(err) = fs::write(&out, bytes) {
                    warn!(path = %out.display(), %err, "could not extract child");
                }
            }
            let recovered = if entry.recovered { " (recovered)" } else { "" };
            match decode_model(child, &options) {
                Ok(model) => format!(
                    "  {}{recovered}",
                    summarize(&format!("child {} @0x{:X}", entry.index, entry.start), &model)
                ),
                Err(err) => format!("  child {}{recovered}: {err}", entry.index),
            }
        })
        .collect();
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

struct TextureArgs {
    palette: Option<PathBuf>,
    format: OutputFormat,
    out_dir: Option<PathBuf>,
    flip: bool,
    act: bool,
}

fn texture(inputs: &[String], args: TextureArgs) -> Result<(), Report> {
    let paths = expand_inputs(inputs)?;
    let shared_palette = match &args.palette {
        Some(path) => Some(parse_pvp(&map_file(path)?).context("Failed to read palette")?),
        None => None,
    };
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).context("Could not create output directory")?;
    }

    let failures: Vec<String> = paths
        .par_iter()
        .progress_with(progress(paths.len()))
        .filter_map(|path| convert_texture(path, shared_palette.as_ref(), &args).err())
        .map(|err| format!("{err:?}"))
        .collect();

    for failure in &failures {
        eprintln!("{failure}");
    }
    if !failures.is_empty() {
        return Err(rootcause::report!("{} texture(s) failed", failures.len()));
    }
    Ok(())
}

fn convert_texture(
    path: &Path,
    shared_palette: Option<&textures::Palette>,
    args: &TextureArgs,
) -> Result<(), Report> {
    let data = map_file(path)?;
    let companion = match shared_palette {
        Some(_) => None,
        None => match textures::companion_palette(path) {
            Some(pvp) => Some(parse_pvp(&map_file(&pvp)?).context("Failed to read palette")?),
            None => None,
        },
    };
    let palette = shared_palette.or(companion.as_ref());
    let mut texture = decode_pvr(&data, palette)
        .context_with(|| format!("Failed to decode {}", path.display()))?;
    if args.flip {
        texture.raster.flip_vertical();
    }

    let format = ImageFormat::from(args.format);
    let dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out = dir.join(format!("{stem}.{}", format.extension()));
    save_raster(&out, &texture.raster)
        .context_with(|| format!("Failed to write {}", out.display()))?;

    if args.act
        && let Some(palette) = texture.raster.palette()
    {
        save_act(&dir.join(format!("{stem}.act")), palette).context("Failed to write palette")?;
    }

    let header = &texture.header;
    let gbix = match header.global_index {
        Some(gbix) => format!(" gbix {}", gbix.primary),
        None => String::new(),
    };
    let palette_state = if texture.raster.is_indexed() && palette.is_none() {
        " (grayscale palette)"
    } else {
        ""
    };
    info!(
        "{} -> {} ({}x{} {} {}{gbix}){palette_state}",
        path.display(),
        out.display(),
        header.width,
        header.height,
        header.texture_format,
        header.pixel_format,
    );
    Ok(())
}

fn main() -> Result<(), Report> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info {
            inputs,
            report,
            log,
            decode,
        } => info(&inputs, report, log, decode),
        Commands::Dump {
            model,
            output,
            decode,
        } => dump(&model, output, decode),
        Commands::Patch { model, document } => patch(&model, &document),
        Commands::Archive {
            archive: path,
            extract,
            swap,
            decode,
        } => archive(&path, extract, swap, decode),
        Commands::Texture {
            inputs,
            palette,
            format,
            out_dir,
            flip,
            act,
        } => texture(
            &inputs,
            TextureArgs {
                palette,
                format,
                out_dir,
                flip,
                act,
            },
        ),
    }
}
