use std::{path::PathBuf, process::ExitCode};

use anyhow::bail;
use clap::Parser;
use handviz::{
    batch::{run_batch, BatchOptions, Inputs, DEFAULT_EXTENSIONS},
    camera::FocalLength,
    hand::estimator::SidecarEstimator,
    image::{is_supported_extension, SUPPORTED_EXTENSIONS},
    mask::DEFAULT_BORDER_WIDTH,
    pipeline::RenderConfig,
};

/// Renders hand mesh detections on top of images and writes them to an output directory.
///
/// Detections are read from `<image file name>.hands.json` sidecar files, next to each image or in
/// a directory tree mirroring the input directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct CliArgs {
    /// An input directory, searched recursively, or a list of image files.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,
    /// Directory to write results to.
    #[arg(short, long, value_name = "DIR")]
    output_dir: PathBuf,
    /// File extensions to search for in an input directory (case-insensitive). Defaults to
    /// `jpg`, `jpeg` and `png`; `gif` is supported as well.
    #[arg(long = "ext", value_name = "EXT", num_args = 1..)]
    extensions: Option<Vec<String>>,
    /// Width of the outline drawn around each hand, in pixels.
    #[arg(long, value_name = "PX", default_value_t = DEFAULT_BORDER_WIDTH)]
    border_width: u32,
    /// Focal length in pixels. When omitted, detections use their own focal length, or one derived
    /// from the image size.
    #[arg(long, value_name = "PX")]
    focal_length: Option<f32>,
    /// Directory containing the detection sidecar files.
    #[arg(long, value_name = "DIR")]
    detections_dir: Option<PathBuf>,
    /// Only write the composited image instead of placing it next to the original.
    #[arg(long)]
    composite_only: bool,
    /// Do not write detection counts into the image.
    #[arg(long)]
    no_annotations: bool,
    /// Number of images to process in parallel.
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    jobs: usize,
}

struct Config {
    render: RenderConfig,
    batch: BatchOptions,
    detections_dir: Option<PathBuf>,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> anyhow::Result<Self> {
        if args.border_width == 0 {
            bail!("--border-width must be at least 1");
        }
        if args.jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        let focal_length = match args.focal_length {
            None => FocalLength::Default,
            Some(f) if f.is_finite() && f > 0.0 => FocalLength::Fixed(f),
            Some(f) => bail!("--focal-length must be a positive number of pixels, got {f}"),
        };
        let extensions = args
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect());
        if let Some(ext) = extensions
            .iter()
            .find(|ext| !is_supported_extension(ext.trim_start_matches('.')))
        {
            bail!(
                "unsupported file extension '{ext}' passed to --ext (supported: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            );
        }

        let inputs = match &args.inputs[..] {
            [dir] if dir.is_dir() => Inputs::Dir(dir.clone()),
            files => {
                if let Some(dir) = files.iter().find(|path| path.is_dir()) {
                    bail!(
                        "'{}' is a directory; pass either one input directory or a list of files",
                        dir.display()
                    );
                }
                Inputs::Files(files.to_vec())
            }
        };

        Ok(Self {
            render: RenderConfig::default()
                .border_width(args.border_width)
                .focal_length(focal_length)
                .annotate(!args.no_annotations),
            batch: BatchOptions::new(inputs, args.output_dir)
                .extensions(&extensions)
                .side_by_side(!args.composite_only)
                .jobs(args.jobs),
            detections_dir: args.detections_dir,
        })
    }
}

fn main() -> anyhow::Result<ExitCode> {
    handviz::init_logger!();

    let config = Config::try_from(CliArgs::parse())?;
    let estimator = match config.detections_dir {
        Some(dir) => SidecarEstimator::with_dir(dir),
        None => SidecarEstimator::new(),
    };

    let summary = run_batch(estimator, config.render, &config.batch)?;
    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("{} of {} images failed", summary.failed, summary.total());
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> anyhow::Result<Config> {
        let args = CliArgs::try_parse_from(["handviz"].iter().chain(args))?;
        Config::try_from(args)
    }

    #[test]
    fn defaults() {
        let config = config(&["a.jpg", "b.png", "-o", "out"]).unwrap();
        assert_eq!(config.render, RenderConfig::default());
        assert!(matches!(config.batch.inputs(), Inputs::Files(files) if files.len() == 2));
        assert_eq!(config.batch.output_dir(), std::path::Path::new("out"));
        assert!(config.detections_dir.is_none());
    }

    #[test]
    fn directory_input() {
        let dir = std::env::temp_dir();
        let dir = dir.to_str().unwrap();
        let dir_config = config(&[dir, "-o", "out", "--ext", ".JPG", "gif"]).unwrap();
        assert!(matches!(dir_config.batch.inputs(), Inputs::Dir(_)));

        assert!(config(&[dir, "a.jpg", "-o", "out"]).is_err());
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(config(&["a.jpg", "-o", "out", "--border-width", "0"]).is_err());
        assert!(config(&["a.jpg", "-o", "out", "--focal-length", "-3"]).is_err());
        assert!(config(&["a.jpg", "-o", "out", "--focal-length", "0"]).is_err());
        assert!(config(&["a.jpg", "-o", "out", "--jobs", "0"]).is_err());
        assert!(config(&["a.jpg", "-o", "out", "--ext", "."]).is_err());
        assert!(config(&["a.jpg", "-o", "out", "--ext", "png", "tif"]).is_err());
        assert!(config(&["-o", "out"]).is_err());

        let config = config(&["a.jpg", "-o", "out", "--focal-length", "1200"]).unwrap();
        assert_eq!(
            config.render,
            RenderConfig::default().focal_length(FocalLength::Fixed(1200.0))
        );
    }
}
