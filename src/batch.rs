//! Batch processing of image files.
//!
//! Inputs are either every matching image below a directory, or an explicit list of files. Results
//! are written below an output directory: directory inputs keep their path relative to the input
//! directory, listed files are written under their file name. Existing files are overwritten.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    hand::estimator::{DetectParams, PoseEstimator},
    image::RawImage,
    pipeline::{Pipeline, RenderConfig, StageTimers},
};

/// File extensions processed when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Where to look for input images.
#[derive(Debug, Clone)]
pub enum Inputs {
    /// All matching images below a directory, recursively.
    Dir(PathBuf),
    /// A list of image files. Extensions are not filtered.
    Files(Vec<PathBuf>),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    inputs: Inputs,
    output_dir: PathBuf,
    extensions: Vec<String>,
    side_by_side: bool,
    jobs: usize,
}

impl BatchOptions {
    pub fn new<P: Into<PathBuf>>(inputs: Inputs, output_dir: P) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            side_by_side: true,
            jobs: 1,
        }
    }

    /// Sets the file extensions to search for. A leading `.` is ignored, and matching is
    /// case-insensitive.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Whether to write the original and the composited image next to each other (the default), or
    /// only the composited image.
    pub fn side_by_side(mut self, side_by_side: bool) -> Self {
        self.side_by_side = side_by_side;
        self
    }

    /// Sets the number of images processed in parallel. 0 is treated as 1.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// One image to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Path to read the image from.
    pub input: PathBuf,
    /// Path relative to the output directory (and the detections directory, if any).
    pub relative: PathBuf,
}

/// Counts of images that were processed and that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Recursively finds all files below `dir` whose extension is accepted by `options`.
///
/// Hidden files and directories (starting with `.`) are searched like any other. Returned paths are
/// sorted and include `dir` as a prefix.
pub fn find_images(dir: &Path, options: &BatchOptions) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walkdir(dir, &mut |path| {
        if options.matches_extension(path) {
            files.push(path.to_path_buf());
        }
    })?;
    Ok(files.into_iter().sorted().collect())
}

fn walkdir(dir: &Path, visit: &mut dyn FnMut(&Path)) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walkdir(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}

/// Lists the images to process, in processing order.
pub fn collect_jobs(options: &BatchOptions) -> anyhow::Result<Vec<Job>> {
    match &options.inputs {
        Inputs::Dir(dir) => find_images(dir, options)?
            .into_iter()
            .map(|input| -> anyhow::Result<Job> {
                let relative = input
                    .strip_prefix(dir)
                    .with_context(|| {
                        format!("'{}' is not below '{}'", input.display(), dir.display())
                    })?
                    .to_path_buf();
                Ok(Job { input, relative })
            })
            .collect(),
        Inputs::Files(files) => {
            let jobs = files
                .iter()
                .map(|input| -> anyhow::Result<Job> {
                    match input.file_name() {
                        Some(name) => Ok(Job {
                            input: input.clone(),
                            relative: PathBuf::from(name),
                        }),
                        None => anyhow::bail!("input path '{}' has no file name", input.display()),
                    }
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            // Listed files share one output directory, so their names must be distinct.
            if let Some(name) = jobs.iter().map(|job| &job.relative).duplicates().next() {
                anyhow::bail!(
                    "multiple input files would be written to '{}'",
                    options.output_dir.join(name).display()
                );
            }
            Ok(jobs)
        }
    }
}

/// Returns the path the result for `job` is written to.
pub fn output_path(output_dir: &Path, job: &Job) -> PathBuf {
    output_dir.join(&job.relative)
}

/// Processes every input image with a pipeline built from `estimator` and `config`.
///
/// Failures of individual images are logged and counted, and do not stop the batch. Failing to
/// list the inputs fails the whole batch.
pub fn run_batch<E>(
    estimator: E,
    config: RenderConfig,
    options: &BatchOptions,
) -> anyhow::Result<BatchSummary>
where
    E: PoseEstimator + Clone + Send + Sync,
{
    let jobs = collect_jobs(options)?;
    log::info!(
        "found {} images (extensions: {})",
        jobs.len(),
        options.extensions.iter().join(", ")
    );

    // Every worker's pipeline records into the same timers.
    let timers = Arc::new(StageTimers::default());
    let results: Vec<bool> = if options.jobs <= 1 {
        let mut pipeline = Pipeline::with_timers(estimator, config, timers.clone());
        jobs.iter()
            .map(|job| run_job(&mut pipeline, job, options))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .context("failed to start worker threads")?;
        pool.install(|| {
            jobs.par_iter()
                .map_init(
                    || Pipeline::with_timers(estimator.clone(), config.clone(), timers.clone()),
                    |pipeline, job| run_job(pipeline, job, options),
                )
                .collect()
        })
    };
    for timer in timers.iter() {
        log::debug!("{timer}");
    }

    let failed = results.iter().filter(|ok| !**ok).count();
    let summary = BatchSummary {
        processed: results.len() - failed,
        failed,
    };
    log::info!(
        "processed {} images, {} failed",
        summary.processed,
        summary.failed
    );
    Ok(summary)
}

fn run_job<E: PoseEstimator>(
    pipeline: &mut Pipeline<E>,
    job: &Job,
    options: &BatchOptions,
) -> bool {
    match process_one(pipeline, job, options) {
        Ok(()) => true,
        Err(e) => {
            log::error!("failed to process '{}': {:#}", job.input.display(), e);
            false
        }
    }
}

fn process_one<E: PoseEstimator>(
    pipeline: &mut Pipeline<E>,
    job: &Job,
    options: &BatchOptions,
) -> anyhow::Result<()> {
    let raw = RawImage::load(&job.input)?;
    let params = DetectParams {
        image_path: Some(&job.input),
        relative_path: Some(&job.relative),
        ..Default::default()
    };
    let processed = pipeline.process(&raw, &params)?;
    let output = if options.side_by_side {
        processed.side_by_side()?
    } else {
        processed.composited
    };

    let path = output_path(&options.output_dir, job);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    output.save(&path)?;
    log::debug!("wrote '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("handviz-batch-{}", fastrand::u64(..)));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_images_recursively() {
        let dir = temp_dir();
        for name in [
            "b.png",
            "a.JPG",
            "notes.txt",
            "sub/c.jpeg",
            "sub/deeper/d.Png",
            ".hidden/e.png",
            "sub/.f.png",
            "noext",
        ] {
            touch(&dir.join(name));
        }

        let options = BatchOptions::new(Inputs::Dir(dir.clone()), "out");
        let jobs = collect_jobs(&options).unwrap();
        let relative: Vec<_> = jobs.iter().map(|job| job.relative.clone()).collect();
        assert_eq!(
            relative,
            [
                ".hidden/e.png",
                "a.JPG",
                "b.png",
                "sub/.f.png",
                "sub/c.jpeg",
                "sub/deeper/d.Png",
            ]
            .map(PathBuf::from)
            .to_vec(),
        );
        assert_eq!(jobs[4].input, dir.join("sub/c.jpeg"));

        let options = options.extensions([".PNG"]);
        let found = find_images(&dir, &options).unwrap();
        assert_eq!(
            found,
            [".hidden/e.png", "b.png", "sub/.f.png", "sub/deeper/d.Png"].map(|name| dir.join(name)),
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn output_paths() {
        let options = BatchOptions::new(
            Inputs::Files(vec!["/data/x/one.jpg".into(), "two.png".into()]),
            "/out",
        );
        let jobs = collect_jobs(&options).unwrap();
        assert_eq!(
            output_path(options.output_dir(), &jobs[0]),
            Path::new("/out/one.jpg")
        );
        assert_eq!(
            output_path(options.output_dir(), &jobs[1]),
            Path::new("/out/two.png")
        );

        let job = Job {
            input: "/in/a/b/c.png".into(),
            relative: "a/b/c.png".into(),
        };
        assert_eq!(output_path(Path::new("/out"), &job), Path::new("/out/a/b/c.png"));
    }

    #[test]
    fn listed_files_need_distinct_names() {
        let options = BatchOptions::new(
            Inputs::Files(vec!["a/x.png".into(), "b/y.png".into(), "b/x.png".into()]),
            "/out",
        );
        let err = collect_jobs(&options).unwrap_err();
        assert!(err.to_string().contains("x.png"), "{err}");

        let options = BatchOptions::new(
            Inputs::Files(vec!["a/x.png".into(), "b/y.png".into()]),
            "/out",
        );
        assert_eq!(collect_jobs(&options).unwrap().len(), 2);
    }

    #[test]
    fn missing_input_dir() {
        let dir = std::env::temp_dir().join(format!("handviz-missing-{}", fastrand::u64(..)));
        let options = BatchOptions::new(Inputs::Dir(dir), "out");
        assert!(collect_jobs(&options).is_err());
    }

    #[test]
    fn summary() {
        let summary = BatchSummary {
            processed: 3,
            failed: 1,
        };
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
        assert!(BatchSummary::default().is_success());
    }
}
