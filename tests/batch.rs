use std::{
    fs,
    path::{Path, PathBuf},
};

use handviz::{
    batch::{run_batch, BatchOptions, BatchSummary, Inputs},
    hand::estimator::{NoHands, SidecarEstimator},
    image::{Color, Frame, Resolution},
    pipeline::{RenderConfig, LEFT_BORDER_COLOR},
    render::DEFAULT_MESH_COLOR,
};

const RES: Resolution = Resolution::new(40, 30);
const BACKGROUND: Color = Color::from_rgb8(50, 50, 50);

/// A left hand covering the pixel square `[10, 20) x [10, 20)` of a 40x30 image.
const SIDECAR: &str = r#"{
    "focal_length": 100.0,
    "left": {
        "faces": [[0, 1, 2], [0, 2, 3]],
        "instances": [{
            "vertices": [[-0.1, -0.05, 0.0], [0.0, -0.05, 0.0], [0.0, 0.05, 0.0], [-0.1, 0.05, 0.0]],
            "camera_translation": [0.0, 0.0, 1.0]
        }]
    }
}"#;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("handviz-test-{}", fastrand::u64(..)));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_input(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    Frame::filled(RES, BACKGROUND).save(path).unwrap();
}

fn pixel(image: &image::RgbImage, x: u32, y: u32) -> Color {
    let [r, g, b] = image.get_pixel(x, y).0;
    Color::from_rgb8(r, g, b)
}

#[test]
fn mirrors_input_tree() {
    let dir = temp_dir();
    let input = dir.join("in");
    let output = dir.join("out");

    write_input(&input.join("sub/photo.png"));
    fs::write(input.join("sub/photo.png.hands.json"), SIDECAR).unwrap();
    write_input(&input.join("empty.PNG"));
    fs::write(input.join("broken.png"), b"not a png").unwrap();
    fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let options = BatchOptions::new(Inputs::Dir(input), &output);
    let summary = run_batch(SidecarEstimator::new(), RenderConfig::default(), &options).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 2,
            failed: 1
        }
    );

    assert!(!output.join("broken.png").exists());
    assert!(!output.join("notes.txt").exists());
    assert!(output.join("empty.PNG").exists());

    let result = image::open(output.join("sub/photo.png")).unwrap().to_rgb8();
    assert_eq!(result.dimensions(), (RES.width() * 2, RES.height()));

    // Left half: the unmodified input.
    for (x, y) in [(15, 15), (5, 25), (35, 25)] {
        assert_eq!(pixel(&result, x, y), BACKGROUND);
    }
    // Right half: the composited image.
    let w = RES.width();
    assert_eq!(pixel(&result, w + 15, 15), DEFAULT_MESH_COLOR);
    assert_eq!(pixel(&result, w + 5, 25), LEFT_BORDER_COLOR);
    assert_eq!(pixel(&result, w + 35, 25), BACKGROUND);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn file_list_composite_only() {
    let dir = temp_dir();
    let output = dir.join("out");
    let files: Vec<PathBuf> = ["a/one.png", "b/two.png", "b/three.png"]
        .iter()
        .map(|name| dir.join(name))
        .collect();
    for file in &files {
        write_input(file);
    }
    let missing = dir.join("missing.png");

    let options = BatchOptions::new(
        Inputs::Files(files.iter().cloned().chain([missing]).collect()),
        &output,
    )
    .side_by_side(false)
    .jobs(2);
    let config = RenderConfig::default().annotate(false);
    let summary = run_batch(NoHands, config, &options).unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);

    for name in ["one.png", "two.png", "three.png"] {
        let result = image::open(output.join(name)).unwrap().to_rgb8();
        assert_eq!(result.dimensions(), (RES.width(), RES.height()));
        assert!(result.pixels().all(|p| p.0 == [50, 50, 50]));
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn gif_inputs() {
    let dir = temp_dir();
    let input = dir.join("in");
    let output = dir.join("out");
    write_input(&input.join("a.gif"));
    write_input(&input.join("b.png"));

    let options = BatchOptions::new(Inputs::Dir(input), &output)
        .extensions(["gif"])
        .side_by_side(false);
    let config = RenderConfig::default().annotate(false);
    let summary = run_batch(NoHands, config, &options).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 1,
            failed: 0
        }
    );

    assert!(!output.join("b.png").exists());
    let result = image::open(output.join("a.gif")).unwrap().to_rgb8();
    assert_eq!(result.dimensions(), (RES.width(), RES.height()));

    fs::remove_dir_all(&dir).unwrap();
}
